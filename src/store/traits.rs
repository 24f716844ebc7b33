//! Persistence seams for scans, file records and upload bytes.

use crate::core::error::StorageResult;
use crate::core::types::SecurityScan;
use crate::store::record::{FileRecord, FileStatus};

use async_trait::async_trait;
use std::fmt::Debug;

/// Records `SecurityScan`s keyed by file id.
///
/// Scans are append-only: a re-scan adds a new entry and never mutates an
/// earlier one.
#[async_trait]
pub trait ScanResultStore: Send + Sync + Debug {
    /// Stores a scan for a file.
    async fn save(&self, file_id: &str, scan: &SecurityScan) -> StorageResult<()>;

    /// Returns every scan recorded for the file, oldest first.
    async fn history(&self, file_id: &str) -> StorageResult<Vec<SecurityScan>>;

    /// Returns the most recent scan for the file.
    async fn latest(&self, file_id: &str) -> StorageResult<Option<SecurityScan>> {
        Ok(self.history(file_id).await?.pop())
    }
}

/// Stores uploaded file records.
#[async_trait]
pub trait FileRepository: Send + Sync + Debug {
    /// Inserts or replaces a record.
    async fn upsert(&self, record: FileRecord) -> StorageResult<()>;

    /// Looks up a record.
    async fn get(&self, file_id: &str) -> StorageResult<Option<FileRecord>>;

    /// Lists records with the given status.
    async fn list_by_status(&self, status: FileStatus) -> StorageResult<Vec<FileRecord>>;

    /// Sets a record's status and returns the updated record.
    async fn set_status(&self, file_id: &str, status: FileStatus) -> StorageResult<FileRecord> {
        let mut record = self
            .get(file_id)
            .await?
            .ok_or_else(|| crate::core::StorageError::not_found(file_id))?;
        record.status = status;
        record.updated_at = chrono::Utc::now();
        self.upsert(record.clone()).await?;
        Ok(record)
    }

    /// Moves a record to `status` only if its current status is one of
    /// `expected`.
    ///
    /// Returns `Ok(updated)` when the transition happened and
    /// `Err(current)` when the record was in some other status. The default
    /// reads then writes; backends with a real conditional update should
    /// override it.
    async fn compare_and_set_status(
        &self,
        file_id: &str,
        expected: &[FileStatus],
        status: FileStatus,
    ) -> StorageResult<Result<FileRecord, FileRecord>> {
        let mut record = self
            .get(file_id)
            .await?
            .ok_or_else(|| crate::core::StorageError::not_found(file_id))?;
        if !expected.contains(&record.status) {
            return Ok(Err(record));
        }
        record.status = status;
        record.updated_at = chrono::Utc::now();
        self.upsert(record.clone()).await?;
        Ok(Ok(record))
    }

    /// Sets a record's approval flag and returns the updated record.
    async fn set_approved(&self, file_id: &str, approved: bool) -> StorageResult<FileRecord> {
        let mut record = self
            .get(file_id)
            .await?
            .ok_or_else(|| crate::core::StorageError::not_found(file_id))?;
        record.approved = approved;
        record.updated_at = chrono::Utc::now();
        self.upsert(record.clone()).await?;
        Ok(record)
    }
}

/// Holds the bytes of uploaded files.
#[async_trait]
pub trait BlobStorage: Send + Sync + Debug {
    /// Stores bytes under a key, replacing any previous value.
    async fn put(&self, key: &str, data: Vec<u8>) -> StorageResult<()>;

    /// Fetches the bytes stored under a key.
    async fn get(&self, key: &str) -> StorageResult<Vec<u8>>;

    /// Removes a key. Removing a missing key is not an error.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// Returns `true` if the key exists.
    async fn exists(&self, key: &str) -> StorageResult<bool> {
        match self.get(key).await {
            Ok(_) => Ok(true),
            Err(crate::core::StorageError::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }
}
