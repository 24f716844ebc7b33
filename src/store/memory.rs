//! In-memory store implementations.

use crate::core::error::{StorageError, StorageResult};
use crate::core::types::SecurityScan;
use crate::store::record::{FileRecord, FileStatus};
use crate::store::traits::{BlobStorage, FileRepository, ScanResultStore};

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// In-memory [`ScanResultStore`].
#[derive(Debug, Default)]
pub struct InMemoryScanStore {
    scans: RwLock<HashMap<String, Vec<SecurityScan>>>,
}

impl InMemoryScanStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ScanResultStore for InMemoryScanStore {
    async fn save(&self, file_id: &str, scan: &SecurityScan) -> StorageResult<()> {
        self.scans
            .write()
            .await
            .entry(file_id.to_string())
            .or_default()
            .push(scan.clone());
        Ok(())
    }

    async fn history(&self, file_id: &str) -> StorageResult<Vec<SecurityScan>> {
        Ok(self
            .scans
            .read()
            .await
            .get(file_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn latest(&self, file_id: &str) -> StorageResult<Option<SecurityScan>> {
        Ok(self
            .scans
            .read()
            .await
            .get(file_id)
            .and_then(|scans| scans.last().cloned()))
    }
}

/// In-memory [`FileRepository`].
#[derive(Debug, Default)]
pub struct InMemoryFileRepository {
    records: RwLock<HashMap<String, FileRecord>>,
}

impl InMemoryFileRepository {
    /// Creates an empty repository.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FileRepository for InMemoryFileRepository {
    async fn upsert(&self, record: FileRecord) -> StorageResult<()> {
        self.records
            .write()
            .await
            .insert(record.file_id().to_string(), record);
        Ok(())
    }

    async fn get(&self, file_id: &str) -> StorageResult<Option<FileRecord>> {
        Ok(self.records.read().await.get(file_id).cloned())
    }

    async fn list_by_status(&self, status: FileStatus) -> StorageResult<Vec<FileRecord>> {
        let mut records: Vec<_> = self
            .records
            .read()
            .await
            .values()
            .filter(|r| r.status == status)
            .cloned()
            .collect();
        records.sort_by(|a, b| a.uploaded_at.cmp(&b.uploaded_at));
        Ok(records)
    }

    async fn set_status(&self, file_id: &str, status: FileStatus) -> StorageResult<FileRecord> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(file_id)
            .ok_or_else(|| StorageError::not_found(file_id))?;
        record.status = status;
        record.updated_at = chrono::Utc::now();
        Ok(record.clone())
    }

    async fn compare_and_set_status(
        &self,
        file_id: &str,
        expected: &[FileStatus],
        status: FileStatus,
    ) -> StorageResult<Result<FileRecord, FileRecord>> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(file_id)
            .ok_or_else(|| StorageError::not_found(file_id))?;
        if !expected.contains(&record.status) {
            return Ok(Err(record.clone()));
        }
        record.status = status;
        record.updated_at = chrono::Utc::now();
        Ok(Ok(record.clone()))
    }
}

/// In-memory [`BlobStorage`].
#[derive(Debug, Default)]
pub struct InMemoryBlobStorage {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryBlobStorage {
    /// Creates an empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored blobs.
    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }

    /// Returns `true` if nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.blobs.read().await.is_empty()
    }
}

#[async_trait]
impl BlobStorage for InMemoryBlobStorage {
    async fn put(&self, key: &str, data: Vec<u8>) -> StorageResult<()> {
        self.blobs.write().await.insert(key.to_string(), data);
        Ok(())
    }

    async fn get(&self, key: &str) -> StorageResult<Vec<u8>> {
        self.blobs
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::not_found(key))
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.blobs.write().await.remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        Ok(self.blobs.read().await.contains_key(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::record::UploadedFile;

    #[tokio::test]
    async fn test_scan_store_is_append_only() {
        let store = InMemoryScanStore::new();
        let first = SecurityScan::start().fail("timeout");
        let second = SecurityScan::start().complete();

        store.save("f1", &first).await.unwrap();
        store.save("f1", &second).await.unwrap();

        let history = store.history("f1").await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0], first);
        assert_eq!(store.latest("f1").await.unwrap(), Some(second));
        assert_eq!(store.latest("f2").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_file_repository_status_and_approval() {
        let repo = InMemoryFileRepository::new();
        let file = UploadedFile::new("u1", "alice", "mod.zip", 3).with_file_id("f1");
        repo.upsert(FileRecord::new(file)).await.unwrap();

        let updated = repo.set_status("f1", FileStatus::Scanning).await.unwrap();
        assert_eq!(updated.status, FileStatus::Scanning);

        let approved = repo.set_approved("f1", true).await.unwrap();
        assert!(approved.approved);
        assert_eq!(approved.status, FileStatus::Scanning);

        assert_eq!(repo.list_by_status(FileStatus::Scanning).await.unwrap().len(), 1);
        assert!(repo.list_by_status(FileStatus::Pending).await.unwrap().is_empty());

        let err = repo.set_status("missing", FileStatus::Failed).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_compare_and_set_status() {
        let repo = InMemoryFileRepository::new();
        let file = UploadedFile::new("u1", "alice", "mod.zip", 3).with_file_id("f1");
        repo.upsert(FileRecord::new(file)).await.unwrap();
        repo.set_status("f1", FileStatus::Processed).await.unwrap();

        let expected = [FileStatus::Processed, FileStatus::Failed];
        let moved = repo
            .compare_and_set_status("f1", &expected, FileStatus::Pending)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(moved.status, FileStatus::Pending);

        let current = repo
            .compare_and_set_status("f1", &expected, FileStatus::Pending)
            .await
            .unwrap()
            .unwrap_err();
        assert_eq!(current.status, FileStatus::Pending);

        let err = repo
            .compare_and_set_status("missing", &expected, FileStatus::Pending)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_blob_storage() {
        let blobs = InMemoryBlobStorage::new();
        blobs.put("k", b"data".to_vec()).await.unwrap();

        assert_eq!(blobs.get("k").await.unwrap(), b"data");
        assert!(blobs.exists("k").await.unwrap());
        assert_eq!(blobs.len().await, 1);

        blobs.delete("k").await.unwrap();
        assert!(!blobs.exists("k").await.unwrap());
        assert!(matches!(
            blobs.get("k").await,
            Err(StorageError::NotFound { .. })
        ));
    }
}
