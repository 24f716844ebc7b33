//! Quarantine store trait definition.

use crate::core::error::QuarantineError;
use crate::quarantine::record::{QuarantineFilter, QuarantineId, QuarantineRecord};

use async_trait::async_trait;
use std::fmt::Debug;

/// Storage for withheld uploads.
///
/// Implementations verify the BLAKE3 hash of the bytes against the record
/// on both `store` and `retrieve`.
#[async_trait]
pub trait QuarantineStore: Send + Sync + Debug {
    /// Stores the bytes of a file with its record.
    ///
    /// Returns the ID assigned to this quarantine entry.
    async fn store(
        &self,
        data: &[u8],
        record: QuarantineRecord,
    ) -> Result<QuarantineId, QuarantineError>;

    /// Retrieves the bytes and record of a quarantined file.
    async fn retrieve(
        &self,
        id: &QuarantineId,
    ) -> Result<(Vec<u8>, QuarantineRecord), QuarantineError>;

    /// Deletes a file from quarantine.
    async fn delete(&self, id: &QuarantineId) -> Result<(), QuarantineError>;

    /// Lists quarantine records matching the filter, newest first.
    async fn list(
        &self,
        filter: QuarantineFilter,
    ) -> Result<Vec<QuarantineRecord>, QuarantineError>;

    /// Returns the number of quarantined files.
    async fn count(&self) -> Result<usize, QuarantineError> {
        let records = self
            .list(QuarantineFilter::new().with_include_expired(true))
            .await?;
        Ok(records.len())
    }

    /// Returns the newest record for an uploaded file.
    async fn find_by_file(
        &self,
        file_id: &str,
    ) -> Result<Option<QuarantineRecord>, QuarantineError> {
        let filter = QuarantineFilter::new()
            .with_file_id(file_id)
            .with_include_expired(true);
        Ok(self.list(filter).await?.into_iter().next())
    }

    /// Checks if a file with the given hash is already quarantined.
    async fn contains_hash(&self, hash: &str) -> Result<bool, QuarantineError> {
        let filter = QuarantineFilter::new().with_file_hash(hash);
        let records = self.list(filter).await?;
        Ok(!records.is_empty())
    }

    /// Deletes all expired quarantine records.
    async fn cleanup_expired(&self) -> Result<usize, QuarantineError> {
        let filter = QuarantineFilter::new().with_include_expired(true);
        let records = self.list(filter).await?;

        let mut deleted = 0;
        for record in records.into_iter().filter(|r| r.is_expired()) {
            if self.delete(&record.id).await.is_ok() {
                deleted += 1;
            }
        }

        Ok(deleted)
    }
}

/// Fails with `IntegrityCheckFailed` unless `data` hashes to the record's
/// BLAKE3 digest.
pub(crate) fn verify_integrity(
    data: &[u8],
    record: &QuarantineRecord,
) -> Result<(), QuarantineError> {
    let computed = crate::core::FileHasher::new().hash_bytes(data);
    if computed.blake3 != record.file_hash.blake3 {
        return Err(QuarantineError::IntegrityCheckFailed {
            expected: record.file_hash.blake3.clone(),
            actual: computed.blake3,
        });
    }
    Ok(())
}
