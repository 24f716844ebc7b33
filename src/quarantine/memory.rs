//! In-memory quarantine storage.

use crate::core::error::QuarantineError;
use crate::quarantine::record::{QuarantineFilter, QuarantineId, QuarantineRecord};
use crate::quarantine::traits::{verify_integrity, QuarantineStore};

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Quarantine held in process memory.
#[derive(Debug, Default)]
pub struct InMemoryQuarantine {
    entries: RwLock<HashMap<QuarantineId, (Vec<u8>, QuarantineRecord)>>,
}

impl InMemoryQuarantine {
    /// Creates an empty quarantine.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl QuarantineStore for InMemoryQuarantine {
    async fn store(
        &self,
        data: &[u8],
        record: QuarantineRecord,
    ) -> Result<QuarantineId, QuarantineError> {
        verify_integrity(data, &record)?;

        let id = record.id.clone();
        tracing::info!(
            quarantine_id = %id,
            file_id = %record.file_id,
            file_hash = %record.file_hash.blake3,
            "File quarantined"
        );
        self.entries
            .write()
            .await
            .insert(id.clone(), (data.to_vec(), record));
        Ok(id)
    }

    async fn retrieve(
        &self,
        id: &QuarantineId,
    ) -> Result<(Vec<u8>, QuarantineRecord), QuarantineError> {
        let (data, record) = self
            .entries
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| QuarantineError::NotFound { id: id.to_string() })?;

        verify_integrity(&data, &record)?;
        Ok((data, record))
    }

    async fn delete(&self, id: &QuarantineId) -> Result<(), QuarantineError> {
        self.entries.write().await.remove(id);
        tracing::info!(quarantine_id = %id, "Quarantine record deleted");
        Ok(())
    }

    async fn list(
        &self,
        filter: QuarantineFilter,
    ) -> Result<Vec<QuarantineRecord>, QuarantineError> {
        let records = self
            .entries
            .read()
            .await
            .values()
            .map(|(_, record)| record)
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        Ok(filter.apply(records))
    }

    async fn count(&self) -> Result<usize, QuarantineError> {
        Ok(self.entries.read().await.len())
    }
}
