//! Filesystem-based quarantine storage implementation.

use crate::core::error::QuarantineError;
use crate::quarantine::record::{QuarantineFilter, QuarantineId, QuarantineRecord};
use crate::quarantine::traits::{verify_integrity, QuarantineStore};

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

/// Filesystem-based quarantine storage.
///
/// Withheld bytes are stored under obfuscated names so they cannot be run
/// by accident.
///
/// # Directory Structure
///
/// ```text
/// quarantine/
/// ├── data/
/// │   └── {id}.qdata          # Quarantined file (obfuscated)
/// └── meta/
///     └── {id}.json           # Metadata
/// ```
#[derive(Debug)]
pub struct FilesystemQuarantine {
    /// Base directory for quarantine storage.
    base_path: PathBuf,
    /// In-memory index of records (for fast lookups).
    index: RwLock<HashMap<String, QuarantineRecord>>,
}

impl FilesystemQuarantine {
    /// Opens a quarantine at the given path.
    ///
    /// Creates the directory structure if it doesn't exist and loads the
    /// records already on disk.
    pub fn new(base_path: impl Into<PathBuf>) -> Result<Self, QuarantineError> {
        let base_path = base_path.into();

        for dir in [base_path.join("data"), base_path.join("meta")] {
            std::fs::create_dir_all(&dir).map_err(|e| QuarantineError::StoreFailed {
                reason: format!("Failed to create {}: {}", dir.display(), e),
            })?;
        }

        let index = load_index(&base_path.join("meta"))?;
        tracing::debug!(count = index.len(), "Loaded quarantine index");

        Ok(Self {
            base_path,
            index: RwLock::new(index),
        })
    }

    /// Returns the path to the quarantine data directory.
    pub fn data_dir(&self) -> PathBuf {
        self.base_path.join("data")
    }

    /// Returns the path to the quarantine metadata directory.
    pub fn meta_dir(&self) -> PathBuf {
        self.base_path.join("meta")
    }

    fn data_path(&self, id: &QuarantineId) -> PathBuf {
        self.data_dir().join(format!("{}.qdata", id.as_str()))
    }

    fn meta_path(&self, id: &QuarantineId) -> PathBuf {
        self.meta_dir().join(format!("{}.json", id.as_str()))
    }
}

fn load_index(meta_dir: &Path) -> Result<HashMap<String, QuarantineRecord>, QuarantineError> {
    let entries = std::fs::read_dir(meta_dir).map_err(|e| QuarantineError::RetrieveFailed {
        reason: format!("Failed to read meta directory: {}", e),
    })?;

    let mut index = HashMap::new();
    for entry in entries.filter_map(|e| e.ok()) {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) != Some("json") {
            continue;
        }
        let record = std::fs::read_to_string(&path)
            .ok()
            .and_then(|content| serde_json::from_str::<QuarantineRecord>(&content).ok());
        match record {
            Some(record) => {
                index.insert(record.id.0.clone(), record);
            }
            None => {
                tracing::warn!(path = %path.display(), "Skipping unreadable quarantine record");
            }
        }
    }
    Ok(index)
}

#[async_trait]
impl QuarantineStore for FilesystemQuarantine {
    async fn store(
        &self,
        data: &[u8],
        record: QuarantineRecord,
    ) -> Result<QuarantineId, QuarantineError> {
        verify_integrity(data, &record)?;
        let id = record.id.clone();

        tokio::fs::write(self.data_path(&id), data)
            .await
            .map_err(|e| QuarantineError::StoreFailed {
                reason: format!("Failed to write data file: {}", e),
            })?;

        let content =
            serde_json::to_string_pretty(&record).map_err(|e| QuarantineError::StoreFailed {
                reason: format!("Failed to serialize metadata: {}", e),
            })?;
        tokio::fs::write(self.meta_path(&id), content)
            .await
            .map_err(|e| QuarantineError::StoreFailed {
                reason: format!("Failed to write metadata: {}", e),
            })?;

        tracing::info!(
            quarantine_id = %id,
            file_id = %record.file_id,
            file_hash = %record.file_hash.blake3,
            "File quarantined"
        );
        self.index.write().await.insert(id.0.clone(), record);

        Ok(id)
    }

    async fn retrieve(
        &self,
        id: &QuarantineId,
    ) -> Result<(Vec<u8>, QuarantineRecord), QuarantineError> {
        let record = self
            .index
            .read()
            .await
            .get(&id.0)
            .cloned()
            .ok_or_else(|| QuarantineError::NotFound { id: id.to_string() })?;

        let data = tokio::fs::read(self.data_path(id))
            .await
            .map_err(|e| QuarantineError::RetrieveFailed {
                reason: format!("Failed to read data file: {}", e),
            })?;

        verify_integrity(&data, &record)?;
        Ok((data, record))
    }

    async fn delete(&self, id: &QuarantineId) -> Result<(), QuarantineError> {
        self.index.write().await.remove(&id.0);

        for path in [self.data_path(id), self.meta_path(id)] {
            if let Err(e) = tokio::fs::remove_file(&path).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    return Err(e.into());
                }
            }
        }

        tracing::info!(quarantine_id = %id, "Quarantine record deleted");
        Ok(())
    }

    async fn list(
        &self,
        filter: QuarantineFilter,
    ) -> Result<Vec<QuarantineRecord>, QuarantineError> {
        let records = self
            .index
            .read()
            .await
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        Ok(filter.apply(records))
    }

    async fn count(&self) -> Result<usize, QuarantineError> {
        Ok(self.index.read().await.len())
    }
}
