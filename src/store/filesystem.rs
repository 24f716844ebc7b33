//! Filesystem-backed store implementations.

use crate::core::error::{StorageError, StorageResult};
use crate::core::types::SecurityScan;
use crate::store::traits::{BlobStorage, ScanResultStore};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use tokio::sync::RwLock;

/// On-disk wrapper that keeps the unsanitized file id.
#[derive(Debug, Serialize, Deserialize)]
struct StoredScan {
    file_id: String,
    scan: SecurityScan,
}

/// Filesystem-based [`ScanResultStore`].
///
/// # Directory Structure
///
/// ```text
/// scans/
/// └── {file_id}/
///     └── {scan_id}.json
/// ```
///
/// Every scan is written once and never rewritten. An in-memory index is
/// loaded on startup for lookups.
#[derive(Debug)]
pub struct FilesystemScanStore {
    base_path: PathBuf,
    index: RwLock<HashMap<String, Vec<SecurityScan>>>,
}

impl FilesystemScanStore {
    /// Opens a store rooted at `base_path`, creating the directory and
    /// loading existing scans.
    pub fn new(base_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let base_path = base_path.into();
        std::fs::create_dir_all(&base_path)?;
        let index = load_index(&base_path)?;

        tracing::debug!(
            path = %base_path.display(),
            files = index.len(),
            "Loaded scan store index"
        );

        Ok(Self {
            base_path,
            index: RwLock::new(index),
        })
    }

    /// Returns the root directory.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn file_dir(&self, file_id: &str) -> PathBuf {
        self.base_path.join(safe_name(file_id))
    }
}

fn load_index(base_path: &Path) -> StorageResult<HashMap<String, Vec<SecurityScan>>> {
    let mut index: HashMap<String, Vec<SecurityScan>> = HashMap::new();

    for dir in std::fs::read_dir(base_path)?.filter_map(|e| e.ok()) {
        if !dir.path().is_dir() {
            continue;
        }
        for entry in std::fs::read_dir(dir.path())?.filter_map(|e| e.ok()) {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            let parsed = std::fs::read_to_string(&path)
                .map_err(StorageError::from)
                .and_then(|content| Ok(serde_json::from_str::<StoredScan>(&content)?));
            match parsed {
                Ok(stored) => index.entry(stored.file_id).or_default().push(stored.scan),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable scan record");
                }
            }
        }
    }

    for scans in index.values_mut() {
        scans.sort_by(|a, b| a.scanned_at.cmp(&b.scanned_at));
    }
    Ok(index)
}

/// Maps an identifier onto a single safe path component.
fn safe_name(id: &str) -> String {
    id.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[async_trait]
impl ScanResultStore for FilesystemScanStore {
    async fn save(&self, file_id: &str, scan: &SecurityScan) -> StorageResult<()> {
        let dir = self.file_dir(file_id);
        tokio::fs::create_dir_all(&dir).await?;

        let stored = StoredScan {
            file_id: file_id.to_string(),
            scan: scan.clone(),
        };
        let content = serde_json::to_vec_pretty(&stored)?;
        tokio::fs::write(dir.join(format!("{}.json", safe_name(&scan.id))), content).await?;

        self.index
            .write()
            .await
            .entry(file_id.to_string())
            .or_default()
            .push(stored.scan);

        tracing::debug!(file_id = %file_id, scan_id = %scan.id, "Scan persisted");
        Ok(())
    }

    async fn history(&self, file_id: &str) -> StorageResult<Vec<SecurityScan>> {
        Ok(self
            .index
            .read()
            .await
            .get(file_id)
            .cloned()
            .unwrap_or_default())
    }
}

/// Filesystem-based [`BlobStorage`].
///
/// Keys map to paths below the root; `/` in a key creates subdirectories.
/// Absolute keys and keys with `..` are rejected.
#[derive(Debug, Clone)]
pub struct FilesystemBlobStorage {
    root: PathBuf,
}

impl FilesystemBlobStorage {
    /// Opens a storage rooted at `root`, creating the directory.
    pub fn new(root: impl Into<PathBuf>) -> StorageResult<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn path_for(&self, key: &str) -> StorageResult<PathBuf> {
        let relative = Path::new(key);
        let valid = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !valid {
            return Err(StorageError::InvalidKey {
                key: key.to_string(),
            });
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl BlobStorage for FilesystemBlobStorage {
    async fn put(&self, key: &str, data: Vec<u8>) -> StorageResult<()> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, data).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> StorageResult<Vec<u8>> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StorageError::not_found(key)),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        let path = self.path_for(key)?;
        Ok(tokio::fs::try_exists(&path).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_scan_store_roundtrip_and_reload() {
        let temp_dir = TempDir::new().unwrap();
        let clean = SecurityScan::start().complete();
        let mut failed = SecurityScan::start().fail("timeout");
        failed.scanned_at = clean.scanned_at - chrono::Duration::seconds(5);

        {
            let store = FilesystemScanStore::new(temp_dir.path()).unwrap();
            store.save("mods/42", &failed).await.unwrap();
            store.save("mods/42", &clean).await.unwrap();
            assert_eq!(store.history("mods/42").await.unwrap().len(), 2);
        }

        let reopened = FilesystemScanStore::new(temp_dir.path()).unwrap();
        let history = reopened.history("mods/42").await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(reopened.latest("mods/42").await.unwrap(), Some(clean));
        assert!(temp_dir.path().join("mods_42").is_dir());
    }

    #[tokio::test]
    async fn test_scan_store_skips_garbage() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("f1");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("broken.json"), b"{not json").unwrap();

        let store = FilesystemScanStore::new(temp_dir.path()).unwrap();
        assert!(store.history("f1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_blob_storage_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let blobs = FilesystemBlobStorage::new(temp_dir.path()).unwrap();

        blobs.put("uploads/u1/mod.zip", b"PK".to_vec()).await.unwrap();
        assert_eq!(blobs.get("uploads/u1/mod.zip").await.unwrap(), b"PK");
        assert!(blobs.exists("uploads/u1/mod.zip").await.unwrap());

        blobs.delete("uploads/u1/mod.zip").await.unwrap();
        blobs.delete("uploads/u1/mod.zip").await.unwrap();
        assert!(matches!(
            blobs.get("uploads/u1/mod.zip").await,
            Err(StorageError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_blob_storage_rejects_escaping_keys() {
        let temp_dir = TempDir::new().unwrap();
        let blobs = FilesystemBlobStorage::new(temp_dir.path()).unwrap();

        for key in ["../outside", "/etc/passwd", "", "a/../../b"] {
            assert!(matches!(
                blobs.put(key, Vec::new()).await,
                Err(StorageError::InvalidKey { .. })
            ));
        }
    }
}
