//! Report persistence.

use crate::core::error::StorageResult;
use crate::reports::record::ContentReport;

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt::Debug;
use tokio::sync::RwLock;

/// Storage for moderation reports.
#[async_trait]
pub trait ReportStore: Send + Sync + Debug {
    /// Inserts or replaces a report.
    async fn save(&self, report: ContentReport) -> StorageResult<()>;

    /// Fetches a report by id.
    async fn get(&self, id: &str) -> StorageResult<Option<ContentReport>>;

    /// Returns every stored report, oldest first.
    async fn list(&self) -> StorageResult<Vec<ContentReport>>;

    /// Replaces a report only while the stored copy is still pending.
    ///
    /// Returns `false` if the report is missing or was resolved in the
    /// meantime.
    async fn replace_pending(&self, report: ContentReport) -> StorageResult<bool> {
        match self.get(&report.id).await? {
            Some(current) if current.is_pending() => {
                self.save(report).await?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

/// Reports held in process memory.
#[derive(Debug, Default)]
pub struct InMemoryReportStore {
    reports: RwLock<HashMap<String, ContentReport>>,
}

impl InMemoryReportStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReportStore for InMemoryReportStore {
    async fn save(&self, report: ContentReport) -> StorageResult<()> {
        self.reports.write().await.insert(report.id.clone(), report);
        Ok(())
    }

    async fn get(&self, id: &str) -> StorageResult<Option<ContentReport>> {
        Ok(self.reports.read().await.get(id).cloned())
    }

    async fn list(&self) -> StorageResult<Vec<ContentReport>> {
        let mut reports: Vec<_> = self.reports.read().await.values().cloned().collect();
        reports.sort_by_key(|r| r.created_at);
        Ok(reports)
    }

    async fn replace_pending(&self, report: ContentReport) -> StorageResult<bool> {
        let mut reports = self.reports.write().await;
        match reports.get_mut(&report.id) {
            Some(current) if current.is_pending() => {
                *current = report;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replace_pending_only_once() {
        let store = InMemoryReportStore::new();
        let report = ContentReport::new("mod-1", "user-1", "malware");
        store.save(report.clone()).await.unwrap();

        let first = report.clone().resolve("mod-a", "removed");
        let second = report.clone().resolve("mod-b", "kept");
        assert!(store.replace_pending(first).await.unwrap());
        assert!(!store.replace_pending(second).await.unwrap());

        let stored = store.get(&report.id).await.unwrap().unwrap();
        assert_eq!(stored.resolution.as_deref(), Some("removed"));

        let unknown = ContentReport::new("mod-2", "user-1", "spam");
        assert!(!store.replace_pending(unknown).await.unwrap());
        assert!(store.get("missing").await.unwrap().is_none());
    }
}
