//! Moderation workflow over a [`ReportStore`].

use crate::core::error::ReportError;
use crate::reports::record::ContentReport;
use crate::reports::store::{InMemoryReportStore, ReportStore};

use std::sync::Arc;

/// Files, lists and resolves content reports.
///
/// The service keeps no state of its own; everything lives in the injected
/// store.
#[derive(Debug, Clone)]
pub struct ContentReportingService {
    store: Arc<dyn ReportStore>,
}

impl ContentReportingService {
    /// Creates a service over the given store.
    pub fn new(store: Arc<dyn ReportStore>) -> Self {
        Self { store }
    }

    /// Files a new report against a mod.
    pub async fn submit(
        &self,
        mod_id: &str,
        reporter_id: &str,
        reason: &str,
        details: Option<&str>,
    ) -> Result<ContentReport, ReportError> {
        let mod_id = required("mod_id", mod_id)?;
        let reporter_id = required("reporter_id", reporter_id)?;
        let reason = required("reason", reason)?;

        let mut report = ContentReport::new(mod_id, reporter_id, reason);
        if let Some(details) = details.map(str::trim).filter(|d| !d.is_empty()) {
            report = report.with_details(details);
        }
        self.store.save(report.clone()).await?;

        tracing::info!(
            target: "modscan::audit",
            event_type = "content_report",
            operation = "submit",
            report_id = %report.id,
            mod_id = %report.mod_id,
            reporter_id = %report.reporter_id,
            reason = %report.reason,
            "Content report filed"
        );
        Ok(report)
    }

    /// Returns unresolved reports, oldest first.
    pub async fn list_pending(&self) -> Result<Vec<ContentReport>, ReportError> {
        let reports = self.store.list().await?;
        Ok(reports.into_iter().filter(|r| r.is_pending()).collect())
    }

    /// Returns every report filed against a mod, oldest first.
    pub async fn list_for_mod(&self, mod_id: &str) -> Result<Vec<ContentReport>, ReportError> {
        let reports = self.store.list().await?;
        Ok(reports.into_iter().filter(|r| r.mod_id == mod_id).collect())
    }

    /// Closes a pending report.
    pub async fn resolve(
        &self,
        report_id: &str,
        resolver: &str,
        resolution: &str,
    ) -> Result<ContentReport, ReportError> {
        let resolver = required("resolver", resolver)?;
        let resolution = required("resolution", resolution)?;

        let report = self
            .store
            .get(report_id)
            .await?
            .ok_or_else(|| ReportError::NotFound {
                id: report_id.to_string(),
            })?;
        if !report.is_pending() {
            return Err(ReportError::AlreadyResolved {
                id: report_id.to_string(),
            });
        }

        let report = report.resolve(resolver, resolution);
        if !self.store.replace_pending(report.clone()).await? {
            return Err(ReportError::AlreadyResolved {
                id: report_id.to_string(),
            });
        }

        tracing::info!(
            target: "modscan::audit",
            event_type = "content_report",
            operation = "resolve",
            report_id = %report.id,
            mod_id = %report.mod_id,
            resolver = %resolver,
            resolution = %resolution,
            "Content report resolved"
        );
        Ok(report)
    }

    /// Returns the backing store.
    pub fn store(&self) -> &Arc<dyn ReportStore> {
        &self.store
    }
}

impl Default for ContentReportingService {
    fn default() -> Self {
        Self::new(Arc::new(InMemoryReportStore::new()))
    }
}

fn required<'a>(field: &'static str, value: &'a str) -> Result<&'a str, ReportError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ReportError::MissingField { field });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reports::record::ReportStatus;

    #[tokio::test]
    async fn test_submit_and_list() {
        let service = ContentReportingService::default();

        let report = service
            .submit("mod-1", "user-1", " malware ", Some("  "))
            .await
            .unwrap();
        assert_eq!(report.reason, "malware");
        assert!(report.details.is_none());
        assert_eq!(report.status, ReportStatus::Pending);

        service
            .submit("mod-2", "user-1", "stolen assets", Some("copied from another mod"))
            .await
            .unwrap();

        assert_eq!(service.list_pending().await.unwrap().len(), 2);
        let for_mod = service.list_for_mod("mod-1").await.unwrap();
        assert_eq!(for_mod.len(), 1);
        assert_eq!(for_mod[0].id, report.id);
    }

    #[tokio::test]
    async fn test_submit_requires_fields() {
        let service = ContentReportingService::default();

        for (mod_id, reporter, reason, field) in [
            ("", "user-1", "spam", "mod_id"),
            ("mod-1", " ", "spam", "reporter_id"),
            ("mod-1", "user-1", "", "reason"),
        ] {
            match service.submit(mod_id, reporter, reason, None).await {
                Err(ReportError::MissingField { field: f }) => assert_eq!(f, field),
                other => panic!("expected missing {field}, got {other:?}"),
            }
        }
        assert!(service.list_pending().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_resolve() {
        let service = ContentReportingService::default();
        let report = service.submit("mod-1", "user-1", "malware", None).await.unwrap();

        assert!(matches!(
            service.resolve(&report.id, "", "removed").await,
            Err(ReportError::MissingField { field: "resolver" })
        ));
        assert!(matches!(
            service.resolve("missing", "moderator", "removed").await,
            Err(ReportError::NotFound { .. })
        ));

        let resolved = service
            .resolve(&report.id, "moderator", "mod removed")
            .await
            .unwrap();
        assert_eq!(resolved.status, ReportStatus::Resolved);
        assert_eq!(resolved.resolution.as_deref(), Some("mod removed"));

        assert!(service.list_pending().await.unwrap().is_empty());
        assert_eq!(service.list_for_mod("mod-1").await.unwrap().len(), 1);
        assert!(matches!(
            service.resolve(&report.id, "moderator", "again").await,
            Err(ReportError::AlreadyResolved { .. })
        ));
    }

    #[tokio::test]
    async fn test_concurrent_resolve_has_one_winner() {
        let service = ContentReportingService::default();
        let report = service.submit("mod-1", "user-1", "malware", None).await.unwrap();

        let (a, b) = tokio::join!(
            service.resolve(&report.id, "mod-a", "removed"),
            service.resolve(&report.id, "mod-b", "kept"),
        );
        let winners = [&a, &b].iter().filter(|r| r.is_ok()).count();
        assert_eq!(winners, 1);
        assert!([a, b]
            .into_iter()
            .any(|r| matches!(r, Err(ReportError::AlreadyResolved { .. }))));
    }
}
