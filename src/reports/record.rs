//! Moderation report records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Where a report is in the moderation queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    /// Waiting for a moderator.
    Pending,
    /// A moderator has dealt with it.
    Resolved,
}

impl std::fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Resolved => write!(f, "resolved"),
        }
    }
}

/// A user's complaint about a published mod.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentReport {
    /// Unique report identifier.
    pub id: String,

    /// The reported mod.
    pub mod_id: String,

    /// User who filed the report.
    pub reporter_id: String,

    /// Short reason, e.g. "malware" or "stolen content".
    pub reason: String,

    /// Free-form details from the reporter.
    pub details: Option<String>,

    /// Current status.
    pub status: ReportStatus,

    /// When the report was filed.
    pub created_at: DateTime<Utc>,

    /// Moderator who resolved the report.
    pub resolved_by: Option<String>,

    /// What the moderator decided.
    pub resolution: Option<String>,

    /// When the report was resolved.
    pub resolved_at: Option<DateTime<Utc>>,
}

impl ContentReport {
    /// Creates a pending report.
    pub fn new(
        mod_id: impl Into<String>,
        reporter_id: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            mod_id: mod_id.into(),
            reporter_id: reporter_id.into(),
            reason: reason.into(),
            details: None,
            status: ReportStatus::Pending,
            created_at: Utc::now(),
            resolved_by: None,
            resolution: None,
            resolved_at: None,
        }
    }

    /// Sets the reporter's details.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Returns `true` while no moderator has acted.
    pub fn is_pending(&self) -> bool {
        self.status == ReportStatus::Pending
    }

    pub(crate) fn resolve(mut self, resolver: &str, resolution: &str) -> Self {
        self.status = ReportStatus::Resolved;
        self.resolved_by = Some(resolver.to_string());
        self.resolution = Some(resolution.to_string());
        self.resolved_at = Some(Utc::now());
        self
    }
}
