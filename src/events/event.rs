//! File lifecycle event types.

use crate::core::{ScanStatus, SecurityScan, ThreatSeverity};
use crate::store::FileRecord;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// What happened to a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileEventKind {
    /// The file was stored and queued.
    #[serde(rename = "file.uploaded")]
    Uploaded,
    /// A scan reached a terminal verdict.
    #[serde(rename = "file.scanned")]
    Scanned,
    /// The file passed policy and was published.
    #[serde(rename = "file.processed")]
    Processed,
    /// Processing gave up after exhausting retries.
    #[serde(rename = "file.processing_failed")]
    ProcessingFailed,
    /// The file was withheld.
    #[serde(rename = "file.quarantined")]
    Quarantined,
    /// A reviewer released a quarantined file.
    #[serde(rename = "file.restored")]
    Restored,
}

impl FileEventKind {
    /// Returns the wire name, e.g. `file.scanned`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uploaded => "file.uploaded",
            Self::Scanned => "file.scanned",
            Self::Processed => "file.processed",
            Self::ProcessingFailed => "file.processing_failed",
            Self::Quarantined => "file.quarantined",
            Self::Restored => "file.restored",
        }
    }
}

impl fmt::Display for FileEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The parts of a scan verdict carried on events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanSummary {
    /// Scan identifier.
    pub scan_id: String,
    /// Final status.
    pub status: ScanStatus,
    /// Number of threats.
    pub threat_count: usize,
    /// Whether the scan completed clean.
    pub is_clean: bool,
    /// Most severe threat, if any.
    pub highest_severity: Option<ThreatSeverity>,
}

impl From<&SecurityScan> for ScanSummary {
    fn from(scan: &SecurityScan) -> Self {
        Self {
            scan_id: scan.id.clone(),
            status: scan.status,
            threat_count: scan.threat_count(),
            is_clean: scan.is_clean(),
            highest_severity: scan.highest_severity(),
        }
    }
}

/// A file lifecycle event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileEvent {
    /// Unique event ID.
    pub event_id: String,

    /// Event kind.
    #[serde(rename = "event_type")]
    pub kind: FileEventKind,

    /// File the event is about.
    pub file_id: String,

    /// Mod the file belongs to, if any.
    pub mod_id: Option<String>,

    /// Uploader's user id.
    pub user_id: String,

    /// Uploader's display name.
    pub username: String,

    /// When the event occurred.
    pub timestamp: DateTime<Utc>,

    /// Verdict summary, for events that follow a scan.
    pub scan: Option<ScanSummary>,

    /// Extra context: a failure message, quarantine reason or reviewer.
    pub detail: Option<String>,
}

impl FileEvent {
    /// Creates an event for a file.
    pub fn new(kind: FileEventKind, record: &FileRecord) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            kind,
            file_id: record.file.file_id.clone(),
            mod_id: record.file.mod_id.clone(),
            user_id: record.file.user_id.clone(),
            username: record.file.username.clone(),
            timestamp: Utc::now(),
            scan: None,
            detail: None,
        }
    }

    /// Attaches a scan summary.
    pub fn with_scan(mut self, scan: &SecurityScan) -> Self {
        self.scan = Some(ScanSummary::from(scan));
        self
    }

    /// Attaches a detail message.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SecurityThreat;
    use crate::store::UploadedFile;

    fn record() -> FileRecord {
        FileRecord::new(
            UploadedFile::new("u1", "alice", "mod.zip", 10)
                .with_file_id("f1")
                .with_mod_id("m1"),
        )
    }

    #[test]
    fn test_event_carries_uploader() {
        let event = FileEvent::new(FileEventKind::Uploaded, &record());
        assert_eq!(event.file_id, "f1");
        assert_eq!(event.mod_id.as_deref(), Some("m1"));
        assert_eq!(event.user_id, "u1");
        assert_eq!(event.username, "alice");
        assert!(event.scan.is_none());
    }

    #[test]
    fn test_scan_summary() {
        let mut scan = SecurityScan::start();
        scan.threats.push(SecurityThreat::suspicious(
            ThreatSeverity::Medium,
            "payload.exe",
            "SuspiciousFileType",
            "x",
        ));
        let scan = scan.complete();

        let event = FileEvent::new(FileEventKind::Scanned, &record()).with_scan(&scan);
        let summary = event.scan.unwrap();
        assert_eq!(summary.status, ScanStatus::Infected);
        assert_eq!(summary.threat_count, 1);
        assert!(!summary.is_clean);
        assert_eq!(summary.highest_severity, Some(ThreatSeverity::Medium));
    }

    #[test]
    fn test_event_type_wire_name() {
        let event = FileEvent::new(FileEventKind::ProcessingFailed, &record());
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event_type"], "file.processing_failed");
        assert_eq!(FileEventKind::Restored.to_string(), "file.restored");
    }
}
