//! Core types used throughout the modscan library.
//!
//! This module defines the scan verdict (`SecurityScan`), the individual
//! findings (`SecurityThreat`) and the enums that classify them. Both
//! records serialize with `PascalCase` field names so they can be handed to
//! the rest of the platform unchanged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Name reported in `ScanEngine` for every scan.
pub const SCAN_ENGINE: &str = "modscan";

/// Version reported in `ScanEngineVersion` for every scan.
pub const SCAN_ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Lifecycle state of a security scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScanStatus {
    /// The scan is in progress.
    Scanning,
    /// No threats were found.
    Clean,
    /// At least one threat was found.
    Infected,
    /// The scan could not complete.
    Failed,
}

impl ScanStatus {
    /// Returns `true` for every status a scan can end in.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Scanning)
    }
}

impl fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scanning => write!(f, "scanning"),
            Self::Clean => write!(f, "clean"),
            Self::Infected => write!(f, "infected"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Kind of a detected threat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ThreatType {
    /// Content or naming that looks dangerous.
    Suspicious,
    /// A file type the platform does not accept at all.
    Unauthorized,
}

/// Severity level of a detected threat, ordered by ascending risk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ThreatSeverity {
    /// Informational findings such as hidden files.
    Low,
    /// Risky file types bundled inside an archive.
    Medium,
    /// Signature hits and disallowed uploads.
    High,
}

impl fmt::Display for ThreatSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

/// A single flagged finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SecurityThreat {
    /// Kind of threat.
    #[serde(rename = "Type")]
    pub threat_type: ThreatType,

    /// Severity of the finding.
    pub severity: ThreatSeverity,

    /// Entry path inside the archive, or the uploaded filename.
    pub file_path: String,

    /// Short signature label.
    pub threat_name: String,

    /// Human-readable explanation.
    pub description: String,
}

impl SecurityThreat {
    /// Creates a `Suspicious` threat.
    pub fn suspicious(
        severity: ThreatSeverity,
        file_path: impl Into<String>,
        threat_name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            threat_type: ThreatType::Suspicious,
            severity,
            file_path: file_path.into(),
            threat_name: threat_name.into(),
            description: description.into(),
        }
    }

    /// Creates a `High` severity `Unauthorized` threat.
    pub fn unauthorized(
        file_path: impl Into<String>,
        threat_name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            threat_type: ThreatType::Unauthorized,
            severity: ThreatSeverity::High,
            file_path: file_path.into(),
            threat_name: threat_name.into(),
            description: description.into(),
        }
    }
}

/// File hash information.
///
/// BLAKE3 is always computed and used for integrity checks; SHA-256 is
/// optional and kept for systems that index uploads by it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileHash {
    /// BLAKE3 hash, hex encoded.
    pub blake3: String,

    /// SHA-256 hash, hex encoded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

impl FileHash {
    /// Creates a new `FileHash` with only BLAKE3.
    pub fn new(blake3: impl Into<String>) -> Self {
        Self {
            blake3: blake3.into(),
            sha256: None,
        }
    }

    /// Sets the SHA-256 hash.
    pub fn with_sha256(mut self, sha256: impl Into<String>) -> Self {
        self.sha256 = Some(sha256.into());
        self
    }
}

impl fmt::Display for FileHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "blake3:{}", self.blake3)
    }
}

/// The verdict of scanning one uploaded file.
///
/// A scan is created in the `Scanning` state, filled in during a single
/// pass and then closed with [`SecurityScan::complete`] or
/// [`SecurityScan::fail`]. Completed scans are never reopened; a re-scan
/// produces a new value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SecurityScan {
    /// Unique identifier for this scan.
    pub id: String,

    /// When the scan started.
    pub scanned_at: DateTime<Utc>,

    /// Lifecycle state.
    pub status: ScanStatus,

    /// Set once a terminal status is reached.
    pub is_complete: bool,

    /// Number of entries examined (1 for non-archives).
    pub files_scanned: usize,

    /// Findings, in detection order.
    pub threats: Vec<SecurityThreat>,

    /// Directory path to entry count (archives only).
    pub folder_structure: BTreeMap<String, usize>,

    /// Lower-cased extensions observed, with leading dot.
    pub detected_file_types: BTreeSet<String>,

    /// Diagnostic note, populated on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,

    /// Set on `Failed` scans that would fail the same way on the same
    /// bytes, such as an unsupported or corrupt archive.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub permanent_failure: bool,

    /// Engine name.
    pub scan_engine: String,

    /// Engine version.
    pub scan_engine_version: String,

    /// Hash of the scanned bytes, when they could be read.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_hash: Option<FileHash>,
}

impl SecurityScan {
    /// Starts a new scan in the `Scanning` state.
    pub fn start() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            scanned_at: Utc::now(),
            status: ScanStatus::Scanning,
            is_complete: false,
            files_scanned: 0,
            threats: Vec::new(),
            folder_structure: BTreeMap::new(),
            detected_file_types: BTreeSet::new(),
            comments: None,
            permanent_failure: false,
            scan_engine: SCAN_ENGINE.to_string(),
            scan_engine_version: SCAN_ENGINE_VERSION.to_string(),
            file_hash: None,
        }
    }

    /// Closes the scan as `Infected` or `Clean` depending on its threats.
    pub fn complete(mut self) -> Self {
        self.status = if self.threats.is_empty() {
            ScanStatus::Clean
        } else {
            ScanStatus::Infected
        };
        self.is_complete = true;
        self
    }

    /// Closes the scan as `Failed` with a diagnostic comment.
    ///
    /// Whatever structure and threats were collected before the failure
    /// stay attached.
    pub fn fail(mut self, comment: impl Into<String>) -> Self {
        self.status = ScanStatus::Failed;
        self.comments = Some(comment.into());
        self.is_complete = true;
        self
    }

    /// Closes the scan as a `Failed` verdict that retrying cannot change.
    pub fn fail_permanently(self, comment: impl Into<String>) -> Self {
        let mut scan = self.fail(comment);
        scan.permanent_failure = true;
        scan
    }

    /// Returns `true` if the scan completed with no threats.
    pub fn is_clean(&self) -> bool {
        self.is_complete && self.status == ScanStatus::Clean
    }

    /// Returns `true` if the scan completed with threats.
    pub fn is_infected(&self) -> bool {
        self.is_complete && self.status == ScanStatus::Infected
    }

    /// Returns `true` if the scan ended in failure.
    pub fn is_failed(&self) -> bool {
        self.status == ScanStatus::Failed
    }

    /// Returns the number of findings.
    pub fn threat_count(&self) -> usize {
        self.threats.len()
    }

    /// Returns the most severe finding level, if any.
    pub fn highest_severity(&self) -> Option<ThreatSeverity> {
        self.threats.iter().map(|t| t.severity).max()
    }

    /// Returns the threats at or above the given severity.
    pub fn threats_at_least(&self, severity: ThreatSeverity) -> Vec<&SecurityThreat> {
        self.threats
            .iter()
            .filter(|t| t.severity >= severity)
            .collect()
    }

    pub(crate) fn push_threat(&mut self, threat: SecurityThreat) {
        tracing::debug!(
            scan_id = %self.id,
            file_path = %threat.file_path,
            threat_name = %threat.threat_name,
            severity = %threat.severity,
            "Threat recorded"
        );
        self.threats.push(threat);
    }
}

impl Default for SecurityScan {
    fn default() -> Self {
        Self::start()
    }
}
