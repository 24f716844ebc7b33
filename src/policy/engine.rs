//! Safety checks over scan verdicts.

use crate::core::types::{ScanStatus, SecurityScan, ThreatSeverity};
use crate::policy::action::PolicyAction;

use serde::{Deserialize, Serialize};

/// Returns `true` if the scan is complete and either clean or infected only
/// with threats at or below `tolerated`.
fn is_safe_with(scan: &SecurityScan, tolerated: ThreatSeverity) -> bool {
    if !scan.is_complete {
        return false;
    }

    match scan.status {
        ScanStatus::Clean => true,
        ScanStatus::Infected => scan.threats.iter().all(|t| t.severity <= tolerated),
        ScanStatus::Scanning | ScanStatus::Failed => false,
    }
}

/// Returns `true` if the file may be published.
///
/// A file is safe when its scan is complete and either `Clean`, or
/// `Infected` with every threat at `Low` severity.
pub fn is_file_safe(scan: &SecurityScan) -> bool {
    is_safe_with(scan, ThreatSeverity::Low)
}

/// Returns `true` if the file has to be (re)scanned.
///
/// Only an approved file with a complete `Clean` scan skips scanning.
pub fn is_scan_required(scan: Option<&SecurityScan>, approved: bool) -> bool {
    let clean = scan
        .map(|s| s.is_complete && s.status == ScanStatus::Clean)
        .unwrap_or(false);
    !(clean && approved)
}

/// The result of policy evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyDecision {
    /// The action to take.
    pub action: PolicyAction,

    /// Id of the scan the decision was made on.
    pub scan_id: String,

    /// Highest threat severity in the scan, if any.
    pub highest_severity: Option<ThreatSeverity>,
}

impl PolicyDecision {
    /// Returns true if the file should be published.
    pub fn is_publish(&self) -> bool {
        self.action.is_publish()
    }
}

/// Decides between publishing and quarantining a scanned file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyPolicy {
    /// Highest threat severity that still lets a file through.
    pub tolerated_severity: ThreatSeverity,
}

impl Default for SafetyPolicy {
    fn default() -> Self {
        Self {
            tolerated_severity: ThreatSeverity::Low,
        }
    }
}

impl SafetyPolicy {
    /// Creates the default policy, tolerating only `Low` findings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the highest tolerated severity.
    pub fn with_tolerated_severity(mut self, severity: ThreatSeverity) -> Self {
        self.tolerated_severity = severity;
        self
    }

    /// Returns `true` if the scan passes this policy.
    pub fn is_safe(&self, scan: &SecurityScan) -> bool {
        is_safe_with(scan, self.tolerated_severity)
    }

    /// Evaluates a scan.
    pub fn evaluate(&self, scan: &SecurityScan) -> PolicyDecision {
        let action = if self.is_safe(scan) {
            PolicyAction::publish()
        } else {
            PolicyAction::quarantine(quarantine_reason(scan))
        };

        tracing::debug!(
            scan_id = %scan.id,
            status = %scan.status,
            publish = action.is_publish(),
            "Policy evaluated"
        );

        PolicyDecision {
            action,
            scan_id: scan.id.clone(),
            highest_severity: scan.highest_severity(),
        }
    }
}

fn quarantine_reason(scan: &SecurityScan) -> String {
    match scan.status {
        _ if !scan.is_complete => "Scan did not complete".to_string(),
        ScanStatus::Failed => format!(
            "Scan failed: {}",
            scan.comments.as_deref().unwrap_or("no details")
        ),
        _ => match scan.highest_severity() {
            Some(severity) => format!(
                "{} threat(s) detected, highest severity {}",
                scan.threat_count(),
                severity
            ),
            None => "Scan verdict not clean".to_string(),
        },
    }
}
