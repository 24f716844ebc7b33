//! Scanner configuration.
//!
//! `ScanConfig` carries every recognised option: the extension lists, the
//! signature table, inspection limits, and the queue's timeout, concurrency
//! and retry settings. It is built in code with `with_*` setters or loaded
//! from JSON, where every field is optional and falls back to its default.

use crate::core::error::ConfigError;
use crate::core::types::ThreatSeverity;

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default number of bytes read from a single entry for content inspection.
pub const DEFAULT_MAX_INSPECT_BYTES: u64 = 1024 * 1024;

/// Default maximum number of entries accepted in one archive.
pub const DEFAULT_MAX_ARCHIVE_ENTRIES: usize = 10_000;

/// Executable, script and installer types.
const SUSPICIOUS_EXTENSIONS: &[&str] = &[
    ".exe", ".dll", ".bat", ".cmd", ".ps1", ".vbs", ".js", ".msi", ".scr", ".pif", ".jar",
    ".com", ".hta", ".cpl", ".reg",
];

/// Text and script types whose content is decoded and pattern matched.
const INSPECTABLE_EXTENSIONS: &[&str] = &[
    ".txt", ".ini", ".cfg", ".xml", ".json", ".html", ".htm", ".css", ".js", ".lua", ".py",
    ".ps1", ".bat", ".cmd", ".sh", ".vbs", ".php", ".asp", ".aspx", ".jsp",
];

/// Container types routed to the archive inspector.
const ARCHIVE_EXTENSIONS: &[&str] = &[".zip", ".rar", ".7z"];

/// One content signature: a case-insensitive regex and what a hit means.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureSpec {
    /// Short label reported as the threat name.
    pub name: String,
    /// Regular expression, matched case-insensitively.
    pub pattern: String,
    /// Human-readable explanation of a hit.
    pub description: String,
    /// Severity assigned to hits.
    #[serde(default = "default_signature_severity")]
    pub severity: ThreatSeverity,
}

fn default_signature_severity() -> ThreatSeverity {
    ThreatSeverity::High
}

impl SignatureSpec {
    /// Creates a High severity signature.
    pub fn new(
        name: impl Into<String>,
        pattern: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            pattern: pattern.into(),
            description: description.into(),
            severity: ThreatSeverity::High,
        }
    }

    /// Sets the severity.
    pub fn with_severity(mut self, severity: ThreatSeverity) -> Self {
        self.severity = severity;
        self
    }
}

/// The built-in signature table, in match priority order.
pub fn default_signatures() -> Vec<SignatureSpec> {
    vec![
        SignatureSpec::new(
            "TrojanSignature",
            r"Win32\.Trojan|Backdoor\.",
            "Trojan/backdoor signature detected.",
        ),
        SignatureSpec::new(
            "ShellCommand",
            r"cmd\.exe\s+/c",
            "Potentially malicious shell command.",
        ),
        SignatureSpec::new(
            "ExecutionPolicyBypass",
            r"powershell\s+-ExecutionPolicy\s+Bypass",
            "PowerShell command bypassing execution policy.",
        ),
        SignatureSpec::new(
            "DynamicExecution",
            r"Start-Process|Invoke-Expression|IEX\s*\(",
            "PowerShell with dynamic execution.",
        ),
        SignatureSpec::new(
            "GroupModification",
            r"net\s+localgroup\s+administrators",
            "Attempt to modify system groups.",
        ),
        SignatureSpec::new(
            "ScheduledTask",
            r"schtasks\s+/create",
            "Attempt to create a scheduled task.",
        ),
        SignatureSpec::new(
            "RegistryModification",
            r"reg\s+add\s+HKEY_",
            "Attempt to modify the registry.",
        ),
    ]
}

/// Configuration for scanning and the processing queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Extensions flagged when found, with leading dot.
    pub suspicious_extensions: Vec<String>,

    /// Extensions whose content is pattern matched, with leading dot.
    pub inspectable_extensions: Vec<String>,

    /// Extensions treated as archives, with leading dot.
    pub archive_extensions: Vec<String>,

    /// Ordered signature table.
    pub signatures: Vec<SignatureSpec>,

    /// Bytes read from one entry for content inspection.
    pub max_inspect_bytes: u64,

    /// Maximum entries accepted in one archive.
    pub max_archive_entries: usize,

    /// Overall timeout for one scan.
    #[serde(with = "duration_ms")]
    pub scan_timeout: Duration,

    /// Maximum number of files scanned at once.
    pub max_concurrent_scans: usize,

    /// Attempts per file before processing is marked failed.
    pub retry_limit: u32,

    /// Delay before the second attempt.
    #[serde(with = "duration_ms")]
    pub retry_initial_delay: Duration,

    /// Upper bound on the delay between attempts.
    #[serde(with = "duration_ms")]
    pub retry_max_delay: Duration,

    /// Whether scans also record a SHA-256 of the file.
    pub compute_sha256: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            suspicious_extensions: to_owned(SUSPICIOUS_EXTENSIONS),
            inspectable_extensions: to_owned(INSPECTABLE_EXTENSIONS),
            archive_extensions: to_owned(ARCHIVE_EXTENSIONS),
            signatures: default_signatures(),
            max_inspect_bytes: DEFAULT_MAX_INSPECT_BYTES,
            max_archive_entries: DEFAULT_MAX_ARCHIVE_ENTRIES,
            scan_timeout: Duration::from_secs(300),
            max_concurrent_scans: 4,
            retry_limit: 3,
            retry_initial_delay: Duration::from_millis(500),
            retry_max_delay: Duration::from_secs(30),
            compute_sha256: false,
        }
    }
}

impl ScanConfig {
    /// Creates a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a JSON document. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config.normalized())
    }

    /// Loads and validates a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    /// Sets the suspicious extension list.
    pub fn with_suspicious_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.suspicious_extensions = normalize_all(extensions);
        self
    }

    /// Sets the inspectable extension list.
    pub fn with_inspectable_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.inspectable_extensions = normalize_all(extensions);
        self
    }

    /// Replaces the signature table.
    pub fn with_signatures(mut self, signatures: Vec<SignatureSpec>) -> Self {
        self.signatures = signatures;
        self
    }

    /// Sets the number of bytes inspected per entry.
    pub fn with_max_inspect_bytes(mut self, bytes: u64) -> Self {
        self.max_inspect_bytes = bytes;
        self
    }

    /// Sets the maximum number of archive entries.
    pub fn with_max_archive_entries(mut self, entries: usize) -> Self {
        self.max_archive_entries = entries;
        self
    }

    /// Sets the scan timeout.
    pub fn with_scan_timeout(mut self, timeout: Duration) -> Self {
        self.scan_timeout = timeout;
        self
    }

    /// Sets the maximum number of concurrent scans.
    pub fn with_max_concurrent_scans(mut self, max: usize) -> Self {
        self.max_concurrent_scans = max;
        self
    }

    /// Sets the retry limit.
    pub fn with_retry_limit(mut self, attempts: u32) -> Self {
        self.retry_limit = attempts;
        self
    }

    /// Sets the retry backoff bounds.
    pub fn with_retry_delays(mut self, initial: Duration, max: Duration) -> Self {
        self.retry_initial_delay = initial;
        self.retry_max_delay = max;
        self
    }

    /// Enables or disables SHA-256 hashing.
    pub fn with_sha256(mut self, enabled: bool) -> Self {
        self.compute_sha256 = enabled;
        self
    }

    /// Checks limits and compiles every signature.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_inspect_bytes == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_inspect_bytes",
                reason: "must be greater than zero".into(),
            });
        }
        if self.max_archive_entries == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_archive_entries",
                reason: "must be greater than zero".into(),
            });
        }
        if self.max_concurrent_scans == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_concurrent_scans",
                reason: "must be greater than zero".into(),
            });
        }
        if self.retry_limit == 0 {
            return Err(ConfigError::InvalidValue {
                field: "retry_limit",
                reason: "at least one attempt is required".into(),
            });
        }
        if self.scan_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "scan_timeout",
                reason: "must be greater than zero".into(),
            });
        }

        crate::inspect::SignatureTable::from_specs(&self.signatures)?;
        Ok(())
    }

    /// Returns a copy with every extension lower-cased and dot-prefixed.
    pub fn normalized(mut self) -> Self {
        self.suspicious_extensions = normalize_all(&self.suspicious_extensions);
        self.inspectable_extensions = normalize_all(&self.inspectable_extensions);
        self.archive_extensions = normalize_all(&self.archive_extensions);
        self
    }
}

fn to_owned(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn normalize_all<I, S>(extensions: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    extensions
        .into_iter()
        .map(|e| {
            let e = e.as_ref().trim().to_ascii_lowercase();
            if e.starts_with('.') {
                e
            } else {
                format!(".{}", e)
            }
        })
        .collect()
}

/// Serde helper for Duration serialization as milliseconds.
pub(crate) mod duration_ms {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ScanConfig::default();
        assert_eq!(config.max_inspect_bytes, 1024 * 1024);
        assert_eq!(config.suspicious_extensions.len(), 15);
        assert_eq!(config.inspectable_extensions.len(), 20);
        assert_eq!(config.signatures.len(), 7);
        assert_eq!(config.signatures[1].name, "ShellCommand");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_json_partial() {
        let config = ScanConfig::from_json_str(
            r#"{
                "max_inspect_bytes": 4096,
                "scan_timeout": 1500,
                "suspicious_extensions": ["EXE", ".dll"]
            }"#,
        )
        .unwrap();

        assert_eq!(config.max_inspect_bytes, 4096);
        assert_eq!(config.scan_timeout, Duration::from_millis(1500));
        assert_eq!(config.suspicious_extensions, vec![".exe", ".dll"]);
        assert_eq!(config.retry_limit, 3);
        assert_eq!(config.signatures, default_signatures());
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.json");
        std::fs::write(&path, r#"{ "max_concurrent_scans": 8 }"#).unwrap();

        let config = ScanConfig::from_json_file(&path).unwrap();
        assert_eq!(config.max_concurrent_scans, 8);

        let missing = ScanConfig::from_json_file(dir.path().join("nope.json"));
        assert!(matches!(missing, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = ScanConfig::new().with_max_concurrent_scans(0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue {
                field: "max_concurrent_scans",
                ..
            })
        ));

        let config = ScanConfig::new().with_signatures(vec![SignatureSpec::new(
            "Broken",
            "(unclosed",
            "never compiles",
        )]);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidSignature { .. })
        ));
    }

    #[test]
    fn test_builder_normalizes_extensions() {
        let config = ScanConfig::new().with_inspectable_extensions(["TXT", " .Lua "]);
        assert_eq!(config.inspectable_extensions, vec![".txt", ".lua"]);
    }
}
