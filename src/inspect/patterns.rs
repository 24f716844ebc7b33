//! Content signature matching.
//!
//! A [`SignatureTable`] is an ordered list of compiled, case-insensitive
//! regular expressions. Matching stops at the first hit, so table order is
//! the tie-break when a text trips more than one signature.

use crate::core::config::{default_signatures, SignatureSpec};
use crate::core::error::ConfigError;
use crate::core::types::ThreatSeverity;

use regex::{Regex, RegexBuilder};

/// A compiled signature.
#[derive(Debug, Clone)]
pub struct Signature {
    /// Short label reported as the threat name.
    pub name: String,
    /// Explanation of a hit.
    pub description: String,
    /// Severity assigned to hits.
    pub severity: ThreatSeverity,
    regex: Regex,
}

impl Signature {
    /// Compiles a signature from its [`SignatureSpec`].
    pub fn compile(spec: &SignatureSpec) -> Result<Self, ConfigError> {
        let regex = RegexBuilder::new(&spec.pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| ConfigError::InvalidSignature {
                name: spec.name.clone(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            name: spec.name.clone(),
            description: spec.description.clone(),
            severity: spec.severity,
            regex,
        })
    }

    /// Returns `true` if the text contains a match.
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    /// Returns the source pattern.
    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }
}

/// An ordered set of signatures.
#[derive(Debug, Clone)]
pub struct SignatureTable {
    signatures: Vec<Signature>,
}

impl SignatureTable {
    /// Compiles every entry, failing on the first invalid pattern.
    pub fn from_specs(specs: &[SignatureSpec]) -> Result<Self, ConfigError> {
        let signatures = specs
            .iter()
            .map(Signature::compile)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { signatures })
    }

    /// Returns the first signature matching `text`.
    pub fn first_match(&self, text: &str) -> Option<&Signature> {
        self.signatures.iter().find(|s| s.is_match(text))
    }

    /// Returns the number of signatures.
    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    /// Returns `true` if the table holds no signatures.
    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }

    /// Iterates the signatures in match order.
    pub fn iter(&self) -> impl Iterator<Item = &Signature> {
        self.signatures.iter()
    }
}

impl Default for SignatureTable {
    fn default() -> Self {
        let signatures = default_signatures()
            .iter()
            .filter_map(|spec| Signature::compile(spec).ok())
            .collect();
        Self { signatures }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table_compiles() {
        let table = SignatureTable::default();
        assert_eq!(table.len(), default_signatures().len());
    }

    #[test]
    fn test_each_default_signature() {
        let table = SignatureTable::default();
        let cases = [
            ("drops Win32.Trojan.Agent", "TrojanSignature"),
            ("loader for backdoor.generic", "TrojanSignature"),
            ("os.execute('cmd.exe /c dir')", "ShellCommand"),
            ("POWERSHELL -executionpolicy bypass -File x.ps1", "ExecutionPolicyBypass"),
            ("Invoke-Expression $payload", "DynamicExecution"),
            ("iex (New-Object Net.WebClient)", "DynamicExecution"),
            ("net localgroup administrators bob /add", "GroupModification"),
            ("schtasks /create /tn updater", "ScheduledTask"),
            ("reg add HKEY_LOCAL_MACHINE\\Software", "RegistryModification"),
        ];

        for (text, expected) in cases {
            let hit = table.first_match(text).map(|s| s.name.as_str());
            assert_eq!(hit, Some(expected), "text: {text}");
        }
    }

    #[test]
    fn test_first_match_wins() {
        let table = SignatureTable::default();
        let text = "reg add HKEY_CURRENT_USER\\Run & cmd.exe /c start evil";
        let hit = table.first_match(text).unwrap();
        assert_eq!(hit.name, "ShellCommand");
        assert_eq!(hit.description, "Potentially malicious shell command.");
        assert_eq!(hit.severity, ThreatSeverity::High);
    }

    #[test]
    fn test_clean_text_has_no_match() {
        let table = SignatureTable::default();
        assert!(table
            .first_match("[Display]\nfResolutionX=1920\nbFullScreen=1")
            .is_none());
    }

    #[test]
    fn test_custom_table() {
        let specs = vec![SignatureSpec::new("Miner", r"stratum\+tcp://", "Crypto miner pool URL.")
            .with_severity(ThreatSeverity::Medium)];
        let table = SignatureTable::from_specs(&specs).unwrap();

        let hit = table.first_match("pool=STRATUM+TCP://pool.example:3333").unwrap();
        assert_eq!(hit.name, "Miner");
        assert_eq!(hit.severity, ThreatSeverity::Medium);
        assert!(table.first_match("cmd.exe /c dir").is_none());
    }

    #[test]
    fn test_invalid_pattern_is_config_error() {
        let specs = vec![SignatureSpec::new("Bad", "[", "broken")];
        let err = SignatureTable::from_specs(&specs).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSignature { ref name, .. } if name == "Bad"));
    }
}
