//! File name classification.

use crate::core::config::ScanConfig;
use crate::core::input::extension_of;

use std::collections::HashSet;

/// Extension lists resolved into lookup sets.
///
/// `.js`, `.ps1`, `.bat`, `.cmd` and `.vbs` sit in both the suspicious and
/// the inspectable lists, so an entry with one of them is flagged for its
/// type and has its content matched.
#[derive(Debug, Clone)]
pub struct ExtensionRules {
    suspicious: HashSet<String>,
    inspectable: HashSet<String>,
    archives: HashSet<String>,
}

impl ExtensionRules {
    /// Builds the rule sets from a configuration.
    pub fn from_config(config: &ScanConfig) -> Self {
        let config = config.clone().normalized();
        Self {
            suspicious: config.suspicious_extensions.into_iter().collect(),
            inspectable: config.inspectable_extensions.into_iter().collect(),
            archives: config.archive_extensions.into_iter().collect(),
        }
    }

    /// Returns `true` if the extension is on the denylist.
    pub fn is_suspicious(&self, extension: &str) -> bool {
        self.suspicious.contains(extension)
    }

    /// Returns `true` if content with this extension is pattern matched.
    pub fn is_inspectable(&self, extension: &str) -> bool {
        self.inspectable.contains(extension)
    }

    /// Returns `true` if the file name denotes an archive.
    ///
    /// Only the extension is consulted; a renamed archive takes the
    /// simple-file path.
    pub fn is_archive(&self, filename: &str) -> bool {
        extension_of(filename)
            .map(|ext| self.is_archive_extension(&ext))
            .unwrap_or(false)
    }

    /// Returns `true` if the extension denotes an archive.
    pub fn is_archive_extension(&self, extension: &str) -> bool {
        self.archives.contains(extension)
    }
}

impl Default for ExtensionRules {
    fn default() -> Self {
        Self::from_config(&ScanConfig::default())
    }
}

/// Returns `true` if the last component of `path` starts with a dot.
pub fn is_hidden(path: &str) -> bool {
    path.rsplit(['/', '\\'])
        .next()
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rules() {
        let rules = ExtensionRules::default();
        assert!(rules.is_suspicious(".exe"));
        assert!(rules.is_suspicious(".reg"));
        assert!(!rules.is_suspicious(".txt"));

        assert!(rules.is_inspectable(".lua"));
        assert!(rules.is_inspectable(".js"));
        assert!(rules.is_suspicious(".js"));
        assert!(!rules.is_inspectable(".dds"));
    }

    #[test]
    fn test_is_archive_by_extension_only() {
        let rules = ExtensionRules::default();
        assert!(rules.is_archive("SkyUI.zip"));
        assert!(rules.is_archive("textures.7Z"));
        assert!(rules.is_archive("pack.rar"));
        assert!(!rules.is_archive("renamed_zip.dat"));
        assert!(!rules.is_archive("zip"));
    }

    #[test]
    fn test_is_hidden() {
        assert!(is_hidden(".DS_Store"));
        assert!(is_hidden("data/.secret"));
        assert!(!is_hidden("data/visible.txt"));
        assert!(!is_hidden(".config/settings.ini"));
    }
}
