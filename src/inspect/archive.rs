//! Archive introspection.
//!
//! Entries are enumerated without extracting the archive to disk. Each
//! entry is classified by name; only inspectable entries are matched, and
//! only up to the configured byte limit. Zip entries are read from the
//! central directory. 7z entries are streamed in archive order.

use crate::core::error::{ScanError, ScanResult};
use crate::core::input::extension_of;
use crate::core::types::{SecurityScan, SecurityThreat, ThreatSeverity};
use crate::inspect::extensions::{is_hidden, ExtensionRules};
use crate::inspect::match_content;
use crate::inspect::patterns::SignatureTable;

use sevenz_rust::{Password, SevenZReader};
use std::io::{Read, Seek, SeekFrom};
use std::sync::Arc;
use zip::ZipArchive;

/// Key used in `FolderStructure` for entries at the archive root.
pub const ROOT_FOLDER: &str = "/";

/// Walks archive entries and records findings into a scan.
#[derive(Debug, Clone)]
pub struct ArchiveInspector {
    rules: Arc<ExtensionRules>,
    signatures: Arc<SignatureTable>,
    max_inspect_bytes: u64,
    max_entries: usize,
}

impl ArchiveInspector {
    /// Creates an inspector over shared rules and signatures.
    pub fn new(
        rules: Arc<ExtensionRules>,
        signatures: Arc<SignatureTable>,
        max_inspect_bytes: u64,
        max_entries: usize,
    ) -> Self {
        Self {
            rules,
            signatures,
            max_inspect_bytes,
            max_entries,
        }
    }

    /// Inspects an archive, writing structure and threats into `scan`.
    ///
    /// `format` is the archive extension with leading dot. On error, the
    /// entries processed so far remain recorded in `scan`.
    pub fn inspect<R: Read + Seek>(
        &self,
        reader: R,
        format: &str,
        scan: &mut SecurityScan,
    ) -> ScanResult<()> {
        match format {
            ".zip" => self.inspect_zip(reader, scan),
            ".7z" => self.inspect_7z(reader, scan),
            other => Err(ScanError::UnsupportedArchive {
                format: other.trim_start_matches('.').to_string(),
            }),
        }
    }

    fn inspect_zip<R: Read + Seek>(&self, reader: R, scan: &mut SecurityScan) -> ScanResult<()> {
        let mut archive = ZipArchive::new(reader)?;

        let count = archive.len();
        if count > self.max_entries {
            return Err(ScanError::TooManyEntries {
                count,
                max: self.max_entries,
            });
        }

        tracing::debug!(scan_id = %scan.id, entries = count, "Inspecting zip archive");

        for index in 0..count {
            let (path, is_dir) = {
                let entry = archive.by_index_raw(index)?;
                (entry.name().to_string(), entry.is_dir())
            };
            if is_dir {
                continue;
            }

            let extension = self.classify_entry(&path, scan);

            if let Some(ext) = extension.filter(|e| self.rules.is_inspectable(e)) {
                let outcome = archive
                    .by_index(index)
                    .map_err(std::io::Error::other)
                    .and_then(|entry| {
                        match_content(entry, &path, self.max_inspect_bytes, &self.signatures)
                    });

                match outcome {
                    Ok(Some(threat)) => scan.push_threat(threat),
                    Ok(None) => {}
                    Err(e) => {
                        tracing::warn!(
                            scan_id = %scan.id,
                            entry = %path,
                            extension = %ext,
                            error = %e,
                            "Skipping content inspection of unreadable entry"
                        );
                    }
                }
            }
        }

        Ok(())
    }

    fn inspect_7z<R: Read + Seek>(&self, mut reader: R, scan: &mut SecurityScan) -> ScanResult<()> {
        let len = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(0))?;
        let mut archive = SevenZReader::new(reader, len, Password::empty())?;

        let count = archive.archive().files.len();
        if count > self.max_entries {
            return Err(ScanError::TooManyEntries {
                count,
                max: self.max_entries,
            });
        }

        tracing::debug!(scan_id = %scan.id, entries = count, "Inspecting 7z archive");

        archive.for_each_entries(|entry, data| {
            if entry.is_directory() {
                return Ok(true);
            }
            let path = entry.name().to_string();
            let extension = self.classify_entry(&path, scan);

            if let Some(ext) = extension.filter(|e| self.rules.is_inspectable(e)) {
                match match_content(&mut *data, &path, self.max_inspect_bytes, &self.signatures) {
                    Ok(Some(threat)) => scan.push_threat(threat),
                    Ok(None) => {}
                    Err(e) => {
                        tracing::warn!(
                            scan_id = %scan.id,
                            entry = %path,
                            extension = %ext,
                            error = %e,
                            "Skipping content inspection of unreadable entry"
                        );
                    }
                }
            }

            // Solid blocks decode sequentially; the rest of this entry must be consumed.
            if let Err(e) = std::io::copy(data, &mut std::io::sink()) {
                tracing::warn!(scan_id = %scan.id, entry = %path, error = %e, "Failed to skip entry data");
            }
            Ok(true)
        })?;

        Ok(())
    }

    /// Records structure and name-based findings for one file entry.
    /// Returns the entry's extension.
    fn classify_entry(&self, path: &str, scan: &mut SecurityScan) -> Option<String> {
        scan.files_scanned += 1;
        *scan
            .folder_structure
            .entry(parent_folder(path))
            .or_insert(0) += 1;

        let extension = extension_of(path);
        if let Some(ref ext) = extension {
            scan.detected_file_types.insert(ext.clone());

            if self.rules.is_suspicious(ext) {
                scan.push_threat(SecurityThreat::suspicious(
                    ThreatSeverity::Medium,
                    path,
                    "SuspiciousFileType",
                    format!("Archive contains a potentially dangerous file type: {}", path),
                ));
            }
        }

        if is_hidden(path) {
            scan.push_threat(SecurityThreat::suspicious(
                ThreatSeverity::Low,
                path,
                "HiddenFile",
                format!("Hidden file in archive: {}", path),
            ));
        } else if extension.is_none() {
            scan.push_threat(SecurityThreat::suspicious(
                ThreatSeverity::Low,
                path,
                "NoExtension",
                format!("File without extension in archive: {}", path),
            ));
        }

        extension
    }
}

/// Returns the directory portion of an entry path, or [`ROOT_FOLDER`].
fn parent_folder(path: &str) -> String {
    let normalized = path.replace('\\', "/");
    match normalized.trim_end_matches('/').rsplit_once('/') {
        Some((dir, _)) if !dir.is_empty() => dir.to_string(),
        _ => ROOT_FOLDER.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sevenz_rust::{SevenZArchiveEntry, SevenZWriter};
    use std::io::{Cursor, Write};
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        for (name, data) in entries {
            if name.ends_with('/') {
                writer.add_directory(*name, options).unwrap();
            } else {
                writer.start_file(*name, options).unwrap();
                writer.write_all(data).unwrap();
            }
        }
        writer.finish().unwrap().into_inner()
    }

    fn build_7z(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = SevenZWriter::new(Cursor::new(Vec::new())).unwrap();
        for (name, data) in entries {
            let mut entry = SevenZArchiveEntry::default();
            entry.name = name.to_string();
            entry.has_stream = true;
            writer.push_archive_entry(entry, Some(*data)).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    fn inspector() -> ArchiveInspector {
        ArchiveInspector::new(
            Arc::new(ExtensionRules::default()),
            Arc::new(SignatureTable::default()),
            1024 * 1024,
            100,
        )
    }

    fn inspect(data: Vec<u8>) -> (ScanResult<()>, SecurityScan) {
        let mut scan = SecurityScan::start();
        let result = inspector().inspect(Cursor::new(data), ".zip", &mut scan);
        (result, scan)
    }

    #[test]
    fn test_parent_folder() {
        assert_eq!(parent_folder("readme.txt"), "/");
        assert_eq!(parent_folder("Data/Scripts/init.lua"), "Data/Scripts");
        assert_eq!(parent_folder("Data\\meshes\\a.nif"), "Data/meshes");
    }

    #[test]
    fn test_structure_and_types() {
        let data = build_zip(&[
            ("readme.txt", b"Install with the mod manager."),
            ("Data/", b""),
            ("Data/textures/armor.dds", b"DDS "),
            ("Data/textures/armor_n.dds", b"DDS "),
            ("Data/plugin.esp", b"TES4"),
        ]);
        let (result, scan) = inspect(data);

        result.unwrap();
        assert_eq!(scan.files_scanned, 4);
        assert_eq!(scan.folder_structure.get("/"), Some(&1));
        assert_eq!(scan.folder_structure.get("Data/textures"), Some(&2));
        assert_eq!(scan.folder_structure.get("Data"), Some(&1));
        assert_eq!(
            scan.detected_file_types.iter().cloned().collect::<Vec<_>>(),
            vec![".dds", ".esp", ".txt"]
        );
        assert!(scan.threats.is_empty());
    }

    #[test]
    fn test_nested_exe_is_flagged_with_full_path() {
        let data = build_zip(&[("a/b/c/d/payload.exe", b"MZ\x90\x00")]);
        let (result, scan) = inspect(data);

        result.unwrap();
        assert_eq!(scan.threats.len(), 1);
        let threat = &scan.threats[0];
        assert_eq!(threat.file_path, "a/b/c/d/payload.exe");
        assert_eq!(threat.severity, ThreatSeverity::Medium);
        assert_eq!(threat.threat_type, crate::core::types::ThreatType::Suspicious);
    }

    #[test]
    fn test_hidden_and_extensionless_are_low() {
        let data = build_zip(&[(".hidden", b"x"), ("bin/LICENSE", b"MIT")]);
        let (result, scan) = inspect(data);

        result.unwrap();
        let names: Vec<_> = scan.threats.iter().map(|t| t.threat_name.as_str()).collect();
        assert_eq!(names, vec!["HiddenFile", "NoExtension"]);
        assert!(scan.threats.iter().all(|t| t.severity == ThreatSeverity::Low));
    }

    #[test]
    fn test_content_match_one_per_entry() {
        let data = build_zip(&[
            (
                "scripts/install.txt",
                b"cmd.exe /c dir\nschtasks /create /tn x\nWin32.Trojan",
            ),
            ("scripts/notes.txt", b"just notes"),
        ]);
        let (result, scan) = inspect(data);

        result.unwrap();
        assert_eq!(scan.threats.len(), 1);
        let threat = &scan.threats[0];
        assert_eq!(threat.threat_name, "TrojanSignature");
        assert_eq!(threat.severity, ThreatSeverity::High);
        assert_eq!(threat.file_path, "scripts/install.txt");
    }

    #[test]
    fn test_script_gets_type_and_content_findings() {
        let data = build_zip(&[("setup.bat", b"@echo off\nreg add HKEY_CURRENT_USER\\Run /v x")]);
        let (result, scan) = inspect(data);

        result.unwrap();
        let severities: Vec<_> = scan.threats.iter().map(|t| t.severity).collect();
        assert_eq!(severities, vec![ThreatSeverity::Medium, ThreatSeverity::High]);
    }

    #[test]
    fn test_content_beyond_limit_is_not_inspected() {
        let mut text = vec![b' '; 64];
        text.extend_from_slice(b"cmd.exe /c dir");
        let data = build_zip(&[("late.txt", text.as_slice())]);

        let mut scan = SecurityScan::start();
        let small = ArchiveInspector::new(
            Arc::new(ExtensionRules::default()),
            Arc::new(SignatureTable::default()),
            32,
            100,
        );
        small.inspect(Cursor::new(data), ".zip", &mut scan).unwrap();
        assert!(scan.threats.is_empty());
    }

    #[test]
    fn test_empty_archive() {
        let (result, scan) = inspect(build_zip(&[]));
        result.unwrap();
        assert_eq!(scan.files_scanned, 0);
        assert!(scan.threats.is_empty());
        assert!(scan.folder_structure.is_empty());
    }

    #[test]
    fn test_corrupt_archive_is_error() {
        let (result, scan) = inspect(b"PK\x03\x04 definitely not a zip".to_vec());
        assert!(result.is_err());
        assert_eq!(scan.files_scanned, 0);
    }

    #[test]
    fn test_too_many_entries() {
        let data = build_zip(&[("a.txt", b"a"), ("b.txt", b"b"), ("c.txt", b"c")]);
        let mut scan = SecurityScan::start();
        let limited = ArchiveInspector::new(
            Arc::new(ExtensionRules::default()),
            Arc::new(SignatureTable::default()),
            1024,
            2,
        );
        let err = limited.inspect(Cursor::new(data), ".zip", &mut scan).unwrap_err();
        assert!(matches!(err, ScanError::TooManyEntries { count: 3, max: 2 }));
    }

    #[test]
    fn test_7z_entries_are_classified_and_matched() {
        let data = build_7z(&[
            ("readme.txt", b"Drop the folder into Data/."),
            ("Data/textures/sky.dds", b"DDS "),
            ("tools/patch.exe", b"MZ\x90\x00"),
            ("tools/install.txt", b"powershell -ExecutionPolicy Bypass -File run.ps1"),
        ]);
        let mut scan = SecurityScan::start();
        inspector()
            .inspect(Cursor::new(data), ".7z", &mut scan)
            .unwrap();

        assert_eq!(scan.files_scanned, 4);
        assert_eq!(scan.folder_structure.get("tools"), Some(&2));
        assert_eq!(scan.folder_structure.get("Data/textures"), Some(&1));
        assert!(scan.detected_file_types.contains(".exe"));

        let paths: Vec<_> = scan.threats.iter().map(|t| t.file_path.as_str()).collect();
        assert_eq!(paths, vec!["tools/patch.exe", "tools/install.txt"]);
        assert_eq!(scan.threats[0].threat_name, "SuspiciousFileType");
        assert_eq!(scan.threats[1].severity, ThreatSeverity::High);
    }

    #[test]
    fn test_7z_entry_limit() {
        let data = build_7z(&[("a.txt", b"a"), ("b.txt", b"b"), ("c.txt", b"c")]);
        let mut scan = SecurityScan::start();
        let limited = ArchiveInspector::new(
            Arc::new(ExtensionRules::default()),
            Arc::new(SignatureTable::default()),
            1024,
            2,
        );
        let err = limited.inspect(Cursor::new(data), ".7z", &mut scan).unwrap_err();
        assert!(matches!(err, ScanError::TooManyEntries { count: 3, max: 2 }));
        assert_eq!(scan.files_scanned, 0);
    }

    #[test]
    fn test_corrupt_7z_is_error() {
        let mut scan = SecurityScan::start();
        let err = inspector()
            .inspect(Cursor::new(b"7z\xbc\xaf\x27\x1c garbage".to_vec()), ".7z", &mut scan)
            .unwrap_err();
        assert!(matches!(err, ScanError::CorruptArchive { .. }));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_unsupported_formats() {
        let mut scan = SecurityScan::start();
        let err = inspector()
            .inspect(Cursor::new(b"Rar!\x1a\x07\x00".to_vec()), ".rar", &mut scan)
            .unwrap_err();
        assert!(matches!(err, ScanError::UnsupportedArchive { ref format } if format == "rar"));
    }
}
