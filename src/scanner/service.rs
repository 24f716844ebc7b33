//! The scan orchestrator.

use crate::core::config::ScanConfig;
use crate::core::error::{ConfigError, ScanResult};
use crate::core::hasher::FileHasher;
use crate::core::input::{extension_of, FileInput, PositionGuard};
use crate::core::types::{SecurityScan, SecurityThreat};
use crate::inspect::{match_content, ArchiveInspector, ExtensionRules, SignatureTable};
use crate::scanner::traits::FileScanner;

use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek, SeekFrom};
use std::sync::Arc;
use tracing::{info, warn};

/// Produces a [`SecurityScan`] for one uploaded file.
///
/// Archives (by extension) are walked entry by entry; anything else is
/// checked against the extension denylist and, when inspectable, matched
/// against the signature table. Every call returns a terminal scan: input
/// problems become a `Failed` verdict with a comment, never an error.
///
/// The service holds no per-scan state and can be shared across threads.
///
/// # Example
///
/// ```rust
/// use modscan::scanner::SecurityScanService;
/// use modscan::core::ScanStatus;
///
/// let service = SecurityScanService::default();
/// let scan = service.scan_bytes(b"cmd.exe /c dir", "install.txt", Some("text/plain"));
/// assert_eq!(scan.status, ScanStatus::Infected);
/// ```
#[derive(Debug, Clone)]
pub struct SecurityScanService {
    rules: Arc<ExtensionRules>,
    signatures: Arc<SignatureTable>,
    archives: ArchiveInspector,
    hasher: FileHasher,
    max_inspect_bytes: u64,
}

impl SecurityScanService {
    /// Creates a service from a configuration.
    ///
    /// Fails if the configuration is invalid or a signature pattern does
    /// not compile.
    pub fn new(config: &ScanConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let signatures = SignatureTable::from_specs(&config.signatures)?;
        Ok(Self::with_parts(config, signatures))
    }

    fn with_parts(config: &ScanConfig, signatures: SignatureTable) -> Self {
        let rules = Arc::new(ExtensionRules::from_config(config));
        let signatures = Arc::new(signatures);
        let archives = ArchiveInspector::new(
            Arc::clone(&rules),
            Arc::clone(&signatures),
            config.max_inspect_bytes,
            config.max_archive_entries,
        );

        Self {
            rules,
            signatures,
            archives,
            hasher: FileHasher::new().with_sha256(config.compute_sha256),
            max_inspect_bytes: config.max_inspect_bytes,
        }
    }

    /// Returns the compiled signature table.
    pub fn signatures(&self) -> &SignatureTable {
        &self.signatures
    }

    /// Returns the extension rules.
    pub fn rules(&self) -> &ExtensionRules {
        &self.rules
    }

    /// Scans an in-memory buffer.
    pub fn scan_bytes(
        &self,
        data: &[u8],
        filename: &str,
        content_type: Option<&str>,
    ) -> SecurityScan {
        self.scan_reader(&mut Cursor::new(data), filename, content_type)
    }

    /// Scans a seekable stream from its start.
    ///
    /// The stream is read from offset 0 regardless of its current position,
    /// and its original position is restored before returning, on success
    /// and on failure.
    pub fn scan_reader<R: Read + Seek>(
        &self,
        reader: &mut R,
        filename: &str,
        content_type: Option<&str>,
    ) -> SecurityScan {
        let mut scan = SecurityScan::start();
        info!(
            scan_id = %scan.id,
            filename = %filename,
            content_type = content_type.unwrap_or("unknown"),
            "Starting security scan"
        );

        let outcome = match PositionGuard::new(reader) {
            Ok(mut guard) => self.run(&mut *guard, filename, &mut scan),
            Err(e) => Err(e.into()),
        };

        let scan = match outcome {
            Ok(()) => scan.complete(),
            Err(e) => {
                warn!(
                    scan_id = %scan.id,
                    error = %e,
                    recoverable = e.is_recoverable(),
                    "Security scan failed"
                );
                let comment = format!("Scan failed: {}", e);
                if e.is_recoverable() {
                    scan.fail(comment)
                } else {
                    scan.fail_permanently(comment)
                }
            }
        };

        info!(
            scan_id = %scan.id,
            filename = %filename,
            status = %scan.status,
            files_scanned = scan.files_scanned,
            threats = scan.threat_count(),
            "Security scan finished"
        );
        scan
    }

    /// Scans a [`FileInput`], opening it first if it is a path.
    pub fn scan_input(&self, input: &FileInput) -> SecurityScan {
        let filename = input.filename().unwrap_or_default();
        let content_type = input.content_type();

        match input {
            FileInput::Bytes { data, .. } => self.scan_bytes(data, filename, content_type),
            FileInput::Path { path, .. } => match File::open(path) {
                Ok(file) => {
                    self.scan_reader(&mut BufReader::new(file), filename, content_type)
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Unable to open file for scanning");
                    SecurityScan::start().fail(format!("Unable to open file: {}", e))
                }
            },
        }
    }

    fn run<R: Read + Seek>(
        &self,
        reader: &mut R,
        filename: &str,
        scan: &mut SecurityScan,
    ) -> ScanResult<()> {
        reader.seek(SeekFrom::Start(0))?;
        scan.file_hash = Some(self.hasher.hash_reader(reader)?);
        reader.seek(SeekFrom::Start(0))?;

        let extension = extension_of(filename);
        match extension {
            Some(ext) if self.rules.is_archive_extension(&ext) => {
                self.archives.inspect(reader, &ext, scan)
            }
            other => self.scan_simple(reader, filename, other, scan),
        }
    }

    fn scan_simple<R: Read>(
        &self,
        reader: &mut R,
        filename: &str,
        extension: Option<String>,
        scan: &mut SecurityScan,
    ) -> ScanResult<()> {
        scan.files_scanned = 1;

        let Some(ext) = extension else {
            return Ok(());
        };
        scan.detected_file_types.insert(ext.clone());

        if self.rules.is_suspicious(&ext) {
            scan.push_threat(SecurityThreat::unauthorized(
                filename,
                "UnauthorizedFileType",
                format!("File type not allowed: {}", ext),
            ));
        }

        if self.rules.is_inspectable(&ext) {
            if let Some(threat) =
                match_content(reader, filename, self.max_inspect_bytes, &self.signatures)?
            {
                scan.push_threat(threat);
            }
        }

        Ok(())
    }
}

impl Default for SecurityScanService {
    fn default() -> Self {
        Self::with_parts(&ScanConfig::default(), SignatureTable::default())
    }
}

impl FileScanner for SecurityScanService {
    fn name(&self) -> &str {
        crate::core::types::SCAN_ENGINE
    }

    fn scan(&self, input: &FileInput) -> SecurityScan {
        self.scan_input(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::SignatureSpec;
    use crate::core::types::{ScanStatus, ThreatSeverity, ThreatType};
    use sevenz_rust::{SevenZArchiveEntry, SevenZWriter};
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        for (name, data) in entries {
            writer.start_file(*name, options).unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_archive_with_executable_is_infected() {
        let service = SecurityScanService::default();
        let data = build_zip(&[
            ("readme.txt", b"Drop the folder into Data."),
            ("payload.exe", b"MZ\x90\x00"),
        ]);

        let scan = service.scan_bytes(&data, "CoolMod.zip", Some("application/zip"));

        assert_eq!(scan.status, ScanStatus::Infected);
        assert!(scan.is_complete);
        assert_eq!(scan.files_scanned, 2);
        assert_eq!(scan.threats.len(), 1);
        assert_eq!(scan.threats[0].file_path, "payload.exe");
        assert_eq!(scan.threats[0].severity, ThreatSeverity::Medium);
        assert!(scan.detected_file_types.contains(".txt"));
        assert!(scan.detected_file_types.contains(".exe"));
        assert_eq!(scan.folder_structure.get("/"), Some(&2));
        assert!(scan.file_hash.is_some());
    }

    #[test]
    fn test_clean_archive() {
        let service = SecurityScanService::default();
        let data = build_zip(&[
            ("readme.txt", b"Requires SKSE."),
            ("textures/sword.dds", b"DDS "),
        ]);

        let scan = service.scan_bytes(&data, "Sword.zip", None);
        assert_eq!(scan.status, ScanStatus::Clean);
        assert!(scan.is_clean());
        assert!(scan.threats.is_empty());
    }

    #[test]
    fn test_empty_archive_is_clean() {
        let service = SecurityScanService::default();
        let scan = service.scan_bytes(&build_zip(&[]), "empty.zip", None);

        assert_eq!(scan.status, ScanStatus::Clean);
        assert_eq!(scan.files_scanned, 0);
        assert!(scan.folder_structure.is_empty());
    }

    #[test]
    fn test_corrupt_archive_fails() {
        let service = SecurityScanService::default();
        let scan = service.scan_bytes(b"this is not a zip file", "broken.zip", None);

        assert_eq!(scan.status, ScanStatus::Failed);
        assert!(scan.is_complete);
        assert!(scan.comments.as_deref().unwrap_or_default().starts_with("Scan failed:"));
        assert!(scan.permanent_failure);
    }

    #[test]
    fn test_rar_is_unsupported() {
        let service = SecurityScanService::default();
        let scan = service.scan_bytes(b"Rar!\x1a\x07\x00", "pack.rar", None);

        assert_eq!(scan.status, ScanStatus::Failed);
        assert!(scan.permanent_failure);
        assert!(scan.comments.unwrap().contains("rar"));
    }

    #[test]
    fn test_7z_archive_is_inspected() {
        let mut writer = SevenZWriter::new(Cursor::new(Vec::new())).unwrap();
        for (name, data) in [
            ("readme.txt", &b"Unpack into Data/"[..]),
            ("scripts/setup.bat", &b"reg add HKEY_LOCAL_MACHINE\\Software /v x"[..]),
        ] {
            let mut entry = SevenZArchiveEntry::default();
            entry.name = name.to_string();
            entry.has_stream = true;
            writer.push_archive_entry(entry, Some(data)).unwrap();
        }
        let data = writer.finish().unwrap().into_inner();

        let service = SecurityScanService::default();
        let scan = service.scan_bytes(&data, "Lighting.7z", None);

        assert_eq!(scan.status, ScanStatus::Infected);
        assert_eq!(scan.files_scanned, 2);
        assert_eq!(scan.folder_structure.get("scripts"), Some(&1));
        let names: Vec<_> = scan.threats.iter().map(|t| t.threat_name.as_str()).collect();
        assert_eq!(names, vec!["SuspiciousFileType", "RegistryModification"]);
    }

    #[test]
    fn test_unreadable_path_is_retryable() {
        let service = SecurityScanService::default();
        let scan = service.scan_input(&FileInput::from_path("/nonexistent/mod.zip"));
        assert!(!scan.permanent_failure);
    }

    #[test]
    fn test_renamed_archive_takes_simple_path() {
        let service = SecurityScanService::default();
        let data = build_zip(&[("payload.exe", b"MZ")]);

        let scan = service.scan_bytes(&data, "archive.dat", None);
        assert_eq!(scan.status, ScanStatus::Clean);
        assert_eq!(scan.files_scanned, 1);
    }

    #[test]
    fn test_text_file_with_shell_command() {
        let service = SecurityScanService::default();
        let scan = service.scan_bytes(b"cmd.exe /c dir", "notes.txt", Some("text/plain"));

        assert_eq!(scan.status, ScanStatus::Infected);
        assert_eq!(scan.files_scanned, 1);
        assert_eq!(scan.threats.len(), 1);
        assert_eq!(scan.threats[0].threat_name, "ShellCommand");
        assert_eq!(scan.threats[0].severity, ThreatSeverity::High);
    }

    #[test]
    fn test_unauthorized_executable_upload() {
        let service = SecurityScanService::default();
        let scan = service.scan_bytes(b"MZ\x90\x00", "Launcher.EXE", None);

        assert_eq!(scan.status, ScanStatus::Infected);
        let threat = &scan.threats[0];
        assert_eq!(threat.threat_type, ThreatType::Unauthorized);
        assert_eq!(threat.severity, ThreatSeverity::High);
        assert_eq!(threat.description, "File type not allowed: .exe");
    }

    #[test]
    fn test_script_upload_gets_both_findings() {
        let service = SecurityScanService::default();
        let scan = service.scan_bytes(
            b"powershell -ExecutionPolicy Bypass -File x.ps1",
            "install.ps1",
            None,
        );

        assert_eq!(scan.threats.len(), 2);
        assert_eq!(scan.threats[0].threat_type, ThreatType::Unauthorized);
        assert_eq!(scan.threats[1].threat_name, "ExecutionPolicyBypass");
    }

    #[test]
    fn test_uninspected_type_is_clean() {
        let service = SecurityScanService::default();
        let scan = service.scan_bytes(b"cmd.exe /c dir", "texture.dds", None);
        assert_eq!(scan.status, ScanStatus::Clean);
    }

    #[test]
    fn test_file_without_extension() {
        let service = SecurityScanService::default();
        let scan = service.scan_bytes(b"cmd.exe /c dir", "LICENSE", None);

        assert_eq!(scan.status, ScanStatus::Clean);
        assert_eq!(scan.files_scanned, 1);
        assert!(scan.detected_file_types.is_empty());
    }

    #[test]
    fn test_scan_is_idempotent() {
        let service = SecurityScanService::default();
        let data = build_zip(&[
            ("a/.hidden", b"x"),
            ("a/run.bat", b"net localgroup administrators bob /add"),
            ("b/README", b"hello"),
        ]);

        let first = service.scan_bytes(&data, "mod.zip", None);
        let second = service.scan_bytes(&data, "mod.zip", None);

        assert_ne!(first.id, second.id);
        assert_eq!(first.status, second.status);
        assert_eq!(first.files_scanned, second.files_scanned);
        assert_eq!(first.threats, second.threats);
        assert_eq!(first.folder_structure, second.folder_structure);
        assert_eq!(first.detected_file_types, second.detected_file_types);
        assert_eq!(first.file_hash, second.file_hash);
    }

    #[test]
    fn test_stream_position_is_restored() {
        let service = SecurityScanService::default();
        let data = build_zip(&[("payload.exe", b"MZ")]);
        let mut cursor = Cursor::new(data.clone());
        cursor.set_position(17);

        let scan = service.scan_reader(&mut cursor, "mod.zip", None);

        assert_eq!(cursor.position(), 17);
        assert_eq!(scan.status, ScanStatus::Infected);
    }

    #[test]
    fn test_stream_position_restored_on_failure() {
        let service = SecurityScanService::default();
        let mut cursor = Cursor::new(b"not a zip".to_vec());
        cursor.set_position(4);

        let scan = service.scan_reader(&mut cursor, "bad.zip", None);

        assert_eq!(scan.status, ScanStatus::Failed);
        assert_eq!(cursor.position(), 4);
    }

    #[test]
    fn test_scan_input_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("init.lua");
        std::fs::write(&path, b"os.execute('schtasks /create /tn x')").unwrap();

        let service = SecurityScanService::default();
        let scan = service.scan_input(&FileInput::from_path(&path));

        assert_eq!(scan.status, ScanStatus::Infected);
        assert_eq!(scan.threats[0].threat_name, "ScheduledTask");
    }

    #[test]
    fn test_scan_input_missing_path_fails() {
        let service = SecurityScanService::default();
        let scan = service.scan_input(&FileInput::from_path("/nonexistent/mod.zip"));

        assert_eq!(scan.status, ScanStatus::Failed);
        assert!(scan.comments.unwrap().starts_with("Unable to open file"));
    }

    #[test]
    fn test_custom_signatures() {
        let config = ScanConfig::default().with_signatures(vec![SignatureSpec::new(
            "Miner",
            r"stratum\+tcp://",
            "Cryptocurrency miner pool address",
        )
        .with_severity(ThreatSeverity::Medium)]);
        let service = SecurityScanService::new(&config).unwrap();

        let mined = service.scan_bytes(b"pool=stratum+tcp://pool.example:3333", "cfg.ini", None);
        assert_eq!(mined.threats[0].threat_name, "Miner");
        assert_eq!(mined.threats[0].severity, ThreatSeverity::Medium);

        let shell = service.scan_bytes(b"cmd.exe /c dir", "cfg.ini", None);
        assert!(shell.is_clean());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = ScanConfig::default().with_max_inspect_bytes(0);
        assert!(SecurityScanService::new(&config).is_err());
    }

    #[test]
    fn test_sha256_opt_in() {
        let service = SecurityScanService::new(&ScanConfig::default().with_sha256(true)).unwrap();
        let scan = service.scan_bytes(b"hello world", "a.txt", None);
        assert!(scan.file_hash.unwrap().sha256.is_some());
    }
}
