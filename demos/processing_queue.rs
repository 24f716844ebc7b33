//! Runs uploads through the processing queue and reacts to lifecycle events.
//!
//! This example shows how to:
//! - Build a `FileProcessor` with a broadcast event publisher
//! - Upload clean and infected files and wait for their outcomes
//! - Restore a quarantined file after review
//! - File and resolve a content report
//!
//! Run with: cargo run --example processing_queue

use modscan::events::BroadcastPublisher;
use modscan::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let events = Arc::new(BroadcastPublisher::new(64));
    let mut subscriber = events.subscribe();
    let listener = tokio::spawn(async move {
        while let Ok(event) = subscriber.recv().await {
            println!("  event {:<24} {}", event.kind.as_str(), event.file_id);
        }
    });

    let processor = FileProcessor::builder()
        .with_config(
            ScanConfig::default()
                .with_max_concurrent_scans(2)
                .with_scan_timeout(Duration::from_secs(10)),
        )
        .with_event_publisher(events.clone())
        .build()?;

    println!("=== Uploading ===");
    let uploads = vec![
        (
            UploadedFile::new("user-1", "alice", "readme.txt", 12).with_mod_id("mod-42"),
            b"Just a readme".to_vec(),
        ),
        (
            UploadedFile::new("user-2", "bob", "install.bat", 48).with_mod_id("mod-43"),
            b"powershell -ExecutionPolicy Bypass -File run.ps1".to_vec(),
        ),
    ];

    let mut handles = Vec::new();
    for (file, data) in uploads {
        handles.push(processor.upload(file, data).await?);
    }

    let mut quarantined = Vec::new();
    for handle in handles {
        let outcome = handle.wait().await?;
        println!(
            "{} -> {} ({} threat(s), {} attempt(s))",
            outcome.file_id,
            outcome.status,
            outcome.scan.threat_count(),
            outcome.attempts
        );
        if outcome.status == FileStatus::Quarantined {
            quarantined.push(outcome.file_id);
        }
    }

    println!("\n=== Review ===");
    for file_id in &quarantined {
        let record = processor.restore(file_id, "moderator").await?;
        println!("{} restored, approved = {}", file_id, record.approved);
    }

    println!("\n=== Reports ===");
    let reports = ContentReportingService::default();
    let report = reports
        .submit("mod-43", "user-7", "malware", Some("batch file bypasses the execution policy"))
        .await?;
    reports.resolve(&report.id, "moderator", "false positive").await?;
    println!("pending reports: {}", reports.list_pending().await?.len());

    drop(processor);
    drop(events);
    listener.await?;
    Ok(())
}
