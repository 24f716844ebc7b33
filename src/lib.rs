//! # modscan
//!
//! Upload security scanning for a mod hosting service: archive inspection,
//! content signature matching, a publication policy, quarantine, and an
//! asynchronous processing queue that publishes file lifecycle events.
//!
//! ## Overview
//!
//! Every uploaded file is turned into a [`SecurityScan`] verdict:
//!
//! - Archives (`.zip`, `.7z`) are walked entry by entry without extracting them.
//!   Entries are classified by extension and location, and text entries are
//!   matched against an ordered table of regex signatures.
//! - Single files are checked against an extension denylist and, when the
//!   extension is inspectable, against the same signatures.
//!
//! The [`SafetyPolicy`] then decides whether the file is published or
//! quarantined. [`FileProcessor`] runs this pipeline for each upload with
//! bounded concurrency, retries, a scan timeout and lifecycle events.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use modscan::{FileProcessor, UploadedFile};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let processor = FileProcessor::builder().build()?;
//!
//!     let file = UploadedFile::new("user-1", "alice", "notes.txt", 5);
//!     let outcome = processor.upload(file, b"hello".to_vec()).await?.wait().await?;
//!
//!     println!("{} -> {}", outcome.file_id, outcome.status);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **Core**: scan types, errors, configuration, hashing and input
//! - **Inspect**: extension rules, archive walking, signature table
//! - **Scanner**: the per-file scan workflow
//! - **Policy**: publish or quarantine decisions
//! - **Store**: scan history, file records and upload bytes
//! - **Quarantine**: withheld files awaiting review
//! - **Events**: lifecycle events and audit logging
//! - **Processing**: the worker queue
//! - **Reports**: moderation reports against published mods

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod events;
pub mod inspect;
pub mod policy;
pub mod processing;
pub mod quarantine;
pub mod reports;
pub mod scanner;
pub mod store;

// Re-export commonly used types at the crate root
pub use crate::core::{
    FileHash, FileHasher, FileInput, ProcessingError, ScanConfig, ScanStatus, SecurityScan,
    SecurityThreat, ThreatSeverity, ThreatType,
};

pub use crate::events::{EventPublisher, FileEvent, FileEventKind};
pub use crate::policy::{is_file_safe, is_scan_required, PolicyAction, SafetyPolicy};
pub use crate::processing::{FileProcessor, FileProcessorBuilder, ProcessingOutcome};
pub use crate::quarantine::{QuarantineRecord, QuarantineStore};
pub use crate::reports::{ContentReport, ContentReportingService};
pub use crate::scanner::{FileScanner, SecurityScanService};
pub use crate::store::{FileRecord, FileStatus, UploadedFile};

/// Prelude module for convenient imports.
///
/// ```rust
/// use modscan::prelude::*;
/// ```
pub mod prelude {
    pub use crate::core::{
        FileHash, FileHasher, FileInput, ProcessingError, ScanConfig, ScanStatus, SecurityScan,
        SecurityThreat, ThreatSeverity, ThreatType,
    };
    pub use crate::events::{EventPublisher, FileEvent, FileEventKind};
    pub use crate::policy::{is_file_safe, is_scan_required, PolicyAction, SafetyPolicy};
    pub use crate::processing::{FileProcessor, FileProcessorBuilder, ProcessingOutcome};
    pub use crate::quarantine::{QuarantineRecord, QuarantineStore};
    pub use crate::reports::{ContentReport, ContentReportingService};
    pub use crate::scanner::{FileScanner, SecurityScanService};
    pub use crate::store::{BlobStorage, FileRecord, FileRepository, FileStatus, UploadedFile};
}
