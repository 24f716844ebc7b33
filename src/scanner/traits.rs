//! The scanner seam used by the processing queue.

use crate::core::{FileInput, SecurityScan};

use std::fmt::Debug;

/// Something that turns an uploaded file into a verdict.
///
/// Scanning is synchronous and CPU/IO bound; the processing queue runs it
/// on a blocking thread. Implementations must never panic on bad input and
/// must always return a completed scan, using `Failed` for anything that
/// went wrong.
///
/// # Example Implementation
///
/// ```rust
/// use modscan::core::{FileInput, SecurityScan};
/// use modscan::scanner::FileScanner;
///
/// #[derive(Debug)]
/// struct AllowAll;
///
/// impl FileScanner for AllowAll {
///     fn name(&self) -> &str {
///         "allow-all"
///     }
///
///     fn scan(&self, input: &FileInput) -> SecurityScan {
///         let mut scan = SecurityScan::start();
///         scan.files_scanned = 1;
///         scan.complete()
///     }
/// }
/// ```
pub trait FileScanner: Send + Sync + Debug {
    /// Returns the name of this scanner.
    fn name(&self) -> &str;

    /// Scans the file and returns a completed verdict.
    fn scan(&self, input: &FileInput) -> SecurityScan;
}

/// An arc-wrapped scanner for shared ownership.
pub type ArcScanner = std::sync::Arc<dyn FileScanner>;
