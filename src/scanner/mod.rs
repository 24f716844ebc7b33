//! Scan orchestration.
//!
//! [`SecurityScanService`] turns one uploaded file into a [`SecurityScan`]
//! verdict. The [`FileScanner`] trait is the seam the processing queue
//! depends on.
//!
//! [`SecurityScan`]: crate::core::SecurityScan

mod service;
mod traits;

pub use service::SecurityScanService;
pub use traits::{ArcScanner, FileScanner};
