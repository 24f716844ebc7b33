//! Persistence for scan verdicts, uploaded file records and upload bytes.
//!
//! Each concern is a trait with an in-memory and, where it makes sense, a
//! filesystem implementation:
//!
//! - [`ScanResultStore`] - [`InMemoryScanStore`], [`FilesystemScanStore`]
//! - [`FileRepository`] - [`InMemoryFileRepository`]
//! - [`BlobStorage`] - [`InMemoryBlobStorage`], [`FilesystemBlobStorage`]

mod filesystem;
mod memory;
mod record;
mod traits;

pub use filesystem::{FilesystemBlobStorage, FilesystemScanStore};
pub use memory::{InMemoryBlobStorage, InMemoryFileRepository, InMemoryScanStore};
pub use record::{FileRecord, FileStatus, UploadedFile};
pub use traits::{BlobStorage, FileRepository, ScanResultStore};
