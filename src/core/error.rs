//! Error types for the modscan library.
//!
//! Scanning itself never fails from the caller's point of view: input errors
//! are folded into a `Failed` verdict. The types here cover the internal
//! scan path plus the collaborators around it (configuration, storage,
//! quarantine, the processing queue and content reporting).

use std::time::Duration;
use thiserror::Error;

/// Errors raised while inspecting a single file.
///
/// The orchestrator converts these into a `Failed` scan with a comment;
/// they are only visible to code that drives the inspectors directly.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The archive could not be opened or iterated.
    #[error("corrupt or unreadable archive: {reason}")]
    CorruptArchive {
        /// Description of what went wrong.
        reason: String,
    },

    /// The container is recognised as an archive but cannot be read.
    #[error("unsupported archive format: {format}")]
    UnsupportedArchive {
        /// The archive extension, without the leading dot.
        format: String,
    },

    /// The archive holds more entries than the configured limit.
    #[error("archive has {count} entries, limit is {max}")]
    TooManyEntries {
        /// Number of entries found.
        count: usize,
        /// Configured maximum.
        max: usize,
    },

    /// The scan exceeded the configured timeout.
    #[error("scan timed out after {elapsed:?}")]
    Timeout {
        /// How long the scan ran before being abandoned.
        elapsed: Duration,
    },

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An internal error occurred.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl ScanError {
    /// Returns `true` if scanning the same bytes again may succeed.
    ///
    /// Archive problems are properties of the upload and fail the same way
    /// every time.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. } | Self::Io(_) | Self::Internal { .. }
        )
    }

    /// Creates a `CorruptArchive` error.
    pub fn corrupt_archive(reason: impl Into<String>) -> Self {
        Self::CorruptArchive {
            reason: reason.into(),
        }
    }

    /// Creates an `Internal` error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

impl From<zip::result::ZipError> for ScanError {
    fn from(e: zip::result::ZipError) -> Self {
        match e {
            zip::result::ZipError::Io(io) => Self::Io(io),
            other => Self::corrupt_archive(other.to_string()),
        }
    }
}

impl From<sevenz_rust::Error> for ScanError {
    fn from(e: sevenz_rust::Error) -> Self {
        Self::corrupt_archive(e.to_string())
    }
}

/// Error type for configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A signature pattern failed to compile.
    #[error("invalid signature '{name}': {reason}")]
    InvalidSignature {
        /// Name of the offending signature.
        name: String,
        /// Compiler message.
        reason: String,
    },

    /// A numeric limit is out of range.
    #[error("invalid value for '{field}': {reason}")]
    InvalidValue {
        /// Field name.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// The configuration file could not be read.
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file could not be parsed.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Error type for blob storage and record persistence.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The requested object does not exist.
    #[error("not found: {key}")]
    NotFound {
        /// Identifier or storage location that was missing.
        key: String,
    },

    /// The key cannot be mapped to a storage location.
    #[error("invalid storage key: {key}")]
    InvalidKey {
        /// The rejected key.
        key: String,
    },

    /// The backing store is temporarily unreachable.
    #[error("storage unavailable: {reason}")]
    Unavailable {
        /// Reason reported by the backend.
        reason: String,
    },

    /// A record could not be (de)serialized.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    /// Creates a `NotFound` error.
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    /// Returns `true` if retrying the operation may succeed.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Unavailable { .. } | Self::Io(_))
    }
}

/// Error type for quarantine operations.
#[derive(Debug, Error)]
pub enum QuarantineError {
    /// Failed to store the file in quarantine.
    #[error("failed to store file in quarantine: {reason}")]
    StoreFailed {
        /// Reason for the failure.
        reason: String,
    },

    /// Quarantine record not found.
    #[error("quarantine record not found: {id}")]
    NotFound {
        /// The quarantine ID or file ID that was not found.
        id: String,
    },

    /// Failed to retrieve file from quarantine.
    #[error("failed to retrieve file from quarantine: {reason}")]
    RetrieveFailed {
        /// Reason for the failure.
        reason: String,
    },

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// File integrity check failed.
    #[error("file integrity check failed: expected {expected}, got {actual}")]
    IntegrityCheckFailed {
        /// Expected hash.
        expected: String,
        /// Actual hash.
        actual: String,
    },
}

/// Error type for the file processing queue.
#[derive(Debug, Error)]
pub enum ProcessingError {
    /// The uploaded file's bytes could not be fetched.
    #[error("download of '{file_id}' failed: {source}")]
    Download {
        /// File identifier.
        file_id: String,
        /// Underlying storage error.
        #[source]
        source: StorageError,
    },

    /// The scan finished with a `Failed` verdict.
    #[error("scan of '{file_id}' failed: {comment}")]
    ScanFailed {
        /// File identifier.
        file_id: String,
        /// Diagnostic comment from the scan.
        comment: String,
    },

    /// The scan failed in a way another attempt cannot change.
    #[error("'{file_id}' cannot be scanned: {comment}")]
    Unscannable {
        /// File identifier.
        file_id: String,
        /// Diagnostic comment from the scan.
        comment: String,
    },

    /// All retry attempts were used up.
    #[error("processing of '{file_id}' gave up after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        /// File identifier.
        file_id: String,
        /// Number of attempts made.
        attempts: u32,
        /// Message of the final failure.
        last_error: String,
    },

    /// The requested file is unknown to the repository.
    #[error("unknown file: {file_id}")]
    UnknownFile {
        /// File identifier.
        file_id: String,
    },

    /// The operation is not valid for the file's current status.
    #[error("file '{file_id}' is {status}, expected {expected}")]
    InvalidState {
        /// File identifier.
        file_id: String,
        /// Current status.
        status: String,
        /// Status the operation requires.
        expected: &'static str,
    },

    /// A restore was attempted without naming a reviewer.
    #[error("restoring a quarantined file requires a reviewer")]
    ReviewerRequired,

    /// A persistence error occurred.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// A quarantine error occurred.
    #[error(transparent)]
    Quarantine(#[from] QuarantineError),

    /// The worker task was cancelled or panicked.
    #[error("worker task aborted: {reason}")]
    WorkerAborted {
        /// Join error description.
        reason: String,
    },
}

impl ProcessingError {
    /// Returns `true` if another attempt may succeed.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Download { source, .. } => {
                source.is_recoverable() || matches!(source, StorageError::NotFound { .. })
            }
            Self::ScanFailed { .. } => true,
            _ => false,
        }
    }
}

/// Error type for content reporting.
#[derive(Debug, Error)]
pub enum ReportError {
    /// The report does not exist.
    #[error("report not found: {id}")]
    NotFound {
        /// Report identifier.
        id: String,
    },

    /// The report was already resolved.
    #[error("report {id} is already resolved")]
    AlreadyResolved {
        /// Report identifier.
        id: String,
    },

    /// A required field was empty.
    #[error("missing field: {field}")]
    MissingField {
        /// Name of the field.
        field: &'static str,
    },

    /// The backing store failed.
    #[error("report storage error: {0}")]
    Storage(#[from] StorageError),
}

/// A specialized `Result` type for scan internals.
pub type ScanResult<T> = Result<T, ScanError>;

/// A specialized `Result` type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// A specialized `Result` type for quarantine operations.
pub type QuarantineResult<T> = Result<T, QuarantineError>;
