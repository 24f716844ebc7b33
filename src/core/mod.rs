//! Core types for the modscan library.
//!
//! - [`types`] - `SecurityScan`, `SecurityThreat` and their enums
//! - [`error`] - Structured error types
//! - [`input`] - File input abstraction and the stream position guard
//! - [`hasher`] - BLAKE3-based file hashing
//! - [`config`] - Scanner and queue configuration

pub mod config;
pub mod error;
pub mod hasher;
pub mod input;
pub mod types;

pub use config::{ScanConfig, SignatureSpec};
pub use error::{
    ConfigError, ProcessingError, QuarantineError, ReportError, ScanError, StorageError,
};
pub use hasher::FileHasher;
pub use input::{FileInput, PositionGuard};
pub use types::{
    FileHash, ScanStatus, SecurityScan, SecurityThreat, ThreatSeverity, ThreatType,
};
