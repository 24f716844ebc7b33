//! Asynchronous processing of uploaded files.
//!
//! The [`FileProcessor`] moves each upload through the lifecycle
//!
//! ```text
//! Pending -> Scanning -> Clean | Infected -> Processed | Quarantined
//!                     \-> Failed (retries exhausted or unrecoverable)
//! ```
//!
//! with bounded concurrency ([`ProcessingQueue`]) and backoff on transient
//! failures ([`RetryConfig`]).

mod processor;
mod queue;
mod retry;

pub use processor::{FileProcessor, FileProcessorBuilder, RescanOutcome};
pub use queue::{HandleStatus, ProcessingHandle, ProcessingOutcome, ProcessingQueue};
pub use retry::{retry_async, RetryConfig, RetryFailure};
