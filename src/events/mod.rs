//! File lifecycle events.
//!
//! Events are published through the [`EventPublisher`] trait. The
//! [`TracingPublisher`] emits them as structured audit logs on the
//! `modscan::audit` target, which any tracing subscriber can capture.

mod audit;
mod event;
mod publisher;

pub use audit::{emit_file_event, emit_quarantine_event};
pub use event::{FileEvent, FileEventKind, ScanSummary};
pub use publisher::{
    BroadcastPublisher, EventPublisher, FanoutPublisher, RecordingPublisher, TracingPublisher,
};
