//! Moderation reports filed against published mods.

mod record;
mod service;
mod store;

pub use record::{ContentReport, ReportStatus};
pub use service::ContentReportingService;
pub use store::{InMemoryReportStore, ReportStore};
