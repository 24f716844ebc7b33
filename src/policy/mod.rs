//! Publication policy.
//!
//! Decides whether a scanned file is published or quarantined, and whether
//! a file needs scanning at all.

mod action;
mod engine;

pub use action::PolicyAction;
pub use engine::{is_file_safe, is_scan_required, PolicyDecision, SafetyPolicy};
