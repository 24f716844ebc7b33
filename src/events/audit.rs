//! Structured audit emission through `tracing`.

use crate::events::event::FileEvent;
use crate::quarantine::QuarantineRecord;

/// Emits a file lifecycle event on the `modscan::audit` target.
pub fn emit_file_event(event: &FileEvent) {
    let scan = event.scan.as_ref();

    tracing::info!(
        target: "modscan::audit",
        event_type = event.kind.as_str(),
        event_id = %event.event_id,
        file_id = %event.file_id,
        mod_id = ?event.mod_id,
        user_id = %event.user_id,
        username = %event.username,
        scan_id = ?scan.map(|s| s.scan_id.as_str()),
        scan_status = ?scan.map(|s| s.status),
        threat_count = scan.map(|s| s.threat_count).unwrap_or(0),
        highest_severity = ?scan.and_then(|s| s.highest_severity),
        detail = ?event.detail,
        "File event"
    );
}

/// Emits an audit event for a quarantine operation.
pub fn emit_quarantine_event(record: &QuarantineRecord, operation: &str) {
    tracing::info!(
        target: "modscan::audit",
        event_type = "quarantine_operation",
        quarantine_id = %record.id,
        file_id = %record.file_id,
        file_hash_blake3 = %record.file_hash.blake3,
        operation = %operation,
        reason = %record.reason,
        user_id = ?record.user_id,
        original_filename = ?record.original_filename,
        file_size = record.file_size,
        "Quarantine operation performed"
    );
}
