//! Static inspection: extension classification, archive walking and
//! content signature matching.
//!
//! - [`extensions`] - Denylist, allowlist and archive detection by name
//! - [`patterns`] - The ordered, data-driven signature table
//! - [`archive`] - Central-directory walk over uploaded archives

pub mod archive;
pub mod extensions;
pub mod patterns;

pub use archive::{ArchiveInspector, ROOT_FOLDER};
pub use extensions::{is_hidden, ExtensionRules};
pub use patterns::{Signature, SignatureTable};

use crate::core::types::SecurityThreat;

use std::io::Read;

/// Reads up to `limit` bytes, decodes them as lossy UTF-8 and returns a
/// threat for the first matching signature.
///
/// `path` is recorded as the threat's `FilePath`.
pub fn match_content<R: Read>(
    reader: R,
    path: &str,
    limit: u64,
    signatures: &SignatureTable,
) -> std::io::Result<Option<SecurityThreat>> {
    let mut buffer = Vec::new();
    reader.take(limit).read_to_end(&mut buffer)?;
    let text = String::from_utf8_lossy(&buffer);

    Ok(signatures.first_match(&text).map(|signature| {
        SecurityThreat::suspicious(
            signature.severity,
            path,
            signature.name.clone(),
            format!("Suspicious content in {}: {}", path, signature.description),
        )
    }))
}
