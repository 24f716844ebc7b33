//! File hashing with BLAKE3.
//!
//! BLAKE3 is the primary hash and is what quarantine integrity checks
//! compare. SHA-256 can be enabled for systems that key uploads by it.

use crate::core::types::FileHash;

use sha2::{Digest, Sha256};
use std::io::Read;

/// Configuration for computing file hashes.
///
/// # Examples
///
/// ```rust
/// use modscan::core::FileHasher;
///
/// let hasher = FileHasher::new().with_sha256(true);
/// let hash = hasher.hash_bytes(b"mod archive bytes");
/// assert!(hash.sha256.is_some());
/// ```
#[derive(Debug, Clone, Default)]
pub struct FileHasher {
    compute_sha256: bool,
}

impl FileHasher {
    /// Creates a new `FileHasher` with default settings (BLAKE3 only).
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables SHA-256 hash computation.
    pub fn with_sha256(mut self, enabled: bool) -> Self {
        self.compute_sha256 = enabled;
        self
    }

    /// Returns whether SHA-256 computation is enabled.
    pub fn computes_sha256(&self) -> bool {
        self.compute_sha256
    }

    /// Computes hashes from bytes already in memory.
    pub fn hash_bytes(&self, data: &[u8]) -> FileHash {
        let blake3 = blake3::hash(data).to_hex().to_string();
        let sha256 = self
            .compute_sha256
            .then(|| format!("{:x}", Sha256::digest(data)));

        FileHash { blake3, sha256 }
    }

    /// Computes hashes from a synchronous reader in a single streaming pass.
    pub fn hash_reader<R: Read>(&self, reader: &mut R) -> std::io::Result<FileHash> {
        let mut blake3_hasher = blake3::Hasher::new();
        let mut sha256_hasher = self.compute_sha256.then(Sha256::new);

        let mut buffer = [0u8; 64 * 1024];
        loop {
            let bytes_read = reader.read(&mut buffer)?;
            if bytes_read == 0 {
                break;
            }

            let chunk = &buffer[..bytes_read];
            blake3_hasher.update(chunk);
            if let Some(ref mut h) = sha256_hasher {
                h.update(chunk);
            }
        }

        Ok(FileHash {
            blake3: blake3_hasher.finalize().to_hex().to_string(),
            sha256: sha256_hasher.map(|h| format!("{:x}", h.finalize())),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_hash_bytes_blake3_only() {
        let hasher = FileHasher::new();
        let hash = hasher.hash_bytes(b"hello world");

        assert_eq!(hash.blake3.len(), 64);
        assert_eq!(hash.sha256, None);
    }

    #[test]
    fn test_hash_bytes_with_sha256() {
        let hasher = FileHasher::new().with_sha256(true);
        let hash = hasher.hash_bytes(b"hello world");

        assert_eq!(
            hash.sha256.as_deref(),
            Some("b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9")
        );
    }

    #[test]
    fn test_hash_reader_matches_bytes() {
        let hasher = FileHasher::new().with_sha256(true);
        let data = vec![7u8; 200 * 1024];

        let from_bytes = hasher.hash_bytes(&data);
        let from_reader = hasher.hash_reader(&mut Cursor::new(&data)).unwrap();

        assert_eq!(from_bytes, from_reader);
    }

    #[test]
    fn test_hash_different_data() {
        let hasher = FileHasher::new();
        assert_ne!(hasher.hash_bytes(b"data1").blake3, hasher.hash_bytes(b"data2").blake3);
    }
}
