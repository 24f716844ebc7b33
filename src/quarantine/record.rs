//! Quarantine record types.

use crate::core::{FileHash, SecurityScan};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a quarantined file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuarantineId(pub String);

impl QuarantineId {
    /// Creates a new random quarantine ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Returns the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for QuarantineId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for QuarantineId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for QuarantineId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Metadata about a withheld upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuarantineRecord {
    /// Unique identifier for this quarantine record.
    pub id: QuarantineId,

    /// The uploaded file this record withholds.
    pub file_id: String,

    /// Uploader's user id.
    pub user_id: Option<String>,

    /// Original filename.
    pub original_filename: Option<String>,

    /// Hash of the withheld bytes.
    pub file_hash: FileHash,

    /// Size of the file in bytes.
    pub file_size: u64,

    /// When the file was quarantined.
    pub quarantined_at: DateTime<Utc>,

    /// Reason for quarantine.
    pub reason: String,

    /// The scan that triggered quarantine.
    pub scan: SecurityScan,

    /// When the quarantine record expires (for auto-cleanup).
    pub expires_at: Option<DateTime<Utc>>,
}

impl QuarantineRecord {
    /// Creates a new quarantine record.
    pub fn new(
        file_id: impl Into<String>,
        file_hash: FileHash,
        file_size: u64,
        reason: impl Into<String>,
        scan: SecurityScan,
    ) -> Self {
        Self {
            id: QuarantineId::new(),
            file_id: file_id.into(),
            user_id: None,
            original_filename: None,
            file_hash,
            file_size,
            quarantined_at: Utc::now(),
            reason: reason.into(),
            scan,
            expires_at: None,
        }
    }

    /// Sets the uploader.
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Sets the original filename.
    pub fn with_original_filename(mut self, filename: impl Into<String>) -> Self {
        self.original_filename = Some(filename.into());
        self
    }

    /// Sets the expiration time.
    pub fn with_expires_at(mut self, expires: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires);
        self
    }

    /// Returns true if this record has expired.
    pub fn is_expired(&self) -> bool {
        self.expires_at.map(|e| e < Utc::now()).unwrap_or(false)
    }
}

/// Filter for listing quarantine records.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuarantineFilter {
    /// Filter by file id.
    pub file_id: Option<String>,

    /// Filter by uploader.
    pub user_id: Option<String>,

    /// Filter by BLAKE3 hash.
    pub file_hash: Option<String>,

    /// Filter by minimum quarantine date.
    pub quarantined_after: Option<DateTime<Utc>>,

    /// Maximum number of records to return.
    pub limit: Option<usize>,

    /// Offset for pagination.
    pub offset: Option<usize>,

    /// Include expired records.
    pub include_expired: bool,
}

impl QuarantineFilter {
    /// Creates a new empty filter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Filters by file id.
    pub fn with_file_id(mut self, file_id: impl Into<String>) -> Self {
        self.file_id = Some(file_id.into());
        self
    }

    /// Filters by uploader.
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Filters by file hash.
    pub fn with_file_hash(mut self, hash: impl Into<String>) -> Self {
        self.file_hash = Some(hash.into());
        self
    }

    /// Only records quarantined after the given time.
    pub fn with_quarantined_after(mut self, after: DateTime<Utc>) -> Self {
        self.quarantined_after = Some(after);
        self
    }

    /// Sets pagination.
    pub fn with_pagination(mut self, limit: usize, offset: usize) -> Self {
        self.limit = Some(limit);
        self.offset = Some(offset);
        self
    }

    /// Includes or excludes expired records.
    pub fn with_include_expired(mut self, include: bool) -> Self {
        self.include_expired = include;
        self
    }

    /// Checks if a record matches this filter.
    pub fn matches(&self, record: &QuarantineRecord) -> bool {
        if let Some(ref file_id) = self.file_id {
            if &record.file_id != file_id {
                return false;
            }
        }

        if let Some(ref user_id) = self.user_id {
            if record.user_id.as_ref() != Some(user_id) {
                return false;
            }
        }

        if let Some(ref hash) = self.file_hash {
            if &record.file_hash.blake3 != hash {
                return false;
            }
        }

        if let Some(after) = self.quarantined_after {
            if record.quarantined_at < after {
                return false;
            }
        }

        self.include_expired || !record.is_expired()
    }

    /// Sorts newest first and applies pagination.
    pub(crate) fn apply(&self, mut records: Vec<QuarantineRecord>) -> Vec<QuarantineRecord> {
        records.sort_by(|a, b| b.quarantined_at.cmp(&a.quarantined_at));

        let offset = self.offset.unwrap_or(0);
        let limit = self.limit.unwrap_or(usize::MAX);
        records.into_iter().skip(offset).take(limit).collect()
    }
}
