//! Uploaded file records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Lifecycle status of an uploaded file.
///
/// `Pending -> Scanning -> Clean | Infected | Failed`, then `Processed` for
/// published files or `Quarantined` for withheld ones. A reviewer restore
/// moves `Quarantined` to `Processed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileStatus {
    /// Stored, waiting for a scan slot.
    Pending,
    /// A worker is scanning the file.
    Scanning,
    /// The scan found nothing.
    Clean,
    /// The scan found threats.
    Infected,
    /// Withheld pending reviewer action.
    Quarantined,
    /// Processing gave up.
    Failed,
    /// Published.
    Processed,
}

impl FileStatus {
    /// Returns `true` once no worker will touch the file again.
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Quarantined | Self::Failed | Self::Processed)
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Scanning => "scanning",
            Self::Clean => "clean",
            Self::Infected => "infected",
            Self::Quarantined => "quarantined",
            Self::Failed => "failed",
            Self::Processed => "processed",
        };
        f.write_str(name)
    }
}

/// An upload handed to the processing queue.
///
/// The bytes themselves live in blob storage under `storage_key`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadedFile {
    /// Unique file identifier.
    pub file_id: String,

    /// Mod the file belongs to, if any.
    pub mod_id: Option<String>,

    /// Uploader's user id.
    pub user_id: String,

    /// Uploader's display name.
    pub username: String,

    /// Declared filename.
    pub filename: String,

    /// Declared content type.
    pub content_type: Option<String>,

    /// Size in bytes.
    pub size: u64,

    /// Blob storage key.
    pub storage_key: String,
}

impl UploadedFile {
    /// Creates a descriptor with a fresh file id; the storage key defaults
    /// to the file id.
    pub fn new(
        user_id: impl Into<String>,
        username: impl Into<String>,
        filename: impl Into<String>,
        size: u64,
    ) -> Self {
        let file_id = Uuid::new_v4().to_string();
        Self {
            storage_key: file_id.clone(),
            file_id,
            mod_id: None,
            user_id: user_id.into(),
            username: username.into(),
            filename: filename.into(),
            content_type: None,
            size,
        }
    }

    /// Sets the file id.
    ///
    /// A storage key still defaulted to the old file id follows the new
    /// one; a key set with [`with_storage_key`](Self::with_storage_key) is
    /// kept.
    pub fn with_file_id(mut self, file_id: impl Into<String>) -> Self {
        let file_id = file_id.into();
        if self.storage_key == self.file_id {
            self.storage_key = file_id.clone();
        }
        self.file_id = file_id;
        self
    }

    /// Sets the owning mod.
    pub fn with_mod_id(mut self, mod_id: impl Into<String>) -> Self {
        self.mod_id = Some(mod_id.into());
        self
    }

    /// Sets the content type.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Sets the blob storage key.
    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }
}

/// The repository's view of an uploaded file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    /// The upload descriptor.
    pub file: UploadedFile,

    /// Current status.
    pub status: FileStatus,

    /// Set by a reviewer; approved clean files skip re-scanning.
    pub approved: bool,

    /// When the record was created.
    pub uploaded_at: DateTime<Utc>,

    /// When the record last changed.
    pub updated_at: DateTime<Utc>,
}

impl FileRecord {
    /// Creates a `Pending`, unapproved record.
    pub fn new(file: UploadedFile) -> Self {
        let now = Utc::now();
        Self {
            file,
            status: FileStatus::Pending,
            approved: false,
            uploaded_at: now,
            updated_at: now,
        }
    }

    /// Returns the file id.
    pub fn file_id(&self) -> &str {
        &self.file.file_id
    }
}
