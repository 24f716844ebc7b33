//! Scan input abstraction.
//!
//! [`FileInput`] names an uploaded file by path or by in-memory bytes,
//! together with the declared filename and content type. The filename is
//! the only thing used for classification; the content type is carried for
//! logging and never trusted.
//!
//! [`PositionGuard`] is the scoped handle used when scanning a caller-owned
//! seekable stream: it records the read position on creation and puts it
//! back when dropped, whatever happened in between.

use std::io::{Seek, SeekFrom};
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};

/// An uploaded file to scan.
///
/// # Examples
///
/// ```rust
/// use modscan::core::FileInput;
///
/// let input = FileInput::from_bytes(b"[settings]\nfov=90".to_vec())
///     .with_filename("config.ini")
///     .with_content_type("text/plain");
/// assert_eq!(input.filename(), Some("config.ini"));
/// assert_eq!(input.extension().as_deref(), Some(".ini"));
/// ```
#[derive(Clone)]
pub enum FileInput {
    /// A file on disk.
    Path {
        /// Location of the file.
        path: PathBuf,
        /// Declared content type.
        content_type: Option<String>,
    },

    /// In-memory bytes.
    Bytes {
        /// The file data.
        data: Vec<u8>,
        /// Declared filename.
        filename: Option<String>,
        /// Declared content type.
        content_type: Option<String>,
    },
}

impl std::fmt::Debug for FileInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Path { path, content_type } => f
                .debug_struct("Path")
                .field("path", path)
                .field("content_type", content_type)
                .finish(),
            Self::Bytes {
                data,
                filename,
                content_type,
            } => f
                .debug_struct("Bytes")
                .field("data_len", &data.len())
                .field("filename", filename)
                .field("content_type", content_type)
                .finish(),
        }
    }
}

impl FileInput {
    /// Creates a `FileInput` from a file path.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self::Path {
            path: path.into(),
            content_type: None,
        }
    }

    /// Creates a `FileInput` from bytes.
    pub fn from_bytes(data: impl Into<Vec<u8>>) -> Self {
        Self::Bytes {
            data: data.into(),
            filename: None,
            content_type: None,
        }
    }

    /// Sets the filename for byte inputs. Paths take their name from the path.
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        if let Self::Bytes { filename: f, .. } = &mut self {
            *f = Some(filename.into());
        }
        self
    }

    /// Sets the declared content type.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        match &mut self {
            Self::Path { content_type: c, .. } | Self::Bytes { content_type: c, .. } => {
                *c = Some(content_type.into())
            }
        }
        self
    }

    /// Returns the filename, if known.
    pub fn filename(&self) -> Option<&str> {
        match self {
            Self::Path { path, .. } => path.file_name().and_then(|n| n.to_str()),
            Self::Bytes { filename, .. } => filename.as_deref(),
        }
    }

    /// Returns the lower-cased extension of the filename, with leading dot.
    pub fn extension(&self) -> Option<String> {
        self.filename().and_then(extension_of)
    }

    /// Returns the declared content type.
    pub fn content_type(&self) -> Option<&str> {
        match self {
            Self::Path { content_type, .. } | Self::Bytes { content_type, .. } => {
                content_type.as_deref()
            }
        }
    }

    /// Returns the size in bytes for in-memory inputs.
    pub fn size_hint(&self) -> Option<u64> {
        match self {
            Self::Path { .. } => None,
            Self::Bytes { data, .. } => Some(data.len() as u64),
        }
    }

    /// Returns the path, if this is a path-based input.
    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Self::Path { path, .. } => Some(path),
            _ => None,
        }
    }

    /// Returns the bytes, if this is a bytes-based input.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes { data, .. } => Some(data),
            _ => None,
        }
    }
}

impl From<PathBuf> for FileInput {
    fn from(path: PathBuf) -> Self {
        Self::from_path(path)
    }
}

impl From<&Path> for FileInput {
    fn from(path: &Path) -> Self {
        Self::from_path(path)
    }
}

/// Returns the lower-cased extension of the last path component, with a
/// leading dot. Names like `.gitignore` have no extension.
pub fn extension_of(name: &str) -> Option<String> {
    let file_name = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let (stem, ext) = file_name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(format!(".{}", ext.to_ascii_lowercase()))
}

/// Restores a stream's read position when dropped.
///
/// Derefs to the wrapped stream so it can be read and seeked freely while
/// the guard is alive.
pub struct PositionGuard<'a, R: Seek> {
    inner: &'a mut R,
    saved: u64,
}

impl<'a, R: Seek> PositionGuard<'a, R> {
    /// Records the current position of `inner`.
    pub fn new(inner: &'a mut R) -> std::io::Result<Self> {
        let saved = inner.stream_position()?;
        Ok(Self { inner, saved })
    }

    /// Returns the position that will be restored.
    pub fn saved_position(&self) -> u64 {
        self.saved
    }
}

impl<R: Seek> Deref for PositionGuard<'_, R> {
    type Target = R;

    fn deref(&self) -> &R {
        self.inner
    }
}

impl<R: Seek> DerefMut for PositionGuard<'_, R> {
    fn deref_mut(&mut self) -> &mut R {
        self.inner
    }
}

impl<R: Seek> Drop for PositionGuard<'_, R> {
    fn drop(&mut self) {
        if let Err(e) = self.inner.seek(SeekFrom::Start(self.saved)) {
            tracing::warn!(
                position = self.saved,
                error = %e,
                "Failed to restore stream position"
            );
        }
    }
}
