//! Actions taken on a file once its scan is terminal.

use serde::{Deserialize, Serialize};

/// What happens to an uploaded file after scanning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PolicyAction {
    /// Make the file available for download.
    Publish,

    /// Withhold the file pending reviewer action.
    Quarantine {
        /// Reason for quarantine.
        reason: String,
    },
}

impl PolicyAction {
    /// Creates a Publish action.
    pub fn publish() -> Self {
        Self::Publish
    }

    /// Creates a Quarantine action.
    pub fn quarantine(reason: impl Into<String>) -> Self {
        Self::Quarantine {
            reason: reason.into(),
        }
    }

    /// Returns true if this action publishes the file.
    pub fn is_publish(&self) -> bool {
        matches!(self, Self::Publish)
    }

    /// Returns true if this action quarantines the file.
    pub fn is_quarantine(&self) -> bool {
        matches!(self, Self::Quarantine { .. })
    }

    /// Returns the quarantine reason, if any.
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Publish => None,
            Self::Quarantine { reason } => Some(reason),
        }
    }
}
