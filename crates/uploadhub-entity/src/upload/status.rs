//! Upload session status enumeration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle state of an upload session.
///
/// `Active` is the only non-terminal state. The three terminal states are
/// absorbing: nothing moves a session out of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "upload_session_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    /// Accepting chunks.
    Active,
    /// Assembled and handed to the blob store.
    Completed,
    /// Abandoned by the client.
    Cancelled,
    /// Reclaimed after its deadline passed.
    Expired,
}

impl UploadStatus {
    /// Whether no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Active)
    }

    /// Return the status as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Expired => "expired",
        }
    }
}

impl fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for UploadStatus {
    type Err = uploadhub_core::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            "expired" => Ok(Self::Expired),
            _ => Err(uploadhub_core::AppError::validation(format!(
                "Invalid upload status: '{s}'. Expected one of: active, completed, cancelled, expired"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_active_is_open() {
        assert!(!UploadStatus::Active.is_terminal());
        assert!(UploadStatus::Completed.is_terminal());
        assert!(UploadStatus::Cancelled.is_terminal());
        assert!(UploadStatus::Expired.is_terminal());
    }

    #[test]
    fn test_from_str_case_insensitive() {
        assert_eq!("EXPIRED".parse::<UploadStatus>().unwrap(), UploadStatus::Expired);
        assert!("assembling".parse::<UploadStatus>().is_err());
    }
}
