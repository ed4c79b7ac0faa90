//! Error types for the override engine
//!
//! Installation itself never fails (see [`crate::installer`]); these errors
//! describe why a single override entry was skipped, and are returned by the
//! few parsing helpers that sit outside the install path.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, VeilError>;

/// Error codes for programmatic handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Profile errors (1xx)
    InvalidProfile = 100,
    UnknownTimeZone = 101,

    // Surface errors (2xx)
    SurfaceUnavailable = 200,
    AlreadyWrapped = 201,
    Binding = 202,

    // Encoding errors (3xx)
    Serialization = 300,

    // Internal errors (9xx)
    Internal = 900,
}

/// Main error type for the override engine
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VeilError {
    #[error("Invalid profile: {0}")]
    InvalidProfile(String),

    #[error("Unknown time zone: {0}")]
    UnknownTimeZone(String),

    #[error("Surface unavailable: {0}")]
    SurfaceUnavailable(String),

    #[error("Already wrapped: {0}")]
    AlreadyWrapped(String),

    #[error("Binding failed: {0}")]
    Binding(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl VeilError {
    /// Get the error code for programmatic handling
    pub fn code(&self) -> ErrorCode {
        match self {
            VeilError::InvalidProfile(_) => ErrorCode::InvalidProfile,
            VeilError::UnknownTimeZone(_) => ErrorCode::UnknownTimeZone,
            VeilError::SurfaceUnavailable(_) => ErrorCode::SurfaceUnavailable,
            VeilError::AlreadyWrapped(_) => ErrorCode::AlreadyWrapped,
            VeilError::Binding(_) => ErrorCode::Binding,
            VeilError::Serialization(_) => ErrorCode::Serialization,
            VeilError::Internal(_) => ErrorCode::Internal,
        }
    }

    /// Whether the surface is simply left native rather than broken.
    ///
    /// A missing surface or an existing wrapper is the normal outcome on
    /// browsers that lack an API or on a repeated install.
    pub fn is_benign(&self) -> bool {
        matches!(
            self,
            VeilError::SurfaceUnavailable(_) | VeilError::AlreadyWrapped(_)
        )
    }
}

impl From<serde_json::Error> for VeilError {
    fn from(err: serde_json::Error) -> Self {
        VeilError::Serialization(err.to_string())
    }
}

/// Error information for host consumption
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: u32,
    pub message: String,
    pub benign: bool,
}

impl From<&VeilError> for ErrorInfo {
    fn from(err: &VeilError) -> Self {
        ErrorInfo {
            code: err.code() as u32,
            message: err.to_string(),
            benign: err.is_benign(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            VeilError::UnknownTimeZone("Mars/Olympus".into()).code(),
            ErrorCode::UnknownTimeZone
        );
        assert_eq!(
            VeilError::AlreadyWrapped("getContext".into()).code(),
            ErrorCode::AlreadyWrapped
        );
    }

    #[test]
    fn test_benign_errors() {
        assert!(VeilError::SurfaceUnavailable("getBattery".into()).is_benign());
        assert!(VeilError::AlreadyWrapped("toDataURL".into()).is_benign());
        assert!(!VeilError::Binding("defineProperty".into()).is_benign());
    }

    #[test]
    fn test_error_info() {
        let err = VeilError::InvalidProfile("bad json".into());
        let info = ErrorInfo::from(&err);
        assert_eq!(info.code, 100);
        assert_eq!(info.message, "Invalid profile: bad json");
        assert!(!info.benign);
    }
}
