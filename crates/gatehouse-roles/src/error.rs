//! Error types for role resolution
//!
//! Directory backends report failures as [`DirectoryError`]; the resolver
//! surfaces them as [`RoleError`] so callers can tell "no roles" apart from
//! "could not determine roles".

use thiserror::Error;

use crate::config::ConfigError;

/// Failures reported by a directory backend.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// Could not reach the directory
    #[error("Directory connection error: {0}")]
    Connection(String),

    /// The directory did not answer in time
    #[error("Directory request timed out: {0}")]
    Timeout(String),

    /// The directory rejected or could not parse the request
    #[error("Directory protocol error: {0}")]
    Protocol(String),

    /// Any other backend failure
    #[error("Directory error: {0}")]
    Other(String),
}

/// Result type for directory backend operations.
pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// Role resolution error types.
#[derive(Debug, Error)]
pub enum RoleError {
    /// The directory backend failed
    #[error(transparent)]
    Directory(#[from] DirectoryError),

    /// The resolver was built from an invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),
}

/// Result type for role resolution operations.
pub type RoleResult<T> = Result<T, RoleError>;

impl RoleError {
    /// Check if retrying the same call may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            RoleError::Directory(DirectoryError::Connection(_) | DirectoryError::Timeout(_))
        )
    }

    /// Get error code for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            RoleError::Directory(DirectoryError::Connection(_)) => "DIRECTORY_UNAVAILABLE",
            RoleError::Directory(DirectoryError::Timeout(_)) => "DIRECTORY_TIMEOUT",
            RoleError::Directory(DirectoryError::Protocol(_)) => "DIRECTORY_PROTOCOL_ERROR",
            RoleError::Directory(DirectoryError::Other(_)) => "DIRECTORY_ERROR",
            RoleError::InvalidConfig(_) => "CONFIG_ERROR",
        }
    }
}
