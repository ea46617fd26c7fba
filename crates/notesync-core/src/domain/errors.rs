//! Domain error types
//!
//! This module defines error types specific to domain operations
//! (validation failures, catalog rule violations) and the error type
//! shared by every remote source adapter.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid hash format (expected lowercase hex SHA-256)
    #[error("Invalid hash format: {0}")]
    InvalidHash(String),

    /// ID parsing error
    #[error("Invalid ID format: {0}")]
    InvalidId(String),

    /// Source URL rejected by normalization
    #[error("{0}")]
    InvalidUrl(String),

    /// Generic validation failure
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    /// No target with the given id or id prefix
    #[error("Target not found: {0}")]
    TargetNotFound(String),

    /// An id prefix matched more than one target
    #[error("Ambiguous target id prefix: {0}")]
    AmbiguousId(String),

    /// A group still has children and cannot be removed
    #[error("Folder is not empty. Move or delete children first")]
    GroupNotEmpty,

    /// A target would become its own ancestor
    #[error("Cannot move {0} under itself or one of its descendants")]
    InvalidParent(String),
}

/// Errors reported by remote source adapters
///
/// `Cancelled` is a clean stop requested by the user and must never be
/// reported as a failure. Every other variant is a download failure whose
/// `Display` text ends up in the target's `"Error: ..."` status.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Any provider, protocol, or network failure
    #[error("{0}")]
    Download(String),

    /// The server answered with a status outside 2xx
    #[error("HTTP error {0}")]
    HttpStatus(u16),

    /// The cancellation token fired
    #[error("Cancelled")]
    Cancelled,

    /// Local staging failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FetchError {
    /// Shorthand for a [`FetchError::Download`] with the given message
    pub fn download(message: impl Into<String>) -> Self {
        Self::Download(message.into())
    }

    /// Returns true for a user-requested stop
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DomainError::InvalidHash("xyz".to_string());
        assert_eq!(err.to_string(), "Invalid hash format: xyz");

        let err = DomainError::GroupNotEmpty;
        assert_eq!(
            err.to_string(),
            "Folder is not empty. Move or delete children first"
        );
    }

    #[test]
    fn test_fetch_error_display() {
        assert_eq!(FetchError::HttpStatus(404).to_string(), "HTTP error 404");
        assert_eq!(
            FetchError::download("Invalid URL").to_string(),
            "Invalid URL"
        );
        assert_eq!(FetchError::Cancelled.to_string(), "Cancelled");
    }

    #[test]
    fn test_is_cancelled() {
        assert!(FetchError::Cancelled.is_cancelled());
        assert!(!FetchError::HttpStatus(500).is_cancelled());
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk");
        assert!(!FetchError::from(io).is_cancelled());
    }
}
