//! Core error taxonomy
//!
//! Every operation on the text index or the annotation store reports one of
//! three failures:
//!
//! - `Validation`: malformed input (negative or inverted span, empty
//!   sentence, offsets out of order, span outside the document)
//! - `NotFound`: referenced document/cluster/mention does not exist. "Never
//!   existed" and "already deleted" are not distinguished.
//! - `Consistency`: a multi-row operation could not complete atomically. The
//!   transaction has been rolled back before this is returned.
//!
//! Nothing is retried internally.

use thiserror::Error;

use crate::storage::StorageError;

/// Core module result type
pub type CoreResult<T> = Result<T, CoreError>;

/// Core error type
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Malformed input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Referenced entity does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Operation could not complete atomically and was rolled back
    #[error("Consistency error: {0}")]
    Consistency(String),
}

impl CoreError {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a not found error
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound(resource.into())
    }

    /// Create a consistency error
    pub fn consistency(msg: impl Into<String>) -> Self {
        Self::Consistency(msg.into())
    }

    /// Get error code for callers and CLI output
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "COREF_VALIDATION_ERROR",
            Self::NotFound(_) => "COREF_NOT_FOUND",
            Self::Consistency(_) => "COREF_CONSISTENCY_ERROR",
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_consistency(&self) -> bool {
        matches!(self, Self::Consistency(_))
    }
}

impl From<StorageError> for CoreError {
    fn from(e: StorageError) -> Self {
        Self::Consistency(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(CoreError::validation("x").code(), "COREF_VALIDATION_ERROR");
        assert_eq!(CoreError::not_found("x").code(), "COREF_NOT_FOUND");
        assert_eq!(CoreError::consistency("x").code(), "COREF_CONSISTENCY_ERROR");
    }

    #[test]
    fn test_storage_error_becomes_consistency() {
        let err: CoreError = StorageError::corruption("bad checksum").into();
        assert!(err.is_consistency());
        assert!(err.to_string().contains("COREF_JOURNAL_CORRUPTION"));
    }

    #[test]
    fn test_display() {
        let err = CoreError::not_found("cluster 42");
        assert_eq!(err.to_string(), "Not found: cluster 42");
    }
}
