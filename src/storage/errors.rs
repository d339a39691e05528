//! Storage error types
//!
//! Error codes:
//! - COREF_JOURNAL_APPEND_FAILED (ERROR)
//! - COREF_JOURNAL_FSYNC_FAILED (FATAL)
//! - COREF_JOURNAL_CORRUPTION (FATAL)
//! - COREF_CONSTRAINT_VIOLATION (ERROR)
//! - COREF_LOCK_POISONED (FATAL)

use std::fmt;
use std::io;

/// Severity levels for storage errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Operation fails, process continues
    Error,
    /// Storage can no longer be trusted
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Storage-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageErrorCode {
    /// Journal write failed
    JournalAppendFailed,
    /// Journal fsync failed
    JournalFsyncFailed,
    /// Journal checksum or framing failure
    JournalCorruption,
    /// A mutation violated a table constraint
    ConstraintViolation,
    /// A thread panicked while holding the table lock
    LockPoisoned,
}

impl StorageErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            StorageErrorCode::JournalAppendFailed => "COREF_JOURNAL_APPEND_FAILED",
            StorageErrorCode::JournalFsyncFailed => "COREF_JOURNAL_FSYNC_FAILED",
            StorageErrorCode::JournalCorruption => "COREF_JOURNAL_CORRUPTION",
            StorageErrorCode::ConstraintViolation => "COREF_CONSTRAINT_VIOLATION",
            StorageErrorCode::LockPoisoned => "COREF_LOCK_POISONED",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            StorageErrorCode::JournalAppendFailed => Severity::Error,
            StorageErrorCode::JournalFsyncFailed => Severity::Fatal,
            StorageErrorCode::JournalCorruption => Severity::Fatal,
            StorageErrorCode::ConstraintViolation => Severity::Error,
            StorageErrorCode::LockPoisoned => Severity::Fatal,
        }
    }
}

impl fmt::Display for StorageErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Storage error with code, message and optional context
#[derive(Debug)]
pub struct StorageError {
    code: StorageErrorCode,
    message: String,
    details: Option<String>,
    source: Option<io::Error>,
}

impl StorageError {
    fn new(code: StorageErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
            source: None,
        }
    }

    /// Journal write failed
    pub fn append_failed(message: impl Into<String>, source: io::Error) -> Self {
        Self {
            source: Some(source),
            ..Self::new(StorageErrorCode::JournalAppendFailed, message)
        }
    }

    /// Journal fsync failed
    pub fn fsync_failed(message: impl Into<String>, source: io::Error) -> Self {
        Self {
            source: Some(source),
            ..Self::new(StorageErrorCode::JournalFsyncFailed, message)
        }
    }

    /// Journal is corrupt
    pub fn corruption(message: impl Into<String>) -> Self {
        Self::new(StorageErrorCode::JournalCorruption, message)
    }

    /// Journal is corrupt at a given byte offset
    pub fn corruption_at_offset(offset: u64, reason: impl Into<String>) -> Self {
        Self {
            details: Some(format!("byte_offset: {}", offset)),
            ..Self::corruption(reason)
        }
    }

    /// Journal is corrupt at a given record
    pub fn corruption_at_sequence(sequence: u64, reason: impl Into<String>) -> Self {
        Self {
            details: Some(format!("sequence_number: {}", sequence)),
            ..Self::corruption(reason)
        }
    }

    /// A table constraint rejected a mutation
    pub fn constraint_violation(message: impl Into<String>) -> Self {
        Self::new(StorageErrorCode::ConstraintViolation, message)
    }

    /// The table lock is poisoned
    pub fn lock_poisoned() -> Self {
        Self::new(
            StorageErrorCode::LockPoisoned,
            "table lock poisoned by a panicked writer",
        )
    }

    /// Returns the error code
    pub fn code(&self) -> StorageErrorCode {
        self.code
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns additional error details
    pub fn details(&self) -> Option<&str> {
        self.details.as_deref()
    }

    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.code.severity(),
            self.code.code(),
            self.message
        )?;
        if let Some(ref details) = self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(StorageErrorCode::JournalAppendFailed.code(), "COREF_JOURNAL_APPEND_FAILED");
        assert_eq!(StorageErrorCode::JournalFsyncFailed.code(), "COREF_JOURNAL_FSYNC_FAILED");
        assert_eq!(StorageErrorCode::JournalCorruption.code(), "COREF_JOURNAL_CORRUPTION");
        assert_eq!(StorageErrorCode::ConstraintViolation.code(), "COREF_CONSTRAINT_VIOLATION");
    }

    #[test]
    fn test_fsync_failed_is_fatal() {
        let err = StorageError::fsync_failed(
            "fsync failed",
            io::Error::new(io::ErrorKind::Other, "disk error"),
        );
        assert!(err.is_fatal());
    }

    #[test]
    fn test_constraint_violation_is_not_fatal() {
        assert!(!StorageError::constraint_violation("duplicate key").is_fatal());
    }

    #[test]
    fn test_display_includes_details() {
        let err = StorageError::corruption_at_sequence(7, "checksum mismatch");
        let display = err.to_string();
        assert!(display.contains("COREF_JOURNAL_CORRUPTION"));
        assert!(display.contains("FATAL"));
        assert!(display.contains("sequence_number: 7"));
    }
}
