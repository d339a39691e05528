//! CLI error types
//!
//! Core failures keep their own code so scripted callers can tell a
//! rejected span from a missing cluster.

use std::fmt;
use std::io;

use crate::config::ConfigError;
use crate::errors::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Configuration file error
    ConfigError,
    /// I/O error (input file, stdout)
    IoError,
    /// Data directory already initialized
    AlreadyInitialized,
    /// Data directory not initialized
    NotInitialized,
    /// Journal replay failed
    BootFailed,
    Validation,
    NotFound,
    Consistency,
}

impl CliErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "COREF_CLI_CONFIG_ERROR",
            Self::IoError => "COREF_CLI_IO_ERROR",
            Self::AlreadyInitialized => "COREF_CLI_ALREADY_INITIALIZED",
            Self::NotInitialized => "COREF_CLI_NOT_INITIALIZED",
            Self::BootFailed => "COREF_CLI_BOOT_FAILED",
            Self::Validation => "COREF_VALIDATION_ERROR",
            Self::NotFound => "COREF_NOT_FOUND",
            Self::Consistency => "COREF_CONSISTENCY_ERROR",
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    pub fn already_initialized() -> Self {
        Self::new(
            CliErrorCode::AlreadyInitialized,
            "Data directory already initialized",
        )
    }

    pub fn not_initialized() -> Self {
        Self::new(
            CliErrorCode::NotInitialized,
            "Data directory not initialized. Run 'corefstore init' first.",
        )
    }

    pub fn boot_failed(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::BootFailed, msg)
    }

    pub fn code(&self) -> CliErrorCode {
        self.code
    }

    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::io_error(format!("JSON error: {}", e))
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        Self::config_error(e.to_string())
    }
}

impl From<CoreError> for CliError {
    fn from(e: CoreError) -> Self {
        let code = match e {
            CoreError::Validation(_) => CliErrorCode::Validation,
            CoreError::NotFound(_) => CliErrorCode::NotFound,
            CoreError::Consistency(_) => CliErrorCode::Consistency,
        };
        Self::new(code, e.to_string())
    }
}

pub type CliResult<T> = Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_error_keeps_code() {
        let err: CliError = CoreError::not_found("cluster x").into();
        assert_eq!(err.code(), CliErrorCode::NotFound);
        assert_eq!(err.code_str(), CoreError::not_found("").code());
    }

    #[test]
    fn test_display() {
        let err = CliError::not_initialized();
        assert!(err.to_string().starts_with("COREF_CLI_NOT_INITIALIZED"));
    }
}
