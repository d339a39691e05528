//! Configuration file
//!
//! ```json
//! {
//!   "data_dir": "/var/lib/corefstore",
//!   "journal_sync_mode": "fsync",
//!   "max_document_tokens": 1000000,
//!   "log_level": "info"
//! }
//! ```
//!
//! Only `data_dir` is required. The file is validated as a whole on load;
//! an invalid value refuses the load rather than falling back to a default.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::observability::Severity;
use crate::storage::SyncMode;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Data directory (required); the journal lives under it
    pub data_dir: PathBuf,

    /// "fsync" (default) or "none"
    #[serde(default = "default_journal_sync_mode")]
    pub journal_sync_mode: String,

    /// Upper bound on tokens in one imported document
    #[serde(default = "default_max_document_tokens")]
    pub max_document_tokens: u64,

    /// Minimum log severity
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_journal_sync_mode() -> String {
    "fsync".to_string()
}
fn default_max_document_tokens() -> u64 {
    1_000_000
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Defaults for everything but the data directory
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            journal_sync_mode: default_journal_sync_mode(),
            max_document_tokens: default_max_document_tokens(),
            log_level: default_log_level(),
        }
    }

    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> ConfigResult<Self> {
        let config: Config = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("data_dir must not be empty".into()));
        }

        if SyncMode::parse(&self.journal_sync_mode).is_none() {
            return Err(ConfigError::Invalid(format!(
                "journal_sync_mode '{}' must be 'fsync' or 'none'",
                self.journal_sync_mode
            )));
        }

        if self.max_document_tokens == 0 {
            return Err(ConfigError::Invalid("max_document_tokens must be > 0".into()));
        }
        if self.max_document_tokens > u64::from(u32::MAX) {
            return Err(ConfigError::Invalid(format!(
                "max_document_tokens must be <= {}",
                u32::MAX
            )));
        }

        if Severity::parse(&self.log_level).is_none() {
            return Err(ConfigError::Invalid(format!(
                "log_level '{}' must be one of trace, info, warn, error, fatal",
                self.log_level
            )));
        }

        Ok(())
    }

    pub fn data_path(&self) -> &Path {
        &self.data_dir
    }

    pub fn sync_mode(&self) -> SyncMode {
        SyncMode::parse(&self.journal_sync_mode).unwrap_or(SyncMode::Fsync)
    }

    pub fn max_document_tokens(&self) -> usize {
        usize::try_from(self.max_document_tokens).unwrap_or(usize::MAX)
    }

    pub fn log_severity(&self) -> Severity {
        Severity::parse(&self.log_level).unwrap_or(Severity::Info)
    }
}
