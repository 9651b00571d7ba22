//! Editor configuration.
//!
//! # Responsibility
//! - Hold tunables shared by sessions, the FFI layer and the CLI.
//! - Load them from JSON with per-field defaults.
//!
//! # Invariants
//! - `min_break_seconds <= default_break_seconds <= max_break_seconds`.
//! - `storage_key` is never blank.
//! - `default_markup` always parses.

use crate::codec::deserialize;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Storage key the editor content is persisted under.
pub const DEFAULT_STORAGE_KEY: &str = "content";
/// Markup loaded when nothing is persisted yet.
pub const DEFAULT_MARKUP: &str = "<p></p>";

/// Session tunables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub storage_key: String,
    pub default_markup: String,
    pub min_break_seconds: u32,
    pub max_break_seconds: u32,
    pub default_break_seconds: u32,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            default_markup: DEFAULT_MARKUP.to_string(),
            min_break_seconds: 1,
            max_break_seconds: 10,
            default_break_seconds: 1,
        }
    }
}

/// Configuration load/validation errors.
#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse(serde_json::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config JSON: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

impl EditorConfig {
    /// Parses and validates a JSON config; missing fields take defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: EditorConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage_key.trim().is_empty() {
            return Err(ConfigError::Invalid("storage_key must not be blank".to_string()));
        }
        if self.min_break_seconds > self.max_break_seconds {
            return Err(ConfigError::Invalid(format!(
                "min_break_seconds ({}) must be <= max_break_seconds ({})",
                self.min_break_seconds, self.max_break_seconds
            )));
        }
        if !self.break_range_contains(self.default_break_seconds) {
            return Err(ConfigError::Invalid(format!(
                "default_break_seconds ({}) must be within {}..={}",
                self.default_break_seconds, self.min_break_seconds, self.max_break_seconds
            )));
        }
        deserialize(&self.default_markup).map_err(|err| {
            ConfigError::Invalid(format!("default_markup does not parse: {err}"))
        })?;
        Ok(())
    }

    pub fn break_range_contains(&self, seconds: u32) -> bool {
        (self.min_break_seconds..=self.max_break_seconds).contains(&seconds)
    }
}
