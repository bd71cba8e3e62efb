//! Error types for loading, decoding and writing configuration.

use crate::format::ConfigFormat;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Errors surfaced by [`crate::Store`] and its collaborators.
///
/// Cloneable so the global registry can hand the first `init` result back
/// to every later caller.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// No config file matched the search paths. Not fatal at construction.
    #[error("config file \"{name}\" not found in {searched:?}")]
    NotFound { name: String, searched: Vec<PathBuf> },

    #[error("failed to parse {format} config {}: {message}", .path.display())]
    Parse {
        path: PathBuf,
        format: ConfigFormat,
        message: String,
    },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: Arc<std::io::Error>,
    },

    #[error("unsupported config format: {0}")]
    UnsupportedFormat(String),

    #[error("failed to decode configuration: {0}")]
    Decode(#[from] DecodeError),

    #[error("failed to write config {}: {message}", .path.display())]
    Write { path: PathBuf, message: String },

    /// Returned by the "safe" write variants.
    #[error("config file already exists: {}", .0.display())]
    AlreadyExists(PathBuf),

    #[error("failed to watch {}: {message}", .path.display())]
    Watch { path: PathBuf, message: String },
}

impl ConfigError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ConfigError::NotFound { .. })
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::Io {
            path: path.into(),
            source: Arc::new(source),
        }
    }

    pub(crate) fn write(path: impl Into<PathBuf>, message: impl fmt::Display) -> Self {
        ConfigError::Write {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

/// Structural mismatch while decoding a snapshot into a typed record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct DecodeError(String);

impl DecodeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl serde::de::Error for DecodeError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Self(msg.to_string())
    }
}

/// Strict conversion failure between value kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot convert {from} value to {to}")]
pub struct CoerceError {
    pub from: &'static str,
    pub to: &'static str,
}

impl CoerceError {
    pub fn new(from: &'static str, to: &'static str) -> Self {
        Self { from, to }
    }
}

/// Result type for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
