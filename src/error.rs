//! Structured error types for schema parsing, path resolution, and overlays.

use std::path::PathBuf;
use thiserror::Error;

use crate::value::{Value, ValueKind};

/// Errors raised by tree construction, dotted-path access, and the
/// file/CLI adapters.
///
/// All errors are synchronous and surfaced at the point of violation;
/// nothing in the crate retries or swallows them.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A key or path segment does not match `[A-Za-z_][A-Za-z0-9_]*`,
    /// collides with a reserved name, or the schema mapping is empty.
    #[error("invalid config key `{key}`: {reason}")]
    InvalidKey { key: String, reason: String },

    /// Resolution reached a level where a segment is absent.
    #[error("config key not found: `{path}`")]
    KeyNotFound { path: String },

    /// A `set` supplied a value whose kind does not match the node's,
    /// outside the documented int-into-float widening.
    #[error("type mismatch at `{path}`: node is {expected}, got {actual}")]
    TypeMismatch {
        path: String,
        expected: ValueKind,
        actual: ValueKind,
    },

    /// A value was type-correct but rejected by the node's validator.
    #[error("validation failed at `{path}` for value {value}")]
    ValidationFailed { path: String, value: Value },

    /// Assigning to a path that resolves to a subtree, or descending
    /// through a path segment that resolves to a leaf.
    #[error("invalid target at `{path}`: {reason}")]
    InvalidTarget { path: String, reason: String },

    /// File overlay/dump I/O failure.
    #[error("config file I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed content in a config file.
    #[error("failed to parse config file `{path}`: {detail}")]
    Parse { path: PathBuf, detail: String },

    /// File extension not in the recognized JSON/YAML families.
    #[error("unrecognized config file extension: `{path}`")]
    UnsupportedFormat { path: PathBuf },

    /// Command-line parse failure (includes unknown flags).
    #[error(transparent)]
    Cli(#[from] clap::Error),
}

impl ConfigError {
    // Convenience constructors

    pub fn invalid_key(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidKey {
            key: key.into(),
            reason: reason.into(),
        }
    }

    pub fn key_not_found(path: impl Into<String>) -> Self {
        Self::KeyNotFound { path: path.into() }
    }

    pub fn type_mismatch(path: impl Into<String>, expected: ValueKind, actual: ValueKind) -> Self {
        Self::TypeMismatch {
            path: path.into(),
            expected,
            actual,
        }
    }

    pub fn validation_failed(path: impl Into<String>, value: Value) -> Self {
        Self::ValidationFailed {
            path: path.into(),
            value,
        }
    }

    pub fn invalid_target(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidTarget {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn parse(path: impl Into<PathBuf>, detail: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            detail: detail.into(),
        }
    }
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;
