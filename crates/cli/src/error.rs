//! CLI error types.

use std::path::PathBuf;
use thiserror::Error;

use crate::config::ConfigError;

/// CLI errors.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The database file does not exist.
    ///
    /// This typically means nothing has been submitted yet.
    #[error("database not found at {path}. Run 'tombstone submit' first")]
    DatabaseNotFound { path: PathBuf },

    /// The resource type is not listed in the configuration.
    #[error("resource type '{0}' is not configured")]
    UnknownResource(String),

    /// The caller may not perform a requested change.
    #[error("denied: {reason}")]
    Denied { reason: String },

    /// The changes file could not be parsed.
    #[error("invalid changes file: {0}")]
    Changes(#[from] serde_json::Error),

    /// Configuration is invalid or missing required fields.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// An error occurred in the submit pipeline.
    #[error(transparent)]
    Submit(#[from] submit::Error),

    /// An error occurred in the storage layer.
    #[error(transparent)]
    Storage(#[from] storage::Error),

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
