//! Submit error types.

use policy::ResourceType;
use thiserror::Error;

/// Submit errors.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Soft-delete configuration is missing or invalid.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A remove targeted a resource type without the soft-delete flag field.
    #[error("resource type '{resource_type}' has no soft-delete field '{field}'")]
    MissingSoftDeleteField {
        resource_type: ResourceType,
        field: String,
    },

    /// The submit was cancelled before commit started.
    #[error("submit cancelled")]
    Cancelled,

    /// Commit failed in the persistence layer.
    #[error(transparent)]
    Persistence(#[from] storage::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
