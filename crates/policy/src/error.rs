//! Policy error types.

use crate::ResourceType;
use thiserror::Error;

/// Policy errors.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// An entry for this resource type is already registered.
    #[error("duplicate authorization entry for resource type '{0}'")]
    DuplicateRegistration(ResourceType),

    /// No entry was registered for this resource type.
    #[error("no authorization entry for resource type '{0}'")]
    NotFound(ResourceType),
}

pub type Result<T> = std::result::Result<T, Error>;
