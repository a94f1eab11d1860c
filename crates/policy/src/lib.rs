//! Per-resource authorization policy.
//!
//! Core principle: **an action is denied unless a predicate allows it.**
//!
//! An [`AuthorizationRegistry`] maps each [`ResourceType`] to an
//! [`AuthorizationEntry`] holding optional insert, update and delete
//! predicates. The registry only reports decisions; enforcing them is up to
//! the caller.
//!
//! # Example
//!
//! ```
//! use policy::{AuthorizationEntry, AuthorizationRegistry};
//!
//! let mut registry = AuthorizationRegistry::new();
//! registry.register([
//!     AuthorizationEntry::new("read_only"),
//!     AuthorizationEntry::new("cant_update").allow_insert(|| true),
//! ])?;
//!
//! assert!(registry.can_insert(&"cant_update".into()));
//! assert!(!registry.can_update(&"cant_update".into()));
//! assert!(!registry.can_delete(&"read_only".into()));
//! # Ok::<(), policy::Error>(())
//! ```

mod entry;
mod error;
mod registry;
mod resource;

pub use entry::{AuthorizationEntry, Predicate};
pub use error::{Error, Result};
pub use registry::{AuthorizationRegistry, Decision};
pub use resource::{Action, Resource, ResourceType};
