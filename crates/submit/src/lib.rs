//! Soft-delete submit pipeline.
//!
//! A [`SubmitInterceptor`] sits between a request and its persistence
//! session. For every change-set it:
//!
//! 1. lets callers in the configured admin role through untouched, so their
//!    removes are real deletes;
//! 2. otherwise turns each remove into an update that sets the configured
//!    flag field to `true`;
//! 3. commits the change-set exactly once.
//!
//! The flag field is found through [`EntityFields`], an explicit list of the
//! boolean fields each resource type exposes.
//!
//! # Example
//!
//! ```ignore
//! use storage::{ChangeSet, PendingModification, SqliteSession};
//! use submit::{Caller, EntityFields, SoftDeleteConfig, SubmitInterceptor};
//! use tokio_util::sync::CancellationToken;
//!
//! let config = SoftDeleteConfig::new("deleted")?.with_admin_role("admin");
//! let fields = EntityFields::new().declare::<Note>("deleted", |n| &mut n.deleted);
//! let interceptor = SubmitInterceptor::new(config, fields)?;
//!
//! let session = SqliteSession::open("records.db")?;
//! let changes = ChangeSet::new().with(PendingModification::remove(note));
//! let result = interceptor
//!     .execute(&session, &Caller::new("ada"), changes, &CancellationToken::new())
//!     .await?;
//! assert_eq!(result.soft_deleted, 1);
//! ```

mod caller;
mod config;
mod error;
mod fields;
mod interceptor;

pub use caller::{Caller, RoleOracle};
pub use config::{MissingFlag, SoftDeleteConfig};
pub use error::{Error, Result};
pub use fields::{BoolField, EntityFields};
pub use interceptor::{SubmitInterceptor, SubmitResult};
