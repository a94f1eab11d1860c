//! Change-set model and SQLite persistence for Tombstone.
//!
//! This crate is the persistence side of the submit pipeline: it defines what
//! a pending write looks like and how a batch of them is committed.
//!
//! # Core Concepts
//!
//! ## Entity
//!
//! An [`Entity`] is any instance that can be written. Rust types opt in by
//! implementing [`Record`] (which also requires [`policy::Resource`]); data
//! whose shape is only known at runtime uses [`Document`].
//!
//! ## ChangeSet
//!
//! A [`ChangeSet`] is the ordered batch of [`PendingModification`]s submitted
//! in one request. Each modification keeps the [`ModificationAction`] the
//! caller asked for and the [`EntityState`] persistence will actually apply.
//! The two diverge when a remove is turned into a flagged update.
//!
//! ## PersistenceSession
//!
//! [`PersistenceSession`] is the commit boundary. [`SqliteSession`] is the
//! bundled implementation: one JSON row per entity, one transaction per
//! commit.
//!
//! # Example
//!
//! ```no_run
//! use storage::{ChangeSet, Document, PendingModification, PersistenceSession, SqliteSession};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> storage::Result<()> {
//! let session = SqliteSession::open("records.db")?;
//!
//! let changes = ChangeSet::new()
//!     .with(PendingModification::insert(
//!         Document::new("notes", "1").with_field("deleted", false),
//!     ));
//! let summary = session.commit(&changes, &CancellationToken::new()).await?;
//! assert_eq!(summary.inserted, 1);
//!
//! for stored in session.list(&"notes".into())? {
//!     println!("{} @ {}", stored.document.key, stored.updated_at);
//! }
//! # Ok(())
//! # }
//! ```

mod change;
mod entity;
mod error;
mod store;

pub use change::{
    ChangeSet, CommitSummary, EntityState, ModificationAction, PendingModification,
    PersistenceSession,
};
pub use entity::{Document, Entity, Record};
pub use error::{Error, Result};
pub use store::{SqliteSession, StoredDocument};
