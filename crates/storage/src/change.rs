//! Change-sets and the persistence session interface.

use crate::{Entity, Result};
use serde::{Deserialize, Serialize};
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// The action a caller requested for an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModificationAction {
    Insert,
    Update,
    Remove,
}

/// How persistence will write a tracked entity on commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityState {
    Added,
    Modified,
    Deleted,
}

impl From<ModificationAction> for EntityState {
    fn from(action: ModificationAction) -> Self {
        match action {
            ModificationAction::Insert => EntityState::Added,
            ModificationAction::Update => EntityState::Modified,
            ModificationAction::Remove => EntityState::Deleted,
        }
    }
}

/// One pending modification in a change-set.
///
/// `action` records what was requested and never changes; `state` is what
/// persistence will do and may be rewritten before commit.
#[derive(Debug)]
pub struct PendingModification {
    pub action: ModificationAction,
    pub state: EntityState,
    pub entity: Box<dyn Entity>,
}

impl PendingModification {
    pub fn new(action: ModificationAction, entity: impl Entity) -> Self {
        Self::boxed(action, Box::new(entity))
    }

    pub fn boxed(action: ModificationAction, entity: Box<dyn Entity>) -> Self {
        Self {
            action,
            state: action.into(),
            entity,
        }
    }

    pub fn insert(entity: impl Entity) -> Self {
        Self::new(ModificationAction::Insert, entity)
    }

    pub fn update(entity: impl Entity) -> Self {
        Self::new(ModificationAction::Update, entity)
    }

    pub fn remove(entity: impl Entity) -> Self {
        Self::new(ModificationAction::Remove, entity)
    }

    /// Downcast the entity to a concrete type.
    pub fn entity_as<T: Entity>(&self) -> Option<&T> {
        self.entity.as_any().downcast_ref::<T>()
    }
}

/// Ordered batch of pending modifications submitted together.
#[derive(Debug, Default)]
pub struct ChangeSet {
    entries: Vec<PendingModification>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, modification: PendingModification) {
        self.entries.push(modification);
    }

    pub fn with(mut self, modification: PendingModification) -> Self {
        self.push(modification);
        self
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PendingModification> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, PendingModification> {
        self.entries.iter_mut()
    }

    pub fn get(&self, index: usize) -> Option<&PendingModification> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries that will be physically deleted on commit.
    pub fn remove_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|m| m.state == EntityState::Deleted)
            .count()
    }

    /// Entries requested with the given action.
    pub fn count(&self, action: ModificationAction) -> usize {
        self.entries.iter().filter(|m| m.action == action).count()
    }
}

impl FromIterator<PendingModification> for ChangeSet {
    fn from_iter<I: IntoIterator<Item = PendingModification>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a ChangeSet {
    type Item = &'a PendingModification;
    type IntoIter = std::slice::Iter<'a, PendingModification>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Rows written by a commit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitSummary {
    pub inserted: usize,
    pub updated: usize,
    pub deleted: usize,
}

/// The persistence layer a change-set is committed through.
///
/// Commit is the only point where data is durably written. Implementations
/// own retries, timeouts and transactional rollback.
pub trait PersistenceSession: Send + Sync {
    /// Track an entity as modified instead of removed.
    fn mark_modified(&self, modification: &mut PendingModification) {
        modification.state = EntityState::Modified;
    }

    /// Write every tracked entity in the change-set.
    fn commit(
        &self,
        changes: &ChangeSet,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<CommitSummary>> + Send;
}
