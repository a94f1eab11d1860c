//! Per-resource authorization entries.

use crate::{Action, Resource, ResourceType};
use std::fmt;
use std::sync::Arc;

/// A zero-argument permission check.
pub type Predicate = Arc<dyn Fn() -> bool + Send + Sync>;

/// Insert, update and delete predicates for one resource type.
///
/// A missing predicate always denies.
#[derive(Clone)]
pub struct AuthorizationEntry {
    resource_type: ResourceType,
    insert: Option<Predicate>,
    update: Option<Predicate>,
    delete: Option<Predicate>,
}

impl AuthorizationEntry {
    /// Create an entry that denies every action.
    pub fn new(resource_type: impl Into<ResourceType>) -> Self {
        Self {
            resource_type: resource_type.into(),
            insert: None,
            update: None,
            delete: None,
        }
    }

    /// Create a deny-all entry for a typed resource.
    pub fn for_resource<T: Resource>() -> Self {
        Self::new(ResourceType::of::<T>())
    }

    pub fn allow_insert(mut self, predicate: impl Fn() -> bool + Send + Sync + 'static) -> Self {
        self.insert = Some(Arc::new(predicate));
        self
    }

    pub fn allow_update(mut self, predicate: impl Fn() -> bool + Send + Sync + 'static) -> Self {
        self.update = Some(Arc::new(predicate));
        self
    }

    pub fn allow_delete(mut self, predicate: impl Fn() -> bool + Send + Sync + 'static) -> Self {
        self.delete = Some(Arc::new(predicate));
        self
    }

    pub fn resource_type(&self) -> &ResourceType {
        &self.resource_type
    }

    pub fn predicate(&self, action: Action) -> Option<&Predicate> {
        match action {
            Action::Insert => self.insert.as_ref(),
            Action::Update => self.update.as_ref(),
            Action::Delete => self.delete.as_ref(),
        }
    }

    /// Evaluate the predicate for `action`, denying when none is configured.
    pub fn allows(&self, action: Action) -> bool {
        self.predicate(action).is_some_and(|p| p())
    }

    pub fn can_insert(&self) -> bool {
        self.allows(Action::Insert)
    }

    pub fn can_update(&self) -> bool {
        self.allows(Action::Update)
    }

    pub fn can_delete(&self) -> bool {
        self.allows(Action::Delete)
    }
}

impl fmt::Debug for AuthorizationEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizationEntry")
            .field("resource_type", &self.resource_type)
            .field("insert", &self.insert.is_some())
            .field("update", &self.update.is_some())
            .field("delete", &self.delete.is_some())
            .finish()
    }
}
