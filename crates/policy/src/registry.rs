//! Authorization registry and policy decisions.

use crate::{Action, AuthorizationEntry, Error, Resource, ResourceType, Result};
use std::collections::{HashMap, HashSet};

/// Result of an authorization check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny { reason: String },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

/// Mapping from resource type to its authorization entry.
///
/// Populated once during bootstrap, then shared read-only (typically behind
/// an `Arc`) with every request handler. Registration needs `&mut self`, so
/// it cannot interleave with lookups.
#[derive(Debug, Default)]
pub struct AuthorizationRegistry {
    entries: HashMap<ResourceType, AuthorizationEntry>,
}

impl AuthorizationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a batch of entries.
    ///
    /// Fails if any resource type is already registered or appears twice in
    /// `entries`. The batch is validated before anything is inserted, so a
    /// failed call leaves the registry unchanged.
    pub fn register(&mut self, entries: impl IntoIterator<Item = AuthorizationEntry>) -> Result<()> {
        let entries: Vec<_> = entries.into_iter().collect();

        let mut seen = HashSet::with_capacity(entries.len());
        for entry in &entries {
            let resource_type = entry.resource_type();
            if self.entries.contains_key(resource_type) || !seen.insert(resource_type) {
                return Err(Error::DuplicateRegistration(resource_type.clone()));
            }
        }

        for entry in entries {
            tracing::debug!("Registered authorization entry: {}", entry.resource_type());
            self.entries.insert(entry.resource_type().clone(), entry);
        }
        Ok(())
    }

    /// Look up the entry for a resource type.
    pub fn lookup(&self, resource_type: &ResourceType) -> Result<&AuthorizationEntry> {
        self.entries
            .get(resource_type)
            .ok_or_else(|| Error::NotFound(resource_type.clone()))
    }

    /// Look up the entry for a typed resource.
    pub fn for_type<T: Resource>(&self) -> Result<&AuthorizationEntry> {
        self.lookup(&ResourceType::of::<T>())
    }

    pub fn can_insert(&self, resource_type: &ResourceType) -> bool {
        self.allows(resource_type, Action::Insert)
    }

    pub fn can_update(&self, resource_type: &ResourceType) -> bool {
        self.allows(resource_type, Action::Update)
    }

    pub fn can_delete(&self, resource_type: &ResourceType) -> bool {
        self.allows(resource_type, Action::Delete)
    }

    /// Whether `action` is permitted; unregistered types are denied.
    pub fn allows(&self, resource_type: &ResourceType, action: Action) -> bool {
        self.entries
            .get(resource_type)
            .is_some_and(|entry| entry.allows(action))
    }

    /// Check an action and explain a denial.
    pub fn check(&self, resource_type: &ResourceType, action: Action) -> Decision {
        let Some(entry) = self.entries.get(resource_type) else {
            return Decision::Deny {
                reason: format!("resource type '{resource_type}' is not registered"),
            };
        };

        match entry.predicate(action) {
            None => Decision::Deny {
                reason: format!("{action} is not configured for '{resource_type}'"),
            },
            Some(predicate) if predicate() => Decision::Allow,
            Some(_) => Decision::Deny {
                reason: format!("{action} on '{resource_type}' refused by policy"),
            },
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ReadOnlyEntry;

    impl Resource for ReadOnlyEntry {
        const RESOURCE_TYPE: &'static str = "read_only_entry";
    }

    fn sample() -> AuthorizationRegistry {
        let mut registry = AuthorizationRegistry::new();
        registry
            .register([
                AuthorizationEntry::for_resource::<ReadOnlyEntry>(),
                AuthorizationEntry::new("cant_update").allow_insert(|| true),
                AuthorizationEntry::new("admin_archive")
                    .allow_insert(|| true)
                    .allow_update(|| true)
                    .allow_delete(|| false),
            ])
            .unwrap();
        registry
    }

    #[test]
    fn test_lookup_returns_registered_entry() {
        let registry = sample();
        let entry = registry.lookup(&"cant_update".into()).unwrap();
        assert_eq!(entry.resource_type().as_str(), "cant_update");
        assert!(entry.can_insert());
    }

    #[test]
    fn test_typed_lookup() {
        let registry = sample();
        let entry = registry.for_type::<ReadOnlyEntry>().unwrap();
        assert_eq!(entry.resource_type(), &ResourceType::of::<ReadOnlyEntry>());
    }

    #[test]
    fn test_convenience_checks_match_predicates() {
        let registry = sample();
        let read_only = ResourceType::of::<ReadOnlyEntry>();
        assert!(!registry.can_insert(&read_only));
        assert!(!registry.can_update(&read_only));
        assert!(!registry.can_delete(&read_only));

        let cant_update = ResourceType::from("cant_update");
        assert!(registry.can_insert(&cant_update));
        assert!(!registry.can_update(&cant_update));

        let archive = ResourceType::from("admin_archive");
        assert!(registry.can_update(&archive));
        assert!(!registry.can_delete(&archive));
    }

    #[test]
    fn test_lookup_unregistered_is_not_found() {
        let registry = sample();
        let err = registry.lookup(&"missing".into()).unwrap_err();
        assert!(matches!(err, Error::NotFound(ref t) if t.as_str() == "missing"));
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let mut registry = sample();
        let err = registry
            .register([AuthorizationEntry::new("cant_update").allow_update(|| true)])
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateRegistration(ref t) if t.as_str() == "cant_update"));

        // Existing entries are untouched.
        assert!(!registry.can_update(&"cant_update".into()));
        assert!(registry.can_insert(&"cant_update".into()));
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_duplicate_within_batch_registers_nothing() {
        let mut registry = AuthorizationRegistry::new();
        let err = registry
            .register([
                AuthorizationEntry::new("fresh"),
                AuthorizationEntry::new("twice"),
                AuthorizationEntry::new("twice"),
            ])
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateRegistration(_)));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_check_explains_denials() {
        let registry = sample();
        assert!(registry.check(&"cant_update".into(), Action::Insert).is_allowed());

        let Decision::Deny { reason } = registry.check(&"cant_update".into(), Action::Update) else {
            panic!("expected deny");
        };
        assert!(reason.contains("not configured"));

        let Decision::Deny { reason } = registry.check(&"admin_archive".into(), Action::Delete) else {
            panic!("expected deny");
        };
        assert!(reason.contains("refused"));

        let Decision::Deny { reason } = registry.check(&"missing".into(), Action::Insert) else {
            panic!("expected deny");
        };
        assert!(reason.contains("not registered"));
    }

    #[test]
    fn test_can_delete_is_stable() {
        let registry = sample();
        let archive = ResourceType::from("admin_archive");
        let first = registry.can_delete(&archive);
        for _ in 0..5 {
            assert_eq!(registry.can_delete(&archive), first);
        }
    }

    #[test]
    fn test_resource_type_serializes_as_string() {
        let json = serde_json::to_string(&ResourceType::from("notes")).unwrap();
        assert_eq!(json, "\"notes\"");
    }
}
