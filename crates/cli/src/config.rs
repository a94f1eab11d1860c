//! Configuration loading from tombstone.toml.

use policy::{AuthorizationEntry, AuthorizationRegistry, ResourceType};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use submit::{Caller, EntityFields, RoleOracle, SoftDeleteConfig, SubmitInterceptor};

/// Top-level configuration.
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Soft-delete settings.
    pub soft_delete: SoftDeleteConfig,

    /// Resource types, their boolean fields and authorization rules.
    #[serde(default)]
    pub resources: Vec<ResourceConfig>,
}

/// One governed resource type.
#[derive(Debug, Deserialize)]
pub struct ResourceConfig {
    pub name: ResourceType,

    /// Boolean fields documents of this type expose.
    #[serde(default)]
    pub fields: Vec<String>,

    /// Omitted rules deny.
    pub insert: Option<Rule>,
    pub update: Option<Rule>,
    pub delete: Option<Rule>,
}

/// Who may perform an action: everyone, no one, or members of any listed role.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Rule {
    Always(bool),
    Roles(Vec<String>),
}

impl Rule {
    fn predicate(&self, caller: &Arc<Caller>) -> impl Fn() -> bool + Send + Sync + 'static {
        let rule = self.clone();
        let caller = Arc::clone(caller);
        move || match &rule {
            Rule::Always(allowed) => *allowed,
            Rule::Roles(roles) => roles.iter().any(|role| caller.is_in_role(role)),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        tracing::debug!("Loading config from {}", path.as_ref().display());
        Self::parse(&content)
    }

    /// Parse configuration from TOML string.
    pub fn parse(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn resource(&self, name: &ResourceType) -> Option<&ResourceConfig> {
        self.resources.iter().find(|r| &r.name == name)
    }

    /// Build the authorization registry for one caller.
    pub fn registry(&self, caller: Caller) -> Result<AuthorizationRegistry, ConfigError> {
        let caller = Arc::new(caller);
        let entries = self.resources.iter().map(|resource| {
            let mut entry = AuthorizationEntry::new(resource.name.clone());
            if let Some(rule) = &resource.insert {
                entry = entry.allow_insert(rule.predicate(&caller));
            }
            if let Some(rule) = &resource.update {
                entry = entry.allow_update(rule.predicate(&caller));
            }
            if let Some(rule) = &resource.delete {
                entry = entry.allow_delete(rule.predicate(&caller));
            }
            entry
        });

        let mut registry = AuthorizationRegistry::new();
        registry.register(entries)?;
        Ok(registry)
    }

    /// Declared boolean fields for every configured resource.
    pub fn entity_fields(&self) -> EntityFields {
        self.resources
            .iter()
            .flat_map(|r| r.fields.iter().map(move |field| (&r.name, field)))
            .fold(EntityFields::new(), |fields, (name, field)| {
                fields.declare_document(name.clone(), field.clone())
            })
    }

    pub fn interceptor(&self) -> Result<SubmitInterceptor, ConfigError> {
        Ok(SubmitInterceptor::new(
            self.soft_delete.clone(),
            self.entity_fields(),
        )?)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error(transparent)]
    Policy(#[from] policy::Error),

    #[error(transparent)]
    SoftDelete(#[from] submit::Error),
}
