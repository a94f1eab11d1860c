//! Soft-delete settings.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// What to do when a removed entity has no soft-delete flag field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingFlag {
    /// Refuse the whole submit before anything is committed.
    #[default]
    Reject,
    /// Keep the modification as a hard delete.
    Fallback,
}

/// Settings consumed by [`SubmitInterceptor`](crate::SubmitInterceptor).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoftDeleteConfig {
    /// Boolean field that marks an entity as logically deleted.
    pub flag_property_name: String,

    /// Callers in this role perform real deletes.
    #[serde(default)]
    pub admin_role_name: Option<String>,

    #[serde(default)]
    pub missing_flag: MissingFlag,
}

impl SoftDeleteConfig {
    pub fn new(flag_property_name: impl Into<String>) -> Result<Self> {
        let config = Self {
            flag_property_name: flag_property_name.into(),
            admin_role_name: None,
            missing_flag: MissingFlag::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Set the admin role. A blank name leaves the bypass disabled.
    pub fn with_admin_role(mut self, role: impl Into<String>) -> Self {
        self.admin_role_name = Some(role.into());
        self
    }

    pub fn with_missing_flag(mut self, missing_flag: MissingFlag) -> Self {
        self.missing_flag = missing_flag;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.flag_property_name.trim().is_empty() {
            return Err(Error::Configuration(
                "soft_delete.flag_property_name must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// The admin role, if one is configured and non-blank.
    pub fn admin_role(&self) -> Option<&str> {
        self.admin_role_name
            .as_deref()
            .map(str::trim)
            .filter(|role| !role.is_empty())
    }
}
