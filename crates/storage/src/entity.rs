//! Entities tracked by a change-set.

use crate::Result;
use policy::{Resource, ResourceType};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::any::Any;
use std::fmt;

/// An entity instance that can be persisted.
///
/// Object safe so a change-set can mix resource types. Implemented for every
/// [`Record`] and for [`Document`].
pub trait Entity: fmt::Debug + Send + Sync + 'static {
    fn resource_type(&self) -> ResourceType;

    /// Primary key within the resource type.
    fn key(&self) -> String;

    /// JSON snapshot of the entity, as written to storage.
    fn to_value(&self) -> Result<Value>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// A statically typed, serializable resource.
pub trait Record: Resource + Serialize + fmt::Debug + Send + Sync + 'static {
    fn id(&self) -> String;
}

impl<T: Record> Entity for T {
    fn resource_type(&self) -> ResourceType {
        ResourceType::of::<T>()
    }

    fn key(&self) -> String {
        self.id()
    }

    fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A schemaless entity whose resource type is only known at runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub resource_type: ResourceType,
    pub key: String,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl Document {
    pub fn new(resource_type: impl Into<ResourceType>, key: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            key: key.into(),
            fields: Map::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn flag(&self, name: &str) -> Option<bool> {
        self.fields.get(name).and_then(Value::as_bool)
    }
}

impl Entity for Document {
    fn resource_type(&self) -> ResourceType {
        self.resource_type.clone()
    }

    fn key(&self) -> String {
        self.key.clone()
    }

    fn to_value(&self) -> Result<Value> {
        Ok(Value::Object(self.fields.clone()))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
