//! Declared boolean fields per resource type.
//!
//! Each resource type lists the boolean fields the interceptor may set, with
//! an accessor checked by the compiler for Rust types. Looking a field up by
//! name only ever searches these declarations.

use policy::ResourceType;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use storage::{Document, Entity, Record};

/// Writes one boolean field on an entity.
pub trait BoolField: Send + Sync {
    /// Set the field; returns `false` if `entity` is not of the declared shape.
    fn set(&self, entity: &mut dyn Entity, value: bool) -> bool;
}

struct TypedField<T> {
    accessor: fn(&mut T) -> &mut bool,
}

impl<T: Record> BoolField for TypedField<T> {
    fn set(&self, entity: &mut dyn Entity, value: bool) -> bool {
        match entity.as_any_mut().downcast_mut::<T>() {
            Some(record) => {
                *(self.accessor)(record) = value;
                true
            }
            None => false,
        }
    }
}

struct DocumentField {
    name: String,
}

impl BoolField for DocumentField {
    fn set(&self, entity: &mut dyn Entity, value: bool) -> bool {
        match entity.as_any_mut().downcast_mut::<Document>() {
            Some(document) => {
                document.fields.insert(self.name.clone(), Value::Bool(value));
                true
            }
            None => false,
        }
    }
}

/// Registry of declared boolean fields, keyed by resource type then name.
#[derive(Default)]
pub struct EntityFields {
    fields: HashMap<ResourceType, HashMap<String, Box<dyn BoolField>>>,
}

impl EntityFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a boolean field on a Rust record type.
    ///
    /// ```
    /// # use policy::Resource;
    /// # use storage::Record;
    /// # use submit::EntityFields;
    /// #[derive(Debug, serde::Serialize)]
    /// struct Note { id: u32, deleted: bool }
    /// # impl Resource for Note { const RESOURCE_TYPE: &'static str = "notes"; }
    /// # impl Record for Note { fn id(&self) -> String { self.id.to_string() } }
    ///
    /// let fields = EntityFields::new().declare::<Note>("deleted", |n| &mut n.deleted);
    /// assert!(fields.has(&"notes".into(), "deleted"));
    /// ```
    pub fn declare<T: Record>(self, name: impl Into<String>, accessor: fn(&mut T) -> &mut bool) -> Self {
        self.declare_with(ResourceType::of::<T>(), name, TypedField { accessor })
    }

    /// Declare a boolean field on [`Document`]s of a resource type.
    pub fn declare_document(self, resource_type: impl Into<ResourceType>, name: impl Into<String>) -> Self {
        let name = name.into();
        let field = DocumentField { name: name.clone() };
        self.declare_with(resource_type.into(), name, field)
    }

    /// Declare a field with a custom accessor.
    pub fn declare_with(
        mut self,
        resource_type: ResourceType,
        name: impl Into<String>,
        field: impl BoolField + 'static,
    ) -> Self {
        self.fields
            .entry(resource_type)
            .or_default()
            .insert(name.into(), Box::new(field));
        self
    }

    pub fn find(&self, resource_type: &ResourceType, name: &str) -> Option<&dyn BoolField> {
        self.fields
            .get(resource_type)
            .and_then(|fields| fields.get(name))
            .map(|field| &**field)
    }

    pub fn has(&self, resource_type: &ResourceType, name: &str) -> bool {
        self.find(resource_type, name).is_some()
    }

    pub fn resource_types(&self) -> impl Iterator<Item = &ResourceType> {
        self.fields.keys()
    }
}

impl fmt::Debug for EntityFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (resource_type, fields) in &self.fields {
            map.entry(resource_type, &fields.keys().collect::<Vec<_>>());
        }
        map.finish()
    }
}
