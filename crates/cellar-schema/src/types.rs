//! Schema document types.
//!
//! A [`SchemaDocument`] is the serialized form of a schema: a flat list of
//! classes and a flat list of fields. It deserializes from TOML or JSON and is
//! turned into an [`InMemorySchema`](crate::InMemorySchema) after validation.

use cellar_types::{ClassId, FieldId, ValueKind};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SchemaError};

/// A class definition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassDef {
    pub id: ClassId,
    pub name: String,
    /// Superclass, if any. Fields of the base are valid on this class.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<ClassId>,
}

impl ClassDef {
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id: ClassId::new(id),
            name: name.into(),
            base: None,
        }
    }

    pub fn with_base(mut self, base: u32) -> Self {
        self.base = Some(ClassId::new(base));
        self
    }
}

/// A field definition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    pub id: FieldId,
    pub name: String,
    /// Class that declares the field.
    pub class: ClassId,
    pub kind: ValueKind,
}

impl FieldDef {
    pub fn new(id: u32, name: impl Into<String>, class: u32, kind: ValueKind) -> Self {
        Self {
            id: FieldId::new(id),
            name: name.into(),
            class: ClassId::new(class),
            kind,
        }
    }
}

/// Ids of the fields every object carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemFields {
    /// Identity GUID; the only field that feeds the GUID index.
    pub guid: FieldId,
    /// Class identity; caching it brings an object into existence.
    pub class: FieldId,
    pub owner: FieldId,
    pub owning_field: FieldId,
    pub ordinal: FieldId,
}

impl Default for SystemFields {
    fn default() -> Self {
        Self {
            guid: FieldId::new(100),
            class: FieldId::new(101),
            owner: FieldId::new(102),
            owning_field: FieldId::new(103),
            ordinal: FieldId::new(104),
        }
    }
}

impl SystemFields {
    /// Every system field with its name and kind.
    pub fn definitions(&self) -> [(FieldId, &'static str, ValueKind); 5] {
        [
            (self.guid, "Guid", ValueKind::Guid),
            (self.class, "Class", ValueKind::Integer),
            (self.owner, "Owner", ValueKind::ReferenceAtomic),
            (self.owning_field, "OwningField", ValueKind::Integer),
            (self.ordinal, "Ordinal", ValueKind::Integer),
        ]
    }

    /// Returns `true` if `field` is one of the system fields.
    pub fn contains(&self, field: FieldId) -> bool {
        self.definitions().iter().any(|(id, _, _)| *id == field)
    }
}

/// Serialized schema: classes plus fields.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDocument {
    #[serde(default)]
    pub classes: Vec<ClassDef>,
    #[serde(default)]
    pub fields: Vec<FieldDef>,
}

impl SchemaDocument {
    /// Parse a TOML document.
    pub fn from_toml_str(input: &str) -> Result<Self> {
        toml::from_str(input).map_err(|e| SchemaError::Parse(e.to_string()))
    }

    /// Parse a JSON document.
    pub fn from_json_str(input: &str) -> Result<Self> {
        serde_json::from_str(input).map_err(|e| SchemaError::Parse(e.to_string()))
    }

    /// Render as pretty JSON.
    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| SchemaError::Parse(e.to_string()))
    }
}
