//! In-memory schema for tests, fixtures, and tooling.
//!
//! [`InMemorySchema`] holds validated class and field tables in `BTreeMap`s.
//! It is immutable once built; share it between caches behind an `Arc`.

use std::collections::BTreeMap;
use std::path::Path;

use cellar_types::{ClassId, FieldId, ValueKind};
use tracing::info;

use crate::error::Result;
use crate::traits::SchemaProvider;
use crate::types::{ClassDef, FieldDef, SchemaDocument, SystemFields};
use crate::validate::validate_document;

/// An in-memory implementation of [`SchemaProvider`].
#[derive(Debug, Clone)]
pub struct InMemorySchema {
    classes: BTreeMap<ClassId, ClassDef>,
    fields: BTreeMap<FieldId, FieldDef>,
    system: SystemFields,
}

impl InMemorySchema {
    /// Start building a schema with the default system field ids.
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::new()
    }

    /// Validate a document and build a schema from it.
    pub fn from_document(doc: SchemaDocument, system: SystemFields) -> Result<Self> {
        validate_document(&doc, &system)?;
        let classes = doc.classes.into_iter().map(|c| (c.id, c)).collect();
        let fields = doc.fields.into_iter().map(|f| (f.id, f)).collect();
        Ok(Self {
            classes,
            fields,
            system,
        })
    }

    /// Parse and validate a TOML schema.
    pub fn from_toml_str(input: &str) -> Result<Self> {
        Self::from_document(SchemaDocument::from_toml_str(input)?, SystemFields::default())
    }

    /// Parse and validate a JSON schema.
    pub fn from_json_str(input: &str) -> Result<Self> {
        Self::from_document(SchemaDocument::from_json_str(input)?, SystemFields::default())
    }

    /// Load a schema file. Files ending in `.json` are read as JSON,
    /// everything else as TOML.
    pub fn load(path: &Path) -> Result<Self> {
        Self::load_with(path, SystemFields::default())
    }

    /// Like [`load`](Self::load), with custom system field ids.
    pub fn load_with(path: &Path, system: SystemFields) -> Result<Self> {
        let input = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let doc = if is_json {
            SchemaDocument::from_json_str(&input)?
        } else {
            SchemaDocument::from_toml_str(&input)?
        };
        let schema = Self::from_document(doc, system)?;
        info!(
            path = %path.display(),
            classes = schema.classes.len(),
            fields = schema.fields.len(),
            "schema loaded"
        );
        Ok(schema)
    }

    /// System field ids this schema answers for.
    pub fn system_fields(&self) -> &SystemFields {
        &self.system
    }

    pub fn class(&self, id: ClassId) -> Option<&ClassDef> {
        self.classes.get(&id)
    }

    pub fn field(&self, id: FieldId) -> Option<&FieldDef> {
        self.fields.get(&id)
    }

    /// All declared (non-system) fields, ordered by id.
    pub fn fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.values()
    }

    /// All classes, ordered by id.
    pub fn classes(&self) -> impl Iterator<Item = &ClassDef> {
        self.classes.values()
    }

    /// Fields valid for `class`, including inherited ones, ordered by id.
    pub fn fields_of(&self, class: ClassId) -> Vec<&FieldDef> {
        self.fields
            .values()
            .filter(|f| self.inherits_from(class, f.class))
            .collect()
    }

    /// Export as a document (round-trips through `from_document`).
    pub fn to_document(&self) -> SchemaDocument {
        SchemaDocument {
            classes: self.classes.values().cloned().collect(),
            fields: self.fields.values().cloned().collect(),
        }
    }

    /// Returns `true` if `class` is `ancestor` or derives from it.
    pub fn inherits_from(&self, class: ClassId, ancestor: ClassId) -> bool {
        let mut current = Some(class);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            // Documents are checked for cycles on construction.
            current = self.classes.get(&id).and_then(|c| c.base);
        }
        false
    }

    fn system_kind(&self, field: FieldId) -> Option<ValueKind> {
        self.system
            .definitions()
            .iter()
            .find(|(id, _, _)| *id == field)
            .map(|(_, _, kind)| *kind)
    }
}

impl SchemaProvider for InMemorySchema {
    fn field_type(&self, field: FieldId) -> Option<ValueKind> {
        self.system_kind(field)
            .or_else(|| self.fields.get(&field).map(|f| f.kind))
    }

    fn is_valid_class(&self, field: FieldId, class: ClassId) -> bool {
        if !self.classes.contains_key(&class) {
            return false;
        }
        if self.system.contains(field) {
            return true;
        }
        self.fields
            .get(&field)
            .is_some_and(|f| self.inherits_from(class, f.class))
    }

    fn class_count(&self) -> usize {
        self.classes.len()
    }

    fn all_class_ids(&self) -> Vec<ClassId> {
        self.classes.keys().copied().collect()
    }

    fn is_known_class(&self, class: ClassId) -> bool {
        self.classes.contains_key(&class)
    }

    fn field_name(&self, field: FieldId) -> Option<String> {
        self.system
            .definitions()
            .iter()
            .find(|(id, _, _)| *id == field)
            .map(|(_, name, _)| (*name).to_string())
            .or_else(|| self.fields.get(&field).map(|f| f.name.clone()))
    }

    fn class_name(&self, class: ClassId) -> Option<String> {
        self.classes.get(&class).map(|c| c.name.clone())
    }
}

/// Fluent builder for [`InMemorySchema`].
///
/// ```
/// use cellar_schema::{InMemorySchema, SchemaProvider};
/// use cellar_types::{ClassId, FieldId, ValueKind};
///
/// let schema = InMemorySchema::builder()
///     .class(1, "LexEntry")
///     .field(1001, "Senses", 1, ValueKind::OwningSequence)
///     .build()
///     .unwrap();
/// assert!(schema.is_valid_class(FieldId::new(1001), ClassId::new(1)));
/// ```
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    doc: SchemaDocument,
    system: SystemFields,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the system field ids.
    pub fn system_fields(mut self, system: SystemFields) -> Self {
        self.system = system;
        self
    }

    /// Add a root class.
    pub fn class(mut self, id: u32, name: &str) -> Self {
        self.doc.classes.push(ClassDef::new(id, name));
        self
    }

    /// Add a class deriving from `base`.
    pub fn subclass(mut self, id: u32, name: &str, base: u32) -> Self {
        self.doc.classes.push(ClassDef::new(id, name).with_base(base));
        self
    }

    /// Add a field declared on `class`.
    pub fn field(mut self, id: u32, name: &str, class: u32, kind: ValueKind) -> Self {
        self.doc.fields.push(FieldDef::new(id, name, class, kind));
        self
    }

    /// Validate and build.
    pub fn build(self) -> Result<InMemorySchema> {
        InMemorySchema::from_document(self.doc, self.system)
    }
}
