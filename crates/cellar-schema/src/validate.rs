//! Structural validation of schema documents.
//!
//! A valid document:
//! - Uses non-zero, unique class ids and unique field ids
//! - Keeps class and field ids within `i32::MAX`, since objects record
//!   their class and owning field as 32-bit integers
//! - Gives every class and field a non-empty name
//! - Declares every field on a defined class
//! - Derives only from defined classes, without cycles
//! - Never reuses a system field id

use std::collections::{HashMap, HashSet};

use cellar_types::ClassId;

use crate::error::{Result, SchemaError};
use crate::types::{SchemaDocument, SystemFields};

const MAX_RECORDABLE_ID: u32 = i32::MAX as u32;

/// Validate a document against the given system field ids.
///
/// # Examples
///
/// ```
/// use cellar_schema::{validate_document, ClassDef, SchemaDocument, SystemFields};
///
/// let doc = SchemaDocument {
///     classes: vec![ClassDef::new(1, "LexEntry")],
///     fields: vec![],
/// };
/// assert!(validate_document(&doc, &SystemFields::default()).is_ok());
/// ```
pub fn validate_document(doc: &SchemaDocument, system: &SystemFields) -> Result<()> {
    let mut bases: HashMap<ClassId, Option<ClassId>> = HashMap::new();
    for class in &doc.classes {
        if class.id.raw() == 0 {
            return Err(SchemaError::ReservedClass);
        }
        if class.id.raw() > MAX_RECORDABLE_ID {
            return Err(SchemaError::IdOutOfRange(class.id.to_string()));
        }
        if class.name.trim().is_empty() {
            return Err(SchemaError::EmptyName(class.id.to_string()));
        }
        if bases.insert(class.id, class.base).is_some() {
            return Err(SchemaError::DuplicateClass(class.id));
        }
    }

    for class in &doc.classes {
        if let Some(base) = class.base {
            if !bases.contains_key(&base) {
                return Err(SchemaError::UnknownBase {
                    class: class.id,
                    base,
                });
            }
        }
        check_acyclic(class.id, &bases)?;
    }

    let mut seen = HashSet::new();
    for field in &doc.fields {
        if field.name.trim().is_empty() {
            return Err(SchemaError::EmptyName(field.id.to_string()));
        }
        if field.id.raw() > MAX_RECORDABLE_ID {
            return Err(SchemaError::IdOutOfRange(field.id.to_string()));
        }
        if system.contains(field.id) {
            return Err(SchemaError::ReservedField(field.id));
        }
        if !seen.insert(field.id) {
            return Err(SchemaError::DuplicateField(field.id));
        }
        if !bases.contains_key(&field.class) {
            return Err(SchemaError::UnknownClass {
                field: field.id,
                class: field.class,
            });
        }
    }

    Ok(())
}

fn check_acyclic(start: ClassId, bases: &HashMap<ClassId, Option<ClassId>>) -> Result<()> {
    let mut visited = HashSet::new();
    let mut current = Some(start);
    while let Some(class) = current {
        if !visited.insert(class) {
            return Err(SchemaError::InheritanceCycle(start));
        }
        current = bases.get(&class).copied().flatten();
    }
    Ok(())
}
