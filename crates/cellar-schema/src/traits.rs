//! The [`SchemaProvider`] trait defining what the cache asks of a schema.
//!
//! Any backend (in-memory, generated from a model file, backed by a real
//! database catalog) implements this trait to answer field-type and
//! class-compatibility questions for the property cache.

use cellar_types::{ClassId, FieldId, ValueKind};

/// Source of truth for field kinds and class/field compatibility.
///
/// Implementations must be thread-safe (`Send + Sync`) so a single schema
/// can back several caches.
pub trait SchemaProvider: Send + Sync {
    /// Declared kind of a field, or `None` if the field is unknown.
    fn field_type(&self, field: FieldId) -> Option<ValueKind>;

    /// Whether objects of `class` may carry `field`.
    fn is_valid_class(&self, field: FieldId, class: ClassId) -> bool;

    /// Number of classes the schema defines.
    fn class_count(&self) -> usize;

    /// Ids of every class the schema defines, in ascending order.
    fn all_class_ids(&self) -> Vec<ClassId>;

    /// Whether the schema defines `class`.
    fn is_known_class(&self, class: ClassId) -> bool {
        self.all_class_ids().contains(&class)
    }

    /// Human-readable field name, for diagnostics.
    fn field_name(&self, field: FieldId) -> Option<String> {
        let _ = field;
        None
    }

    /// Human-readable class name, for diagnostics.
    fn class_name(&self, class: ClassId) -> Option<String> {
        let _ = class;
        None
    }
}
