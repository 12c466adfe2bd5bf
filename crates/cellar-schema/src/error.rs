//! Error types for schema operations.

use cellar_types::{ClassId, FieldId};
use thiserror::Error;

/// Errors that can occur while building or loading a schema.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// Two classes share an id.
    #[error("duplicate class id: {0}")]
    DuplicateClass(ClassId),

    /// Two fields share an id.
    #[error("duplicate field id: {0}")]
    DuplicateField(FieldId),

    /// Class id 0 is reserved.
    #[error("class id 0 is reserved")]
    ReservedClass,

    /// A declared field reuses a system field id.
    #[error("field id {0} is reserved for a system field")]
    ReservedField(FieldId),

    /// A field is declared on a class the schema does not define.
    #[error("field {field} declared on unknown {class}")]
    UnknownClass { field: FieldId, class: ClassId },

    /// A class names a base class the schema does not define.
    #[error("{class} derives from unknown {base}")]
    UnknownBase { class: ClassId, base: ClassId },

    /// The class hierarchy loops back on itself.
    #[error("inheritance cycle through {0}")]
    InheritanceCycle(ClassId),

    /// A class or field id does not fit the signed 32-bit value it is
    /// recorded as on objects.
    #[error("{0} exceeds the largest recordable id")]
    IdOutOfRange(String),

    /// A class or field has an empty name.
    #[error("empty name for {0}")]
    EmptyName(String),

    /// The document could not be parsed.
    #[error("parse error: {0}")]
    Parse(String),

    /// I/O error while reading a schema file.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for schema operations.
pub type Result<T> = std::result::Result<T, SchemaError>;
