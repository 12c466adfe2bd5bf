use cellar_schema::SchemaError;
use cellar_types::{FieldId, LanguageId, ObjectGuid, ObjectHandle};

/// Errors from property cache operations.
///
/// Every error is raised before the cache is mutated: a rejected call leaves
/// the cache exactly as it was.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Null handle, or a handle whose class identity was never cached.
    #[error("invalid object handle: {0}")]
    InvalidHandle(ObjectHandle),

    /// Field not valid for the object's class, or value kind does not match
    /// the field's declared kind.
    #[error("schema violation on {handle}, {field}: {reason}")]
    SchemaViolation {
        handle: ObjectHandle,
        field: FieldId,
        reason: String,
    },

    /// Declared payload length differs from the physical payload length.
    #[error("length mismatch: declared {declared}, actual {actual}")]
    LengthMismatch { declared: usize, actual: usize },

    /// No cached value and no virtual binding or fallback applies.
    #[error("no value cached for {handle}, {field}")]
    NotFound { handle: ObjectHandle, field: FieldId },

    /// No object is registered under this identity GUID.
    #[error("no object with guid {0}")]
    GuidNotFound(ObjectGuid),

    /// The operation belongs to a higher persistence layer.
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// Language ids must be strictly positive.
    #[error("invalid language id: {0}")]
    InvalidLanguage(LanguageId),

    /// Sequence index past the end.
    #[error("index {index} out of range for sequence of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    /// Splice range with `from > to`.
    #[error("invalid range {from}..{to}")]
    InvalidRange { from: usize, to: usize },

    /// Ordinal hint other than -1 (collection), -2 (atomic), or >= 0.
    #[error("invalid ordinal hint: {0}")]
    InvalidOrdinal(i32),

    /// An operation other than class bootstrap ran without a schema.
    #[error("no schema provider configured")]
    MissingSchema,

    /// Schema loading failed.
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Configuration could not be read or is invalid.
    #[error("config error: {0}")]
    Config(String),

    /// A fixture document could not be parsed or applied.
    #[error("fixture error: {0}")]
    Fixture(String),
}

impl CacheError {
    /// Returns `true` for lookups that found nothing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::GuidNotFound(_))
    }

    pub(crate) fn violation(handle: ObjectHandle, field: FieldId, reason: impl Into<String>) -> Self {
        Self::SchemaViolation {
            handle,
            field,
            reason: reason.into(),
        }
    }
}

/// Result alias for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;
