//! Foundation types for the Cellar object property cache.
//!
//! This crate provides the identifier, value-kind, and text types shared by
//! the schema provider and the cache. Every other Cellar crate depends on
//! `cellar-types`.
//!
//! # Key Types
//!
//! - [`ObjectHandle`]: Integer handle of a domain object (0 is never valid)
//! - [`FieldId`] / [`ClassId`]: Schema-owned identifiers of fields and classes
//! - [`LanguageId`]: Writing system of a multilingual text alternative
//! - [`ObjectGuid`]: Globally unique object identity (UUID)
//! - [`ValueKind`]: Declared type of a field, and the [`StoreKind`] it lives in
//! - [`RichText`]: Text with per-run language and style

pub mod error;
pub mod guid;
pub mod handle;
pub mod kind;
pub mod text;

pub use error::TypeError;
pub use guid::ObjectGuid;
pub use handle::{ClassId, FieldId, LanguageId, ObjectHandle};
pub use kind::{StoreKind, ValueKind};
pub use text::{RichText, TextRun};
