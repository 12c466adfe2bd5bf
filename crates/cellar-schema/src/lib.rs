//! Schema provider for the Cellar property cache.
//!
//! The cache never infers a field's type from data: it asks a
//! [`SchemaProvider`] what kind each field holds and whether an object's class
//! may carry it. This crate defines that interface and an in-memory
//! implementation built from code or loaded from a TOML/JSON document.
//!
//! # Architecture
//!
//! - **Classes** form a single-inheritance hierarchy. A field declared on a
//!   class is valid for that class and every subclass.
//! - **System fields** (identity GUID, class, owner, owning field, ordinal)
//!   are implicitly valid for every class.
//!
//! # Modules
//!
//! - [`error`]: Error types for schema loading
//! - [`types`]: Document types: [`ClassDef`], [`FieldDef`], [`SchemaDocument`], [`SystemFields`]
//! - [`traits`]: The [`SchemaProvider`] trait consumed by the cache
//! - [`validate`]: Structural checks run before a document is accepted
//! - [`memory`]: [`InMemorySchema`] and its [`SchemaBuilder`]

pub mod error;
pub mod memory;
pub mod traits;
pub mod types;
pub mod validate;

pub use error::{Result, SchemaError};
pub use memory::{InMemorySchema, SchemaBuilder};
pub use traits::SchemaProvider;
pub use types::{ClassDef, FieldDef, SchemaDocument, SystemFields};
pub use validate::validate_document;
