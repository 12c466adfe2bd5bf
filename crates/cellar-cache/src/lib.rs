//! Schema-validated in-memory object property cache.
//!
//! [`PropertyCache`] holds every attribute of a graph of domain objects,
//! keyed by `(object handle, field)` or, for multilingual text,
//! `(object handle, field, language)`. It stands in for a persistent store
//! in tests and tooling and keeps that store's contract: typed storage
//! validated against a [`SchemaProvider`](cellar_schema::SchemaProvider),
//! owners and owned objects that agree, and owned sequences whose ordinals
//! match their positions.
//!
//! # Components
//!
//! - [`store`] -- keyed value and alternative maps ([`PropertyStore`])
//! - [`value`] -- the [`PropertyValue`] sum type and opaque values
//! - [`accessors`] -- typed `cache_*` / `get_*` / `set_*` operations
//! - [`ownership`] -- [`PropertyCache::replace`], object creation, invariant checks
//! - [`guid_index`] -- identity GUID to handle index
//! - [`virtuals`] -- computed properties ([`VirtualHandler`])
//! - [`dirty`] -- modification timestamps and the aggregate dirty flag
//! - [`handles`] -- handle allocation
//! - [`hooks`] -- action-handler and listener slots
//! - [`fixture`] -- JSON load/capture
//!
//! # Rules
//!
//! 1. An object exists once its class identity is cached; handle 0 never does.
//! 2. Every check runs before the first write: a rejected call changes nothing.
//! 3. `cache_*` loads without marking dirty; `set_*` marks the object dirty.
//! 4. Only the identity GUID field feeds the GUID index.
//! 5. Virtual handlers run on read misses only (or every read, when bound
//!    compute-every-time), never on writes.
//! 6. No internal locking: mutation takes `&mut self`.

pub mod accessors;
pub mod cache;
pub mod config;
pub mod dirty;
pub mod error;
pub mod fixture;
pub mod guid_index;
pub mod handles;
pub mod hooks;
pub mod ownership;
pub mod store;
pub mod value;
pub mod virtuals;

pub use cache::PropertyCache;
pub use config::CacheConfig;
pub use dirty::DirtyTracker;
pub use error::{CacheError, CacheResult};
pub use fixture::{Fixture, FixtureObject, FixtureSummary, FixtureValue};
pub use guid_index::GuidIndex;
pub use handles::HandleAllocator;
pub use hooks::{ActionHandler, ChangeListener, HookSlots, NoOpListener, PropChange};
pub use ownership::{OwnershipViolation, APPEND_TO_COLLECTION, SET_ATOMIC};
pub use store::{AlternativeKey, PropertyKey, PropertyStore};
pub use value::{OpaqueBlob, OpaqueValue, PropertyValue};
pub use virtuals::{ComputeMode, VirtualFn, VirtualHandler, VirtualRegistry, VirtualRequest, VirtualState};
