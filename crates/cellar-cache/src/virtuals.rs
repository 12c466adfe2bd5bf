//! Computed ("virtual") properties.
//!
//! A [`VirtualHandler`] is registered per field. The cache consults it only
//! when a read misses the store, or on every read for
//! [`ComputeMode::EveryTime`] handlers. Explicit `cache_*`/`set_*` calls
//! never reach a handler.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use cellar_types::{FieldId, LanguageId, ObjectHandle};

use crate::cache::PropertyCache;
use crate::error::CacheResult;
use crate::value::PropertyValue;

/// When a handler's result is retained.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ComputeMode {
    /// First miss computes, the result is cached, later reads hit.
    Once,
    /// Every read computes; nothing is retained.
    EveryTime,
}

/// Binding state of a field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VirtualState {
    Unbound,
    ComputeOnce,
    ComputeEveryTime,
}

/// What a handler is asked to compute.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VirtualRequest {
    pub handle: ObjectHandle,
    pub field: FieldId,
    /// Set for multilingual fields.
    pub language: Option<LanguageId>,
}

/// Strategy computing a field's value on demand.
pub trait VirtualHandler: Send + Sync {
    /// Compute the value. The cache is read-only here; use
    /// [`PropertyCache::peek`] and friends to read stored inputs.
    fn compute(&self, cache: &PropertyCache, request: &VirtualRequest) -> CacheResult<PropertyValue>;

    fn mode(&self) -> ComputeMode {
        ComputeMode::Once
    }
}

type ComputeFn = dyn Fn(&PropertyCache, &VirtualRequest) -> CacheResult<PropertyValue> + Send + Sync;

/// Closure-backed [`VirtualHandler`].
pub struct VirtualFn {
    mode: ComputeMode,
    compute: Box<ComputeFn>,
}

impl VirtualFn {
    pub fn once<F>(compute: F) -> Self
    where
        F: Fn(&PropertyCache, &VirtualRequest) -> CacheResult<PropertyValue> + Send + Sync + 'static,
    {
        Self {
            mode: ComputeMode::Once,
            compute: Box::new(compute),
        }
    }

    pub fn every_time<F>(compute: F) -> Self
    where
        F: Fn(&PropertyCache, &VirtualRequest) -> CacheResult<PropertyValue> + Send + Sync + 'static,
    {
        Self {
            mode: ComputeMode::EveryTime,
            compute: Box::new(compute),
        }
    }
}

impl VirtualHandler for VirtualFn {
    fn compute(&self, cache: &PropertyCache, request: &VirtualRequest) -> CacheResult<PropertyValue> {
        (self.compute)(cache, request)
    }

    fn mode(&self) -> ComputeMode {
        self.mode
    }
}

impl fmt::Debug for VirtualFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VirtualFn").field("mode", &self.mode).finish()
    }
}

/// Field-to-handler registry.
#[derive(Default, Clone)]
pub struct VirtualRegistry {
    handlers: HashMap<FieldId, Arc<dyn VirtualHandler>>,
}

impl VirtualRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `handler` to `field`, returning any previous binding.
    pub fn install(
        &mut self,
        field: FieldId,
        handler: Arc<dyn VirtualHandler>,
    ) -> Option<Arc<dyn VirtualHandler>> {
        self.handlers.insert(field, handler)
    }

    pub fn remove(&mut self, field: FieldId) -> Option<Arc<dyn VirtualHandler>> {
        self.handlers.remove(&field)
    }

    pub fn get(&self, field: FieldId) -> Option<&Arc<dyn VirtualHandler>> {
        self.handlers.get(&field)
    }

    pub fn state(&self, field: FieldId) -> VirtualState {
        match self.handlers.get(&field).map(|h| h.mode()) {
            None => VirtualState::Unbound,
            Some(ComputeMode::Once) => VirtualState::ComputeOnce,
            Some(ComputeMode::EveryTime) => VirtualState::ComputeEveryTime,
        }
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for VirtualRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut fields: Vec<_> = self.handlers.keys().map(|f| f.raw()).collect();
        fields.sort();
        f.debug_struct("VirtualRegistry").field("fields", &fields).finish()
    }
}
