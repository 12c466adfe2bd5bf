//! The [`PropertyCache`]: schema validation, generic read/write paths, the
//! GUID index, virtual resolution, dirty tracking and lifecycle.
//!
//! Typed `cache_*`/`get_*`/`set_*` wrappers live in [`crate::accessors`];
//! sequence splicing and ownership upkeep in [`crate::ownership`].

use std::sync::Arc;

use cellar_schema::{SchemaProvider, SystemFields};
use cellar_types::{ClassId, FieldId, LanguageId, ObjectGuid, ObjectHandle, RichText, StoreKind, ValueKind};
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::config::CacheConfig;
use crate::dirty::DirtyTracker;
use crate::error::{CacheError, CacheResult};
use crate::guid_index::GuidIndex;
use crate::handles::HandleAllocator;
use crate::hooks::{ActionHandler, ChangeListener, HookSlots};
use crate::store::{AlternativeKey, PropertyKey, PropertyStore};
use crate::value::PropertyValue;
use crate::virtuals::{VirtualHandler, VirtualRegistry, VirtualRequest, VirtualState};

/// In-memory, schema-validated store of every property of a graph of
/// objects.
///
/// Single-threaded: every mutating operation, including reads that retain a
/// computed value, takes `&mut self`. Share an instance across threads by
/// wrapping it in a lock.
///
/// A clone copies every cached value and shares the schema, virtual
/// handlers and hook slots with the original.
///
/// ```
/// use std::sync::Arc;
/// use cellar_cache::PropertyCache;
/// use cellar_schema::InMemorySchema;
/// use cellar_types::{FieldId, ObjectHandle, ValueKind};
///
/// let schema = InMemorySchema::builder()
///     .class(1, "LexEntry")
///     .field(1002, "HomographNumber", 1, ValueKind::Integer)
///     .build()
///     .unwrap();
/// let mut cache = PropertyCache::new(Arc::new(schema));
/// let entry = ObjectHandle::new(5);
/// let class_field = cache.system_fields().class;
///
/// cache.cache_int_prop(entry, class_field, 1).unwrap();
/// cache.cache_int_prop(entry, FieldId::new(1002), 3).unwrap();
/// assert_eq!(cache.get_int_prop(entry, FieldId::new(1002)).unwrap(), 3);
/// ```
#[derive(Clone)]
pub struct PropertyCache {
    config: CacheConfig,
    schema: Option<Arc<dyn SchemaProvider>>,
    pub(crate) store: PropertyStore,
    guids: GuidIndex,
    pub(crate) dirty: DirtyTracker,
    pub(crate) handles: HandleAllocator,
    virtuals: VirtualRegistry,
    hooks: HookSlots,
}

impl PropertyCache {
    /// Cache backed by `schema` with the default configuration.
    pub fn new(schema: Arc<dyn SchemaProvider>) -> Self {
        Self::build(Some(schema), CacheConfig::default())
    }

    /// Cache with an explicit configuration; the schema may be attached later.
    pub fn with_config(
        schema: Option<Arc<dyn SchemaProvider>>,
        config: CacheConfig,
    ) -> CacheResult<Self> {
        config.validate()?;
        Ok(Self::build(schema, config))
    }

    /// Cache with no schema. Only class-identity caching works until
    /// [`set_schema`](Self::set_schema) is called.
    pub fn without_schema() -> Self {
        Self::build(None, CacheConfig::default())
    }

    fn build(schema: Option<Arc<dyn SchemaProvider>>, config: CacheConfig) -> Self {
        Self {
            handles: HandleAllocator::new(config.first_handle),
            config,
            schema,
            store: PropertyStore::new(),
            guids: GuidIndex::new(),
            dirty: DirtyTracker::new(),
            virtuals: VirtualRegistry::new(),
            hooks: HookSlots::new(),
        }
    }

    pub fn set_schema(&mut self, schema: Arc<dyn SchemaProvider>) {
        self.schema = Some(schema);
    }

    pub fn schema(&self) -> Option<&Arc<dyn SchemaProvider>> {
        self.schema.as_ref()
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn system_fields(&self) -> &SystemFields {
        &self.config.system_fields
    }

    // ------------------------------------------------------------------
    // Validation
    // ------------------------------------------------------------------

    pub(crate) fn schema_ref(&self) -> CacheResult<&Arc<dyn SchemaProvider>> {
        self.schema.as_ref().ok_or(CacheError::MissingSchema)
    }

    /// Cached class of `handle`, if its identity was ever cached.
    pub(crate) fn cached_class(&self, handle: ObjectHandle) -> Option<ClassId> {
        if handle.is_null() {
            return None;
        }
        self.store
            .get(&PropertyKey::new(handle, self.config.system_fields.class))
            .and_then(PropertyValue::as_integer)
            .and_then(|raw| u32::try_from(raw).ok())
            .map(ClassId::new)
    }

    /// Ensure `handle` names an existing object.
    pub(crate) fn require_object(&self, handle: ObjectHandle) -> CacheResult<ClassId> {
        self.cached_class(handle)
            .ok_or(CacheError::InvalidHandle(handle))
    }

    /// Validate `(handle, field)` for a value living in `store`, returning
    /// the field's declared kind.
    pub(crate) fn check_property(
        &self,
        handle: ObjectHandle,
        field: FieldId,
        store: StoreKind,
    ) -> CacheResult<ValueKind> {
        let class = self.require_object(handle)?;
        let schema = self.schema_ref()?;
        let kind = schema
            .field_type(field)
            .ok_or_else(|| CacheError::violation(handle, field, "unknown field"))?;
        if !schema.is_valid_class(field, class) {
            return Err(CacheError::violation(
                handle,
                field,
                format!("not a field of {class}"),
            ));
        }
        if kind.store_kind() != store {
            return Err(CacheError::violation(
                handle,
                field,
                format!("field holds {kind}, not {store}"),
            ));
        }
        Ok(kind)
    }

    /// Validate `(handle, field, language)` for a multilingual alternative.
    pub(crate) fn check_alternative(
        &self,
        handle: ObjectHandle,
        field: FieldId,
        language: LanguageId,
    ) -> CacheResult<ValueKind> {
        let kind = self.check_property(handle, field, StoreKind::MultiString)?;
        if !language.is_valid() {
            return Err(CacheError::InvalidLanguage(language));
        }
        Ok(kind)
    }

    /// An alternative's text must be written in the language it is stored
    /// under; for multi-run text that is the language of the first run.
    pub(crate) fn check_text_language(
        &self,
        handle: ObjectHandle,
        field: FieldId,
        language: LanguageId,
        text: &RichText,
    ) -> CacheResult<()> {
        if text.language() != language {
            return Err(CacheError::violation(
                handle,
                field,
                format!("text in {} offered as the {language} alternative", text.language()),
            ));
        }
        Ok(())
    }

    /// Fields whose values only the cache itself maintains.
    pub(crate) fn is_maintained_field(&self, field: FieldId) -> bool {
        let system = &self.config.system_fields;
        field == system.class
            || field == system.owner
            || field == system.owning_field
            || field == system.ordinal
    }

    // ------------------------------------------------------------------
    // Generic write paths
    // ------------------------------------------------------------------

    /// Store `value` under `(handle, field)` without marking the object dirty.
    ///
    /// This is the load path. Values are stored as given; on owning fields
    /// the members' ownership facts are rewritten to match, and members
    /// dropped from the property are orphaned. Members whose class is not
    /// cached yet are adopted later by [`reindex_owned`](Self::reindex_owned).
    pub fn cache_value(
        &mut self,
        handle: ObjectHandle,
        field: FieldId,
        value: PropertyValue,
    ) -> CacheResult<()> {
        if field == self.config.system_fields.class {
            return match value {
                PropertyValue::Integer(class) => self.cache_class(handle, class),
                other => Err(CacheError::violation(
                    handle,
                    field,
                    format!("class identity must be an integer, got {}", other.store_kind()),
                )),
            };
        }
        let kind = self.check_property(handle, field, value.store_kind())?;
        self.store_loaded(handle, field, kind, value)
    }

    /// Bring `handle` into existence as an instance of `class`.
    ///
    /// The only operation accepted without a schema provider.
    pub(crate) fn cache_class(&mut self, handle: ObjectHandle, class: i32) -> CacheResult<()> {
        let field = self.config.system_fields.class;
        if handle.is_null() {
            return Err(CacheError::InvalidHandle(handle));
        }
        let class_id = u32::try_from(class)
            .ok()
            .filter(|raw| *raw != 0)
            .map(ClassId::new)
            .ok_or_else(|| CacheError::violation(handle, field, format!("invalid class id {class}")))?;
        if let Some(schema) = &self.schema {
            if !schema.is_known_class(class_id) {
                return Err(CacheError::violation(
                    handle,
                    field,
                    format!("unknown {class_id}"),
                ));
            }
        }
        self.store
            .insert(PropertyKey::new(handle, field), PropertyValue::Integer(class));
        self.handles.observe(handle);
        Ok(())
    }

    /// Store a validated value of a field of `kind`, routing owning values
    /// through the ownership tracker.
    pub(crate) fn store_loaded(
        &mut self,
        handle: ObjectHandle,
        field: FieldId,
        kind: ValueKind,
        value: PropertyValue,
    ) -> CacheResult<()> {
        if kind.is_owning() {
            return self.store_owned(handle, field, value);
        }
        self.write(handle, field, value);
        Ok(())
    }

    /// Store a validated value, keeping the GUID index in step with the
    /// identity field.
    pub(crate) fn write(&mut self, handle: ObjectHandle, field: FieldId, value: PropertyValue) {
        if field == self.config.system_fields.guid {
            if let PropertyValue::Guid(guid) = &value {
                self.guids.register(handle, *guid);
            }
        }
        self.store.insert(PropertyKey::new(handle, field), value);
    }

    /// Validate, write, and mark `handle` dirty.
    ///
    /// Sequence values replace the whole sequence through
    /// [`replace`](Self::replace); object values on owning-atomic fields
    /// re-parent the target. Ownership facts and the class identity cannot
    /// be set directly.
    pub fn set_value(
        &mut self,
        handle: ObjectHandle,
        field: FieldId,
        value: PropertyValue,
    ) -> CacheResult<()> {
        if self.is_maintained_field(field) {
            return Err(CacheError::Unsupported(format!(
                "{field} is maintained by the cache and cannot be set"
            )));
        }
        let kind = self.check_property(handle, field, value.store_kind())?;
        match value {
            PropertyValue::Sequence(items) => self.replace(handle, field, 0, usize::MAX, &items),
            PropertyValue::Object(target) if kind.is_owning() => {
                self.set_owning_atomic(handle, field, target)
            }
            PropertyValue::Object(target) => {
                if !target.is_null() {
                    self.require_object(target)?;
                }
                self.write(handle, field, PropertyValue::Object(target));
                self.dirty.touch(handle);
                Ok(())
            }
            value => {
                self.write(handle, field, value);
                self.dirty.touch(handle);
                Ok(())
            }
        }
    }

    // ------------------------------------------------------------------
    // Generic read path
    // ------------------------------------------------------------------

    /// Read `(handle, field)` from `store`, consulting the virtual resolver
    /// on a miss.
    ///
    /// An unbound sequence miss yields an empty sequence; any other unbound
    /// miss is [`CacheError::NotFound`].
    pub fn resolve(
        &mut self,
        handle: ObjectHandle,
        field: FieldId,
        store: StoreKind,
    ) -> CacheResult<PropertyValue> {
        let kind = self.check_property(handle, field, store)?;
        let key = PropertyKey::new(handle, field);
        let request = VirtualRequest {
            handle,
            field,
            language: None,
        };
        match self.virtuals.state(field) {
            VirtualState::ComputeEveryTime => self.compute(&request, kind),
            state => {
                if let Some(value) = self.store.get(&key) {
                    return Ok(value.clone());
                }
                match state {
                    VirtualState::ComputeOnce => {
                        let value = self.compute(&request, kind)?;
                        self.store_loaded(handle, field, kind, value.clone())?;
                        Ok(value)
                    }
                    _ if store == StoreKind::Sequence => Ok(PropertyValue::Sequence(Vec::new())),
                    _ => Err(CacheError::NotFound { handle, field }),
                }
            }
        }
    }

    /// Read one language alternative of a multilingual field.
    ///
    /// A miss on a field not bound compute-every-time yields an empty text
    /// in `language`, stored when `cache_multilingual_fallback` is set.
    /// Compute-once handlers are not consulted on this path.
    pub fn resolve_alternative(
        &mut self,
        handle: ObjectHandle,
        field: FieldId,
        language: LanguageId,
    ) -> CacheResult<RichText> {
        let kind = self.check_alternative(handle, field, language)?;
        let key = AlternativeKey::new(handle, field, language);
        if self.virtuals.state(field) == VirtualState::ComputeEveryTime {
            let request = VirtualRequest {
                handle,
                field,
                language: Some(language),
            };
            return match self.compute(&request, kind)? {
                PropertyValue::String(text) => {
                    self.check_text_language(handle, field, language, &text)?;
                    Ok(text)
                }
                other => Err(CacheError::violation(
                    handle,
                    field,
                    format!("computed {} for a multilingual field", other.store_kind()),
                )),
            };
        }
        if let Some(text) = self.store.alternative(&key) {
            return Ok(text.clone());
        }
        let empty = RichText::empty(language);
        if self.config.cache_multilingual_fallback {
            self.store.insert_alternative(key, empty.clone());
        }
        Ok(empty)
    }

    fn compute(&self, request: &VirtualRequest, kind: ValueKind) -> CacheResult<PropertyValue> {
        let handler = self
            .virtuals
            .get(request.field)
            .cloned()
            .ok_or(CacheError::NotFound {
                handle: request.handle,
                field: request.field,
            })?;
        let value = handler.compute(self, request)?;
        if !value.fits(kind) {
            return Err(CacheError::violation(
                request.handle,
                request.field,
                format!("computed {} for a {kind} field", value.store_kind()),
            ));
        }
        debug!(handle = %request.handle, field = %request.field, "virtual property computed");
        Ok(value)
    }

    /// Stored value of `(handle, field)`, without validation or resolution.
    pub fn peek(&self, handle: ObjectHandle, field: FieldId) -> Option<&PropertyValue> {
        self.store.get(&PropertyKey::new(handle, field))
    }

    /// Stored alternative, without validation or fallback.
    pub fn peek_alternative(
        &self,
        handle: ObjectHandle,
        field: FieldId,
        language: LanguageId,
    ) -> Option<&RichText> {
        self.store
            .alternative(&AlternativeKey::new(handle, field, language))
    }

    /// Whether a value of `kind` is stored for the key. Never validates and
    /// never resolves. Multilingual lookups need a `language`.
    pub fn is_prop_in_cache(
        &self,
        handle: ObjectHandle,
        field: FieldId,
        kind: StoreKind,
        language: Option<LanguageId>,
    ) -> bool {
        match (kind, language) {
            (StoreKind::MultiString, Some(language)) => self
                .store
                .contains_alternative(&AlternativeKey::new(handle, field, language)),
            (StoreKind::MultiString, None) => false,
            (kind, _) => self
                .peek(handle, field)
                .is_some_and(|value| value.store_kind() == kind),
        }
    }

    /// Stored single-valued properties of `handle`, ordered by field.
    pub fn properties_of(&self, handle: ObjectHandle) -> Vec<(FieldId, &PropertyValue)> {
        self.store.entries_of(handle)
    }

    /// Stored multilingual alternatives of `handle`.
    pub fn alternatives_of(&self, handle: ObjectHandle) -> Vec<(FieldId, LanguageId, &RichText)> {
        self.store.alternatives_of(handle)
    }

    // ------------------------------------------------------------------
    // GUID index
    // ------------------------------------------------------------------

    /// Handle whose identity GUID is `guid`.
    pub fn object_from_guid(&self, guid: &ObjectGuid) -> CacheResult<ObjectHandle> {
        self.guids
            .lookup(guid)
            .ok_or(CacheError::GuidNotFound(*guid))
    }

    /// Drop the index entry established by `handle`'s own identity GUID.
    ///
    /// Entries of other handles are never touched, even when a GUID stored
    /// on `handle` under another field equals theirs.
    pub fn remove_object_references(&mut self, handle: ObjectHandle) -> Option<ObjectGuid> {
        let removed = self.guids.remove_handle(handle);
        if let Some(guid) = &removed {
            debug!(%handle, %guid, "identity guid unregistered");
        }
        removed
    }

    // ------------------------------------------------------------------
    // Dirty tracking
    // ------------------------------------------------------------------

    pub fn is_dirty(&self) -> bool {
        self.dirty.is_dirty()
    }

    pub fn clear_dirty(&mut self) {
        self.dirty.clear_dirty();
    }

    /// Record a modification of `handle` now.
    pub fn touch(&mut self, handle: ObjectHandle) {
        self.dirty.touch(handle);
    }

    pub fn last_modified(&self, handle: ObjectHandle) -> Option<DateTime<Utc>> {
        self.dirty.last_modified(handle)
    }

    // ------------------------------------------------------------------
    // Virtual bindings
    // ------------------------------------------------------------------

    /// Bind a computed-property handler to `field`, replacing any previous
    /// binding. The schema must know the field; system fields cannot be
    /// virtual.
    pub fn install_virtual(
        &mut self,
        field: FieldId,
        handler: Arc<dyn VirtualHandler>,
    ) -> CacheResult<()> {
        if self.config.system_fields.contains(field) {
            return Err(CacheError::Unsupported(format!(
                "system {field} cannot be computed"
            )));
        }
        if self.schema_ref()?.field_type(field).is_none() {
            return Err(CacheError::violation(ObjectHandle::NULL, field, "unknown field"));
        }
        let mode = handler.mode();
        self.virtuals.install(field, handler);
        debug!(%field, ?mode, "virtual handler installed");
        Ok(())
    }

    /// Unbind `field`. Returns `true` if a handler was installed.
    pub fn remove_virtual(&mut self, field: FieldId) -> bool {
        self.virtuals.remove(field).is_some()
    }

    pub fn virtual_state(&self, field: FieldId) -> VirtualState {
        self.virtuals.state(field)
    }

    // ------------------------------------------------------------------
    // Hook slots
    // ------------------------------------------------------------------

    pub fn action_handler(&self) -> Option<Arc<dyn ActionHandler>> {
        self.hooks.action_handler()
    }

    pub fn set_action_handler(&mut self, handler: Option<Arc<dyn ActionHandler>>) {
        self.hooks.set_action_handler(handler);
    }

    pub fn add_listener(&mut self, listener: Arc<dyn ChangeListener>) {
        self.hooks.add_listener(listener);
    }

    pub fn remove_listener(&mut self, listener: &Arc<dyn ChangeListener>) -> bool {
        self.hooks.remove_listener(listener)
    }

    pub fn listener_count(&self) -> usize {
        self.hooks.listeners().len()
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Drop every cached value, the GUID index, and dirty state.
    ///
    /// Schema, configuration, virtual bindings and hook slots are kept, and
    /// the handle allocator is not rewound.
    pub fn clear_all_data(&mut self) {
        let objects = self.object_count();
        self.store.clear();
        self.guids.clear();
        self.dirty.reset();
        debug!(objects, "cache cleared");
    }

    /// Number of objects whose class identity is cached.
    pub fn object_count(&self) -> usize {
        self.handles().len()
    }

    /// Handles of every existing object, ascending.
    pub fn handles(&self) -> Vec<ObjectHandle> {
        self.store.handles_with(self.config.system_fields.class)
    }

    /// Handle the next [`make_new_object`](Self::make_new_object) will issue.
    pub fn next_handle(&self) -> ObjectHandle {
        self.handles.peek()
    }
}

impl std::fmt::Debug for PropertyCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropertyCache")
            .field("has_schema", &self.schema.is_some())
            .field("store", &self.store)
            .field("guid_count", &self.guids.len())
            .field("dirty", &self.dirty.is_dirty())
            .field("virtuals", &self.virtuals)
            .field("hooks", &self.hooks)
            .finish()
    }
}
