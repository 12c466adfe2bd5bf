//! Typed `cache_*`, `get_*` and `set_*` operations per value kind, plus
//! sequence queries and ownership shortcuts.
//!
//! Every method here funnels into the generic paths on
//! [`PropertyCache`]; the typed surface only fixes the store kind and
//! unwraps the value.

use std::sync::Arc;

use cellar_types::{ClassId, FieldId, LanguageId, ObjectGuid, ObjectHandle, RichText, StoreKind};

use crate::cache::PropertyCache;
use crate::error::{CacheError, CacheResult};
use crate::store::AlternativeKey;
use crate::value::{OpaqueValue, PropertyValue};

fn check_length(declared: usize, actual: usize) -> CacheResult<()> {
    if declared != actual {
        return Err(CacheError::LengthMismatch { declared, actual });
    }
    Ok(())
}

/// Unwraps a resolved value whose variant the resolver already guaranteed.
macro_rules! expect_variant {
    ($value:expr, $variant:ident, $handle:expr, $field:expr) => {
        match $value {
            PropertyValue::$variant(inner) => Ok(inner),
            other => Err(CacheError::violation(
                $handle,
                $field,
                format!("stored {} where {} expected", other.store_kind(), stringify!($variant)),
            )),
        }
    };
}

impl PropertyCache {
    // -- boolean ---------------------------------------------------------

    pub fn cache_boolean_prop(&mut self, handle: ObjectHandle, field: FieldId, value: bool) -> CacheResult<()> {
        self.cache_value(handle, field, PropertyValue::Boolean(value))
    }

    pub fn get_boolean_prop(&mut self, handle: ObjectHandle, field: FieldId) -> CacheResult<bool> {
        let value = self.resolve(handle, field, StoreKind::Boolean)?;
        expect_variant!(value, Boolean, handle, field)
    }

    pub fn set_boolean(&mut self, handle: ObjectHandle, field: FieldId, value: bool) -> CacheResult<()> {
        self.set_value(handle, field, PropertyValue::Boolean(value))
    }

    // -- 32-bit integer --------------------------------------------------

    /// Cache an integer. On the class-identity field this creates the object.
    pub fn cache_int_prop(&mut self, handle: ObjectHandle, field: FieldId, value: i32) -> CacheResult<()> {
        self.cache_value(handle, field, PropertyValue::Integer(value))
    }

    pub fn get_int_prop(&mut self, handle: ObjectHandle, field: FieldId) -> CacheResult<i32> {
        let value = self.resolve(handle, field, StoreKind::Integer)?;
        expect_variant!(value, Integer, handle, field)
    }

    pub fn set_integer(&mut self, handle: ObjectHandle, field: FieldId, value: i32) -> CacheResult<()> {
        self.set_value(handle, field, PropertyValue::Integer(value))
    }

    // -- 64-bit integer and time ----------------------------------------

    pub fn cache_int64_prop(&mut self, handle: ObjectHandle, field: FieldId, value: i64) -> CacheResult<()> {
        self.cache_value(handle, field, PropertyValue::Int64(value))
    }

    pub fn get_int64_prop(&mut self, handle: ObjectHandle, field: FieldId) -> CacheResult<i64> {
        let value = self.resolve(handle, field, StoreKind::Int64)?;
        expect_variant!(value, Int64, handle, field)
    }

    pub fn set_int64(&mut self, handle: ObjectHandle, field: FieldId, value: i64) -> CacheResult<()> {
        self.set_value(handle, field, PropertyValue::Int64(value))
    }

    /// Time values share the 64-bit store.
    pub fn cache_time_prop(&mut self, handle: ObjectHandle, field: FieldId, value: i64) -> CacheResult<()> {
        self.cache_int64_prop(handle, field, value)
    }

    pub fn get_time_prop(&mut self, handle: ObjectHandle, field: FieldId) -> CacheResult<i64> {
        self.get_int64_prop(handle, field)
    }

    pub fn set_time(&mut self, handle: ObjectHandle, field: FieldId, value: i64) -> CacheResult<()> {
        self.set_int64(handle, field, value)
    }

    // -- guid -------------------------------------------------------------

    /// Cache a GUID. Only the identity field updates the GUID index.
    pub fn cache_guid_prop(&mut self, handle: ObjectHandle, field: FieldId, value: ObjectGuid) -> CacheResult<()> {
        self.cache_value(handle, field, PropertyValue::Guid(value))
    }

    pub fn get_guid_prop(&mut self, handle: ObjectHandle, field: FieldId) -> CacheResult<ObjectGuid> {
        let value = self.resolve(handle, field, StoreKind::Guid)?;
        expect_variant!(value, Guid, handle, field)
    }

    pub fn set_guid(&mut self, handle: ObjectHandle, field: FieldId, value: ObjectGuid) -> CacheResult<()> {
        self.set_value(handle, field, PropertyValue::Guid(value))
    }

    // -- binary -----------------------------------------------------------

    pub fn cache_binary_prop(&mut self, handle: ObjectHandle, field: FieldId, bytes: &[u8]) -> CacheResult<()> {
        self.cache_value(handle, field, PropertyValue::Binary(bytes.to_vec()))
    }

    /// Like [`cache_binary_prop`](Self::cache_binary_prop), failing with
    /// [`CacheError::LengthMismatch`] unless `declared_len` is the byte count.
    pub fn cache_binary_prop_checked(
        &mut self,
        handle: ObjectHandle,
        field: FieldId,
        bytes: &[u8],
        declared_len: usize,
    ) -> CacheResult<()> {
        check_length(declared_len, bytes.len())?;
        self.cache_binary_prop(handle, field, bytes)
    }

    pub fn get_binary_prop(&mut self, handle: ObjectHandle, field: FieldId) -> CacheResult<Vec<u8>> {
        let value = self.resolve(handle, field, StoreKind::Binary)?;
        expect_variant!(value, Binary, handle, field)
    }

    pub fn set_binary(&mut self, handle: ObjectHandle, field: FieldId, bytes: &[u8]) -> CacheResult<()> {
        self.set_value(handle, field, PropertyValue::Binary(bytes.to_vec()))
    }

    // -- unicode ----------------------------------------------------------

    pub fn cache_unicode_prop(&mut self, handle: ObjectHandle, field: FieldId, text: &str) -> CacheResult<()> {
        self.cache_value(handle, field, PropertyValue::Unicode(text.to_owned()))
    }

    /// Like [`cache_unicode_prop`](Self::cache_unicode_prop), with
    /// `declared_len` counted in characters.
    pub fn cache_unicode_prop_checked(
        &mut self,
        handle: ObjectHandle,
        field: FieldId,
        text: &str,
        declared_len: usize,
    ) -> CacheResult<()> {
        check_length(declared_len, text.chars().count())?;
        self.cache_unicode_prop(handle, field, text)
    }

    pub fn get_unicode_prop(&mut self, handle: ObjectHandle, field: FieldId) -> CacheResult<String> {
        let value = self.resolve(handle, field, StoreKind::Unicode)?;
        expect_variant!(value, Unicode, handle, field)
    }

    pub fn set_unicode(&mut self, handle: ObjectHandle, field: FieldId, text: &str) -> CacheResult<()> {
        self.set_value(handle, field, PropertyValue::Unicode(text.to_owned()))
    }

    // -- rich string ------------------------------------------------------

    pub fn cache_string_prop(&mut self, handle: ObjectHandle, field: FieldId, text: RichText) -> CacheResult<()> {
        self.cache_value(handle, field, PropertyValue::String(text))
    }

    /// Cache a single-run rich string built from plain `text`, checking
    /// `declared_len` (characters) first.
    pub fn cache_string_fields(
        &mut self,
        handle: ObjectHandle,
        field: FieldId,
        text: &str,
        declared_len: usize,
        language: LanguageId,
    ) -> CacheResult<()> {
        self.check_property(handle, field, StoreKind::String)?;
        check_length(declared_len, text.chars().count())?;
        if !language.is_valid() {
            return Err(CacheError::InvalidLanguage(language));
        }
        self.write(handle, field, PropertyValue::String(RichText::plain(text, language)));
        Ok(())
    }

    pub fn get_string_prop(&mut self, handle: ObjectHandle, field: FieldId) -> CacheResult<RichText> {
        let value = self.resolve(handle, field, StoreKind::String)?;
        expect_variant!(value, String, handle, field)
    }

    pub fn set_string(&mut self, handle: ObjectHandle, field: FieldId, text: RichText) -> CacheResult<()> {
        self.set_value(handle, field, PropertyValue::String(text))
    }

    // -- multilingual alternatives ---------------------------------------

    pub fn cache_multi_string_alt(
        &mut self,
        handle: ObjectHandle,
        field: FieldId,
        language: LanguageId,
        text: RichText,
    ) -> CacheResult<()> {
        self.check_alternative(handle, field, language)?;
        self.check_text_language(handle, field, language, &text)?;
        self.store
            .insert_alternative(AlternativeKey::new(handle, field, language), text);
        Ok(())
    }

    /// Read one alternative; a miss yields an empty text in `language`.
    pub fn get_multi_string_alt(
        &mut self,
        handle: ObjectHandle,
        field: FieldId,
        language: LanguageId,
    ) -> CacheResult<RichText> {
        self.resolve_alternative(handle, field, language)
    }

    pub fn set_multi_string_alt(
        &mut self,
        handle: ObjectHandle,
        field: FieldId,
        language: LanguageId,
        text: RichText,
    ) -> CacheResult<()> {
        self.cache_multi_string_alt(handle, field, language, text)?;
        self.dirty.touch(handle);
        Ok(())
    }

    // -- object reference ------------------------------------------------

    /// Cache an atomic reference as given. On an owning field the target is
    /// adopted and any previous target orphaned.
    pub fn cache_obj_prop(&mut self, handle: ObjectHandle, field: FieldId, target: ObjectHandle) -> CacheResult<()> {
        self.cache_value(handle, field, PropertyValue::Object(target))
    }

    pub fn get_obj_prop(&mut self, handle: ObjectHandle, field: FieldId) -> CacheResult<ObjectHandle> {
        let value = self.resolve(handle, field, StoreKind::Object)?;
        expect_variant!(value, Object, handle, field)
    }

    /// Set an atomic reference. On an owning field the new target is
    /// re-parented and the previous one orphaned.
    pub fn set_object(&mut self, handle: ObjectHandle, field: FieldId, target: ObjectHandle) -> CacheResult<()> {
        self.set_value(handle, field, PropertyValue::Object(target))
    }

    // -- object sequence -------------------------------------------------

    /// Cache a whole sequence, replacing any previous one. On an owning
    /// field every existing member's ordinal is set to its position and
    /// members no longer listed are orphaned.
    pub fn cache_vec_prop(&mut self, handle: ObjectHandle, field: FieldId, items: &[ObjectHandle]) -> CacheResult<()> {
        self.cache_value(handle, field, PropertyValue::Sequence(items.to_vec()))
    }

    /// Copy of the whole sequence.
    pub fn vec_prop(&mut self, handle: ObjectHandle, field: FieldId) -> CacheResult<Vec<ObjectHandle>> {
        let value = self.resolve(handle, field, StoreKind::Sequence)?;
        expect_variant!(value, Sequence, handle, field)
    }

    pub fn vec_size(&mut self, handle: ObjectHandle, field: FieldId) -> CacheResult<usize> {
        Ok(self.vec_prop(handle, field)?.len())
    }

    pub fn vec_item(&mut self, handle: ObjectHandle, field: FieldId, index: usize) -> CacheResult<ObjectHandle> {
        let items = self.vec_prop(handle, field)?;
        items.get(index).copied().ok_or(CacheError::IndexOutOfRange {
            index,
            len: items.len(),
        })
    }

    /// Position of `target` in the sequence.
    pub fn object_index(&mut self, owner: ObjectHandle, field: FieldId, target: ObjectHandle) -> CacheResult<usize> {
        self.vec_prop(owner, field)?
            .iter()
            .position(|h| *h == target)
            .ok_or(CacheError::NotFound {
                handle: target,
                field,
            })
    }

    // -- opaque -----------------------------------------------------------

    pub fn cache_opaque_prop(
        &mut self,
        handle: ObjectHandle,
        field: FieldId,
        value: Arc<dyn OpaqueValue>,
    ) -> CacheResult<()> {
        self.cache_value(handle, field, PropertyValue::Opaque(value))
    }

    pub fn get_opaque_prop(&mut self, handle: ObjectHandle, field: FieldId) -> CacheResult<Arc<dyn OpaqueValue>> {
        let value = self.resolve(handle, field, StoreKind::Opaque)?;
        expect_variant!(value, Opaque, handle, field)
    }

    pub fn set_opaque(&mut self, handle: ObjectHandle, field: FieldId, value: Arc<dyn OpaqueValue>) -> CacheResult<()> {
        self.set_value(handle, field, PropertyValue::Opaque(value))
    }

    // -- object facts -----------------------------------------------------

    pub fn class_of(&self, handle: ObjectHandle) -> CacheResult<ClassId> {
        self.require_object(handle)
    }

    /// Owner of `handle`, or `None` when it is unowned.
    pub fn owner_of(&self, handle: ObjectHandle) -> CacheResult<Option<ObjectHandle>> {
        self.require_object(handle)?;
        Ok(self
            .peek(handle, self.system_fields().owner)
            .and_then(PropertyValue::as_object)
            .filter(|owner| !owner.is_null()))
    }

    pub fn owning_field_of(&self, handle: ObjectHandle) -> CacheResult<Option<FieldId>> {
        self.require_object(handle)?;
        Ok(self
            .peek(handle, self.system_fields().owning_field)
            .and_then(PropertyValue::as_integer)
            .and_then(|raw| u32::try_from(raw).ok())
            .map(FieldId::new))
    }

    /// Position of `handle` in its owner's sequence.
    pub fn ordinal_of(&self, handle: ObjectHandle) -> CacheResult<Option<usize>> {
        self.require_object(handle)?;
        Ok(self
            .peek(handle, self.system_fields().ordinal)
            .and_then(PropertyValue::as_integer)
            .and_then(|raw| usize::try_from(raw).ok()))
    }
}
