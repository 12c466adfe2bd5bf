//! Keyed property storage.
//!
//! [`PropertyStore`] is a pure key-value layer: it never validates keys
//! against a schema and never interprets values. All checks happen in the
//! cache before a store method is called.

use std::collections::HashMap;

use cellar_types::{FieldId, LanguageId, ObjectHandle, RichText};

use crate::value::PropertyValue;

/// Key of a single-valued property.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PropertyKey {
    pub handle: ObjectHandle,
    pub field: FieldId,
}

impl PropertyKey {
    pub fn new(handle: ObjectHandle, field: FieldId) -> Self {
        Self { handle, field }
    }
}

/// Key of one language alternative of a multilingual property.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AlternativeKey {
    pub handle: ObjectHandle,
    pub field: FieldId,
    pub language: LanguageId,
}

impl AlternativeKey {
    pub fn new(handle: ObjectHandle, field: FieldId, language: LanguageId) -> Self {
        Self {
            handle,
            field,
            language,
        }
    }
}

/// HashMap-backed storage for single-valued properties and multilingual
/// alternatives. Values are cloned in and out.
#[derive(Default, Clone)]
pub struct PropertyStore {
    values: HashMap<PropertyKey, PropertyValue>,
    alternatives: HashMap<AlternativeKey, RichText>,
}

impl PropertyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &PropertyKey) -> Option<&PropertyValue> {
        self.values.get(key)
    }

    /// Insert or overwrite; returns the previous value.
    pub fn insert(&mut self, key: PropertyKey, value: PropertyValue) -> Option<PropertyValue> {
        self.values.insert(key, value)
    }

    pub fn remove(&mut self, key: &PropertyKey) -> Option<PropertyValue> {
        self.values.remove(key)
    }

    pub fn contains(&self, key: &PropertyKey) -> bool {
        self.values.contains_key(key)
    }

    pub fn alternative(&self, key: &AlternativeKey) -> Option<&RichText> {
        self.alternatives.get(key)
    }

    pub fn insert_alternative(&mut self, key: AlternativeKey, text: RichText) -> Option<RichText> {
        self.alternatives.insert(key, text)
    }

    pub fn contains_alternative(&self, key: &AlternativeKey) -> bool {
        self.alternatives.contains_key(key)
    }

    /// Number of single-valued entries.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Number of multilingual alternatives.
    pub fn alternative_count(&self) -> usize {
        self.alternatives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.alternatives.is_empty()
    }

    /// Remove everything.
    pub fn clear(&mut self) {
        self.values.clear();
        self.alternatives.clear();
    }

    /// All single-valued entries, in key order.
    pub fn entries(&self) -> Vec<(PropertyKey, &PropertyValue)> {
        let mut entries: Vec<_> = self.values.iter().map(|(k, v)| (*k, v)).collect();
        entries.sort_by_key(|(k, _)| *k);
        entries
    }

    /// Single-valued entries of one object, ordered by field.
    pub fn entries_of(&self, handle: ObjectHandle) -> Vec<(FieldId, &PropertyValue)> {
        let mut entries: Vec<_> = self
            .values
            .iter()
            .filter(|(k, _)| k.handle == handle)
            .map(|(k, v)| (k.field, v))
            .collect();
        entries.sort_by_key(|(field, _)| *field);
        entries
    }

    /// Alternatives of one object, ordered by field then language.
    pub fn alternatives_of(&self, handle: ObjectHandle) -> Vec<(FieldId, LanguageId, &RichText)> {
        let mut entries: Vec<_> = self
            .alternatives
            .iter()
            .filter(|(k, _)| k.handle == handle)
            .map(|(k, v)| (k.field, k.language, v))
            .collect();
        entries.sort_by_key(|(field, language, _)| (*field, *language));
        entries
    }

    /// Handles that have a value under `field`, sorted.
    pub fn handles_with(&self, field: FieldId) -> Vec<ObjectHandle> {
        let mut handles: Vec<_> = self
            .values
            .keys()
            .filter(|k| k.field == field)
            .map(|k| k.handle)
            .collect();
        handles.sort();
        handles
    }
}

impl std::fmt::Debug for PropertyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropertyStore")
            .field("value_count", &self.values.len())
            .field("alternative_count", &self.alternatives.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(h: u32, f: u32) -> PropertyKey {
        PropertyKey::new(ObjectHandle::new(h), FieldId::new(f))
    }

    #[test]
    fn insert_and_get() {
        let mut store = PropertyStore::new();
        store.insert(key(1, 10), PropertyValue::Integer(7));
        assert_eq!(store.get(&key(1, 10)), Some(&PropertyValue::Integer(7)));
        assert!(store.get(&key(1, 11)).is_none());
    }

    #[test]
    fn insert_overwrites() {
        let mut store = PropertyStore::new();
        store.insert(key(1, 10), PropertyValue::Integer(7));
        let prev = store.insert(key(1, 10), PropertyValue::Integer(8));
        assert_eq!(prev, Some(PropertyValue::Integer(7)));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn alternatives_are_keyed_by_language() {
        let mut store = PropertyStore::new();
        let en = LanguageId::new(1);
        let fr = LanguageId::new(2);
        let h = ObjectHandle::new(1);
        let f = FieldId::new(5);
        store.insert_alternative(AlternativeKey::new(h, f, en), RichText::plain("dog", en));
        store.insert_alternative(AlternativeKey::new(h, f, fr), RichText::plain("chien", fr));
        assert_eq!(store.alternative_count(), 2);
        let alts = store.alternatives_of(h);
        assert_eq!(alts[0].2.text(), "dog");
        assert_eq!(alts[1].2.text(), "chien");
    }

    #[test]
    fn entries_are_sorted() {
        let mut store = PropertyStore::new();
        store.insert(key(2, 1), PropertyValue::Boolean(true));
        store.insert(key(1, 3), PropertyValue::Boolean(true));
        store.insert(key(1, 2), PropertyValue::Boolean(false));
        let keys: Vec<_> = store.entries().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec![key(1, 2), key(1, 3), key(2, 1)]);
        let fields: Vec<_> = store
            .entries_of(ObjectHandle::new(1))
            .into_iter()
            .map(|(f, _)| f.raw())
            .collect();
        assert_eq!(fields, vec![2, 3]);
    }

    #[test]
    fn handles_with_field() {
        let mut store = PropertyStore::new();
        store.insert(key(9, 101), PropertyValue::Integer(1));
        store.insert(key(3, 101), PropertyValue::Integer(1));
        store.insert(key(4, 102), PropertyValue::Integer(1));
        assert_eq!(
            store.handles_with(FieldId::new(101)),
            vec![ObjectHandle::new(3), ObjectHandle::new(9)]
        );
    }

    #[test]
    fn clear_removes_all() {
        let mut store = PropertyStore::new();
        store.insert(key(1, 1), PropertyValue::Integer(1));
        let en = LanguageId::new(1);
        store.insert_alternative(
            AlternativeKey::new(ObjectHandle::new(1), FieldId::new(2), en),
            RichText::empty(en),
        );
        store.clear();
        assert!(store.is_empty());
    }

    #[test]
    fn debug_format() {
        let store = PropertyStore::new();
        let debug = format!("{store:?}");
        assert!(debug.contains("PropertyStore"));
        assert!(debug.contains("value_count"));
    }
}
