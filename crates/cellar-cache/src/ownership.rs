//! Sequence splicing and ownership upkeep.
//!
//! An owned object carries three facts under the system fields: its owner,
//! the owning field, and (inside owning vectors) its ordinal. [`replace`]
//! is the single sequence-mutation primitive and keeps those facts equal to
//! the literal contents of the owner's sequence.
//!
//! [`replace`]: PropertyCache::replace

use std::collections::HashSet;
use std::fmt;

use cellar_types::{ClassId, FieldId, ObjectGuid, ObjectHandle, StoreKind, ValueKind};
use tracing::{debug, warn};

use crate::cache::PropertyCache;
use crate::error::{CacheError, CacheResult};
use crate::store::PropertyKey;
use crate::value::PropertyValue;

/// Hint selecting how [`PropertyCache::make_new_object`] links the new
/// object into its owner.
pub const APPEND_TO_COLLECTION: i32 = -1;
/// Hint for owning-atomic placement.
pub const SET_ATOMIC: i32 = -2;

/// A disagreement between an owning property and its members' facts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OwnershipViolation {
    /// Member of `owner`'s `field` whose recorded owner differs.
    WrongOwner {
        handle: ObjectHandle,
        expected: ObjectHandle,
        actual: Option<ObjectHandle>,
    },
    /// Member whose recorded owning field differs.
    WrongOwningField {
        handle: ObjectHandle,
        expected: FieldId,
        actual: Option<FieldId>,
    },
    /// Member of an owning vector whose ordinal is not its index.
    WrongOrdinal {
        handle: ObjectHandle,
        expected: usize,
        actual: Option<i32>,
    },
    /// Object claiming an owner whose property does not contain it.
    NotInOwner {
        handle: ObjectHandle,
        owner: ObjectHandle,
        field: Option<FieldId>,
    },
}

impl fmt::Display for OwnershipViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WrongOwner {
                handle,
                expected,
                actual,
            } => match actual {
                Some(actual) => write!(f, "{handle}: owner is {actual}, expected {expected}"),
                None => write!(f, "{handle}: no owner recorded, expected {expected}"),
            },
            Self::WrongOwningField {
                handle,
                expected,
                actual,
            } => match actual {
                Some(actual) => write!(f, "{handle}: owned through {actual}, expected {expected}"),
                None => write!(f, "{handle}: no owning field recorded, expected {expected}"),
            },
            Self::WrongOrdinal {
                handle,
                expected,
                actual,
            } => match actual {
                Some(actual) => write!(f, "{handle}: ordinal {actual}, expected {expected}"),
                None => write!(f, "{handle}: no ordinal recorded, expected {expected}"),
            },
            Self::NotInOwner {
                handle,
                owner,
                field,
            } => match field {
                Some(field) => write!(f, "{handle}: claims owner {owner} but is missing from its {field}"),
                None => write!(f, "{handle}: claims owner {owner} without an owning field"),
            },
        }
    }
}

/// Members of an owning value with their ordinals. Atomic values carry no
/// ordinal; a null target has no members.
fn members_of(value: &PropertyValue) -> Vec<(ObjectHandle, Option<usize>)> {
    match value {
        PropertyValue::Sequence(items) => items
            .iter()
            .enumerate()
            .map(|(i, h)| (*h, Some(i)))
            .collect(),
        PropertyValue::Object(target) if !target.is_null() => vec![(*target, None)],
        _ => Vec::new(),
    }
}

/// The owning-field record of a member is a 32-bit integer.
fn owning_field_code(owner: ObjectHandle, field: FieldId) -> CacheResult<i32> {
    i32::try_from(field.raw()).map_err(|_| {
        CacheError::violation(owner, field, "owning field id cannot be recorded on members")
    })
}

impl PropertyCache {
    /// Replace `[from, to)` of `owner`'s sequence `field` with `items`.
    ///
    /// Both bounds are clamped to the current length; `from > to` after
    /// clamping is [`CacheError::InvalidRange`]. On owning fields the
    /// inserted objects are adopted, removed ones orphaned, and every
    /// ordinal from `from` to the end rewritten. Inserting an object owned
    /// elsewhere is [`CacheError::Unsupported`].
    pub fn replace(
        &mut self,
        owner: ObjectHandle,
        field: FieldId,
        from: usize,
        to: usize,
        items: &[ObjectHandle],
    ) -> CacheResult<()> {
        let kind = self.check_property(owner, field, StoreKind::Sequence)?;
        for &item in items {
            self.require_object(item)?;
        }

        let mut sequence = self
            .peek(owner, field)
            .and_then(PropertyValue::as_sequence)
            .map(<[ObjectHandle]>::to_vec)
            .unwrap_or_default();
        let len = sequence.len();
        let (start, end) = (from.min(len), to.min(len));
        if start > end {
            return Err(CacheError::InvalidRange { from, to });
        }
        let removed: Vec<ObjectHandle> = sequence.splice(start..end, items.iter().copied()).collect();

        let field_code = if kind.is_owning() {
            let code = owning_field_code(owner, field)?;
            self.check_adoption(owner, field, items)?;
            let mut seen = HashSet::with_capacity(sequence.len());
            if let Some(dup) = sequence.iter().find(|h| !seen.insert(**h)) {
                return Err(CacheError::violation(
                    owner,
                    field,
                    format!("{dup} would appear twice in an owning sequence"),
                ));
            }
            if i32::try_from(sequence.len()).is_err() {
                return Err(CacheError::Unsupported(format!(
                    "owning sequence of {} items",
                    sequence.len()
                )));
            }
            Some(code)
        } else {
            None
        };

        let tail: Vec<ObjectHandle> = sequence[start..].to_vec();
        self.store
            .insert(PropertyKey::new(owner, field), PropertyValue::Sequence(sequence));

        if let Some(code) = field_code {
            let retained: HashSet<ObjectHandle> = items.iter().copied().collect();
            for handle in removed.iter().filter(|h| !retained.contains(h)) {
                self.orphan(*handle);
            }
            for (offset, handle) in tail.into_iter().enumerate() {
                self.adopt(handle, owner, code, Some(start + offset));
            }
        }
        self.dirty.touch(owner);
        debug!(
            %owner,
            %field,
            from = start,
            removed = removed.len(),
            inserted = items.len(),
            "sequence replaced"
        );
        Ok(())
    }

    /// Point owning-atomic `field` of `owner` at `target`, re-parenting the
    /// target and orphaning the previous value. `target` may be null.
    pub(crate) fn set_owning_atomic(
        &mut self,
        owner: ObjectHandle,
        field: FieldId,
        target: ObjectHandle,
    ) -> CacheResult<()> {
        let code = owning_field_code(owner, field)?;
        if !target.is_null() {
            self.require_object(target)?;
            self.check_adoption(owner, field, &[target])?;
        }
        let previous = self
            .peek(owner, field)
            .and_then(PropertyValue::as_object)
            .filter(|h| !h.is_null() && *h != target);
        self.store
            .insert(PropertyKey::new(owner, field), PropertyValue::Object(target));
        if let Some(previous) = previous {
            self.orphan(previous);
        }
        if !target.is_null() {
            self.adopt(target, owner, code, None);
        }
        self.dirty.touch(owner);
        debug!(%owner, %field, %target, "owning reference set");
        Ok(())
    }

    /// Reject adopting `items` into `(owner, field)` when any is the owner
    /// itself, one of its ancestors, or owned somewhere else.
    fn check_adoption(
        &self,
        owner: ObjectHandle,
        field: FieldId,
        items: &[ObjectHandle],
    ) -> CacheResult<()> {
        let ancestors = self.ancestors(owner);
        for &item in items {
            if item == owner || ancestors.contains(&item) {
                return Err(CacheError::violation(
                    owner,
                    field,
                    format!("{item} cannot own its own ancestor"),
                ));
            }
            if let Some((current_owner, current_field)) = self.ownership_of(item) {
                if (current_owner, current_field) != (owner, field) {
                    warn!(
                        handle = %item,
                        from = %current_owner,
                        to = %owner,
                        "cross-owner move rejected"
                    );
                    return Err(CacheError::Unsupported(format!(
                        "{item} is owned by {current_owner} through {current_field}; \
                         moving between owners is not supported"
                    )));
                }
            }
        }
        Ok(())
    }

    fn ancestors(&self, handle: ObjectHandle) -> HashSet<ObjectHandle> {
        let mut chain = HashSet::new();
        let mut current = handle;
        while let Some((owner, _)) = self.ownership_of(current) {
            if !chain.insert(owner) {
                break;
            }
            current = owner;
        }
        chain
    }

    /// Recorded `(owner, owning field)` of `handle`.
    pub fn ownership_of(&self, handle: ObjectHandle) -> Option<(ObjectHandle, FieldId)> {
        let system = self.system_fields();
        let owner = self
            .peek(handle, system.owner)
            .and_then(PropertyValue::as_object)
            .filter(|h| !h.is_null())?;
        let field = self
            .peek(handle, system.owning_field)
            .and_then(PropertyValue::as_integer)
            .and_then(|raw| u32::try_from(raw).ok())
            .map(FieldId::new)?;
        Some((owner, field))
    }

    /// Record `owner` and the owning field (as its `field_code`) on
    /// `handle`, and its ordinal when it sits in an owning vector.
    fn adopt(&mut self, handle: ObjectHandle, owner: ObjectHandle, field_code: i32, ordinal: Option<usize>) {
        let system = *self.system_fields();
        self.store
            .insert(PropertyKey::new(handle, system.owner), PropertyValue::Object(owner));
        self.store.insert(
            PropertyKey::new(handle, system.owning_field),
            PropertyValue::Integer(field_code),
        );
        let ordinal_key = PropertyKey::new(handle, system.ordinal);
        match ordinal.and_then(|o| i32::try_from(o).ok()) {
            Some(ordinal) => {
                self.store.insert(ordinal_key, PropertyValue::Integer(ordinal));
            }
            None => {
                self.store.remove(&ordinal_key);
            }
        }
    }

    fn orphan(&mut self, handle: ObjectHandle) {
        let system = *self.system_fields();
        for field in [system.owner, system.owning_field, system.ordinal] {
            self.store.remove(&PropertyKey::new(handle, field));
        }
    }

    /// Rewrite the ownership facts of every member of `owner`'s owning
    /// `field` from its current contents.
    ///
    /// Loading an owning value skips members whose class is not cached
    /// yet; call this once they exist.
    pub fn reindex_owned(&mut self, owner: ObjectHandle, field: FieldId) -> CacheResult<()> {
        let kind = self
            .schema_ref()?
            .field_type(field)
            .ok_or_else(|| CacheError::violation(owner, field, "unknown field"))?;
        if !kind.is_owning() {
            return Err(CacheError::violation(owner, field, format!("{kind} is not an owning kind")));
        }
        self.check_property(owner, field, kind.store_kind())?;
        let code = owning_field_code(owner, field)?;
        let members = self.peek(owner, field).map(members_of).unwrap_or_default();
        for (member, _) in &members {
            self.require_object(*member)?;
        }
        for (member, ordinal) in members {
            self.adopt(member, owner, code, ordinal);
        }
        Ok(())
    }

    /// Store a validated owning value as given and bring its members'
    /// ownership facts in line with it.
    ///
    /// Members dropped from the property are orphaned. Members whose class
    /// is not cached yet are skipped; [`reindex_owned`](Self::reindex_owned)
    /// picks them up once they exist. Nothing is written when the value
    /// lists a handle twice, contains the owner or one of its ancestors, or
    /// takes an object owned elsewhere.
    pub(crate) fn store_owned(
        &mut self,
        owner: ObjectHandle,
        field: FieldId,
        value: PropertyValue,
    ) -> CacheResult<()> {
        let code = owning_field_code(owner, field)?;
        let members = members_of(&value);
        if i32::try_from(members.len()).is_err() {
            return Err(CacheError::Unsupported(format!(
                "owning sequence of {} items",
                members.len()
            )));
        }
        let mut listed = HashSet::with_capacity(members.len());
        if let Some((dup, _)) = members.iter().find(|(h, _)| !listed.insert(*h)) {
            return Err(CacheError::violation(
                owner,
                field,
                format!("{dup} would appear twice in an owning sequence"),
            ));
        }
        let present: Vec<(ObjectHandle, Option<usize>)> = members
            .into_iter()
            .filter(|(h, _)| self.cached_class(*h).is_some())
            .collect();
        let adopted: Vec<ObjectHandle> = present.iter().map(|(h, _)| *h).collect();
        self.check_adoption(owner, field, &adopted)?;

        let previous = self.peek(owner, field).map(members_of).unwrap_or_default();
        self.write(owner, field, value);
        for (old, _) in previous {
            if !listed.contains(&old) && self.ownership_of(old) == Some((owner, field)) {
                self.orphan(old);
            }
        }
        for (member, ordinal) in present {
            self.adopt(member, owner, code, ordinal);
        }
        debug!(%owner, %field, members = listed.len(), "owning property stored");
        Ok(())
    }

    /// Create an object of `class`, give it a fresh identity GUID, and link
    /// it into `owner` when `owner` is not null.
    ///
    /// `ordinal_hint` is [`APPEND_TO_COLLECTION`] (-1), [`SET_ATOMIC`] (-2),
    /// or a non-negative insertion index (clamped to the sequence length).
    pub fn make_new_object(
        &mut self,
        class: ClassId,
        owner: ObjectHandle,
        field: FieldId,
        ordinal_hint: i32,
    ) -> CacheResult<ObjectHandle> {
        let class_field = self.system_fields().class;
        if !self.schema_ref()?.is_known_class(class) {
            return Err(CacheError::violation(ObjectHandle::NULL, class_field, format!("unknown {class}")));
        }
        let raw_class = i32::try_from(class.raw())
            .map_err(|_| CacheError::violation(ObjectHandle::NULL, class_field, format!("unrepresentable {class}")))?;

        let placement = if owner.is_null() {
            None
        } else {
            let store = match ordinal_hint {
                SET_ATOMIC => StoreKind::Object,
                APPEND_TO_COLLECTION => StoreKind::Sequence,
                hint if hint >= 0 => StoreKind::Sequence,
                hint => return Err(CacheError::InvalidOrdinal(hint)),
            };
            let kind = self.check_property(owner, field, store)?;
            if !kind.is_owning() {
                return Err(CacheError::violation(
                    owner,
                    field,
                    format!("cannot create objects in a {kind} field"),
                ));
            }
            owning_field_code(owner, field)?;
            Some(kind)
        };

        let handle = self
            .handles
            .allocate()
            .ok_or_else(|| CacheError::Unsupported("object handles exhausted".into()))?;
        self.cache_class(handle, raw_class)?;
        let guid = ObjectGuid::new();
        let guid_field = self.system_fields().guid;
        self.write(handle, guid_field, PropertyValue::Guid(guid));

        match placement {
            Some(ValueKind::OwningAtomic) => self.set_owning_atomic(owner, field, handle)?,
            Some(_) => {
                let at = usize::try_from(ordinal_hint).unwrap_or(usize::MAX);
                self.replace(owner, field, at, at, &[handle])?;
            }
            None => {}
        }
        self.dirty.touch(handle);
        debug!(%handle, %class, %owner, %guid, "object created");
        Ok(handle)
    }

    /// Check every owning property in the cache against its members'
    /// ownership facts.
    pub fn verify_ownership(&self) -> CacheResult<Vec<OwnershipViolation>> {
        let schema = self.schema_ref()?;
        let mut violations = Vec::new();
        let mut members_seen: HashSet<(ObjectHandle, ObjectHandle, FieldId)> = HashSet::new();

        for owner in self.handles() {
            for (field, value) in self.properties_of(owner) {
                let Some(kind) = schema.field_type(field) else {
                    continue;
                };
                if !kind.is_owning() {
                    continue;
                }
                for (member, ordinal) in members_of(value) {
                    members_seen.insert((member, owner, field));
                    self.verify_member(member, owner, field, ordinal, &mut violations);
                }
            }
        }

        for handle in self.handles() {
            if let Some(owner) = self
                .peek(handle, self.system_fields().owner)
                .and_then(PropertyValue::as_object)
                .filter(|h| !h.is_null())
            {
                let field = self.ownership_of(handle).map(|(_, f)| f);
                let listed = field.is_some_and(|f| members_seen.contains(&(handle, owner, f)));
                if !listed {
                    violations.push(OwnershipViolation::NotInOwner {
                        handle,
                        owner,
                        field,
                    });
                }
            }
        }
        Ok(violations)
    }

    fn verify_member(
        &self,
        member: ObjectHandle,
        owner: ObjectHandle,
        field: FieldId,
        ordinal: Option<usize>,
        violations: &mut Vec<OwnershipViolation>,
    ) {
        let system = self.system_fields();
        let recorded_owner = self
            .peek(member, system.owner)
            .and_then(PropertyValue::as_object)
            .filter(|h| !h.is_null());
        if recorded_owner != Some(owner) {
            violations.push(OwnershipViolation::WrongOwner {
                handle: member,
                expected: owner,
                actual: recorded_owner,
            });
        }
        let recorded_field = self
            .peek(member, system.owning_field)
            .and_then(PropertyValue::as_integer)
            .and_then(|raw| u32::try_from(raw).ok())
            .map(FieldId::new);
        if recorded_field != Some(field) {
            violations.push(OwnershipViolation::WrongOwningField {
                handle: member,
                expected: field,
                actual: recorded_field,
            });
        }
        if let Some(expected) = ordinal {
            let actual = self
                .peek(member, system.ordinal)
                .and_then(PropertyValue::as_integer);
            if actual.and_then(|a| usize::try_from(a).ok()) != Some(expected) {
                violations.push(OwnershipViolation::WrongOrdinal {
                    handle: member,
                    expected,
                    actual,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use cellar_schema::{InMemorySchema, SchemaProvider};

    const ENTRY: u32 = 1;
    const SENSE: u32 = 2;
    const SENSES: FieldId = FieldId::new(1001);
    const ETYMOLOGY: FieldId = FieldId::new(1002);
    const RELATED: FieldId = FieldId::new(1003);
    const PICTURES: FieldId = FieldId::new(1004);
    const SUBSENSES: FieldId = FieldId::new(2001);

    fn cache() -> PropertyCache {
        let schema = InMemorySchema::builder()
            .class(ENTRY, "LexEntry")
            .class(SENSE, "LexSense")
            .field(1001, "Senses", ENTRY, ValueKind::OwningSequence)
            .field(1002, "Etymology", ENTRY, ValueKind::OwningAtomic)
            .field(1003, "Related", ENTRY, ValueKind::ReferenceSequence)
            .field(1004, "Pictures", ENTRY, ValueKind::OwningCollection)
            .field(2001, "Senses", SENSE, ValueKind::OwningSequence)
            .build()
            .unwrap();
        let schema: Arc<dyn SchemaProvider> = Arc::new(schema);
        PropertyCache::new(schema)
    }

    fn object(cache: &mut PropertyCache, raw: u32, class: u32) -> ObjectHandle {
        let handle = ObjectHandle::new(raw);
        let class_field = cache.system_fields().class;
        cache.cache_int_prop(handle, class_field, class as i32).unwrap();
        handle
    }

    fn senses(cache: &mut PropertyCache, count: u32) -> Vec<ObjectHandle> {
        (0..count).map(|i| object(cache, 100 + i, SENSE)).collect()
    }

    fn assert_ordinals(cache: &PropertyCache, owner: ObjectHandle, field: FieldId) {
        let items = cache
            .peek(owner, field)
            .and_then(PropertyValue::as_sequence)
            .unwrap()
            .to_vec();
        for (i, item) in items.iter().enumerate() {
            assert_eq!(cache.ordinal_of(*item).unwrap(), Some(i));
            assert_eq!(cache.ownership_of(*item), Some((owner, field)));
        }
    }

    #[test]
    fn append_insert_and_remove_keep_ordinals() {
        let mut cache = cache();
        let entry = object(&mut cache, 1, ENTRY);
        let s = senses(&mut cache, 4);
        cache.replace(entry, SENSES, 0, 0, &s[..2]).unwrap();
        cache.replace(entry, SENSES, 2, 2, &s[2..3]).unwrap();
        cache.replace(entry, SENSES, 0, 0, &s[3..]).unwrap();
        assert_eq!(cache.vec_prop(entry, SENSES).unwrap(), vec![s[3], s[0], s[1], s[2]]);
        assert_ordinals(&cache, entry, SENSES);

        cache.replace(entry, SENSES, 1, 3, &[]).unwrap();
        assert_eq!(cache.vec_prop(entry, SENSES).unwrap(), vec![s[3], s[2]]);
        assert_ordinals(&cache, entry, SENSES);
        assert_eq!(cache.ownership_of(s[0]), None);
        assert_eq!(cache.ordinal_of(s[0]).unwrap(), None);
        assert!(cache.verify_ownership().unwrap().is_empty());
        assert!(cache.is_dirty());
    }

    #[test]
    fn bounds_are_clamped() {
        let mut cache = cache();
        let entry = object(&mut cache, 1, ENTRY);
        let s = senses(&mut cache, 2);
        cache.replace(entry, SENSES, 50, 80, &s[..1]).unwrap();
        cache.replace(entry, SENSES, usize::MAX, usize::MAX, &s[1..]).unwrap();
        assert_eq!(cache.vec_prop(entry, SENSES).unwrap(), s);
    }

    #[test]
    fn inverted_range_rejected() {
        let mut cache = cache();
        let entry = object(&mut cache, 1, ENTRY);
        let s = senses(&mut cache, 3);
        cache.replace(entry, SENSES, 0, 0, &s).unwrap();
        let err = cache.replace(entry, SENSES, 2, 1, &[]).unwrap_err();
        assert!(matches!(err, CacheError::InvalidRange { from: 2, to: 1 }));
        assert_eq!(cache.vec_size(entry, SENSES).unwrap(), 3);
    }

    #[test]
    fn moving_within_the_same_sequence() {
        let mut cache = cache();
        let entry = object(&mut cache, 1, ENTRY);
        let s = senses(&mut cache, 3);
        cache.replace(entry, SENSES, 0, 0, &s).unwrap();
        // rotate the first item to the end
        cache.replace(entry, SENSES, 0, 3, &[s[1], s[2], s[0]]).unwrap();
        assert_ordinals(&cache, entry, SENSES);
        assert_eq!(cache.ownership_of(s[0]), Some((entry, SENSES)));
    }

    #[test]
    fn duplicate_in_owning_sequence_rejected() {
        let mut cache = cache();
        let entry = object(&mut cache, 1, ENTRY);
        let s = senses(&mut cache, 1);
        cache.replace(entry, SENSES, 0, 0, &s).unwrap();
        let err = cache.replace(entry, SENSES, 1, 1, &s).unwrap_err();
        assert!(matches!(err, CacheError::SchemaViolation { .. }));
        assert_eq!(cache.vec_size(entry, SENSES).unwrap(), 1);
    }

    #[test]
    fn cross_owner_move_unsupported() {
        let mut cache = cache();
        let a = object(&mut cache, 1, ENTRY);
        let b = object(&mut cache, 2, ENTRY);
        let s = senses(&mut cache, 1);
        cache.replace(a, SENSES, 0, 0, &s).unwrap();
        cache.clear_dirty();
        let err = cache.replace(b, SENSES, 0, 0, &s).unwrap_err();
        assert!(matches!(err, CacheError::Unsupported(_)));
        assert!(cache.vec_prop(b, SENSES).unwrap().is_empty());
        assert_eq!(cache.ownership_of(s[0]), Some((a, SENSES)));
        assert!(!cache.is_dirty());
        // a different field of the same owner is also a move
        let err = cache.replace(a, PICTURES, 0, 0, &s).unwrap_err();
        assert!(matches!(err, CacheError::Unsupported(_)));
    }

    #[test]
    fn ancestor_cannot_be_owned() {
        let mut cache = cache();
        let s = senses(&mut cache, 2);
        cache.replace(s[0], SUBSENSES, 0, 0, &s[1..]).unwrap();
        let err = cache.replace(s[1], SUBSENSES, 0, 0, &s[..1]).unwrap_err();
        assert!(matches!(err, CacheError::SchemaViolation { .. }));
        let err = cache.replace(s[0], SUBSENSES, 0, 0, &s[..1]).unwrap_err();
        assert!(matches!(err, CacheError::SchemaViolation { .. }));
    }

    #[test]
    fn nonexistent_items_rejected_before_mutation() {
        let mut cache = cache();
        let entry = object(&mut cache, 1, ENTRY);
        let s = senses(&mut cache, 1);
        let err = cache
            .replace(entry, SENSES, 0, 0, &[s[0], ObjectHandle::new(999)])
            .unwrap_err();
        assert!(matches!(err, CacheError::InvalidHandle(_)));
        assert!(cache.peek(entry, SENSES).is_none());
        assert_eq!(cache.ownership_of(s[0]), None);
    }

    #[test]
    fn reference_sequences_ignore_ownership() {
        let mut cache = cache();
        let a = object(&mut cache, 1, ENTRY);
        let b = object(&mut cache, 2, ENTRY);
        let s = senses(&mut cache, 2);
        cache.replace(a, RELATED, 0, 0, &s).unwrap();
        cache.replace(b, RELATED, 0, 0, &s[1..]).unwrap();
        assert_eq!(cache.ownership_of(s[1]), None);
        assert_eq!(cache.ordinal_of(s[1]).unwrap(), None);
        // duplicates are fine in references
        cache.replace(a, RELATED, 2, 2, &s[..1]).unwrap();
        assert_eq!(cache.vec_size(a, RELATED).unwrap(), 3);
    }

    #[test]
    fn set_value_with_sequence_replaces_whole() {
        let mut cache = cache();
        let entry = object(&mut cache, 1, ENTRY);
        let s = senses(&mut cache, 3);
        cache.replace(entry, SENSES, 0, 0, &s).unwrap();
        cache
            .set_value(entry, SENSES, PropertyValue::Sequence(vec![s[2]]))
            .unwrap();
        assert_eq!(cache.vec_prop(entry, SENSES).unwrap(), vec![s[2]]);
        assert_eq!(cache.ordinal_of(s[2]).unwrap(), Some(0));
        assert_eq!(cache.ownership_of(s[0]), None);
    }

    #[test]
    fn owning_atomic_reparents() {
        let mut cache = cache();
        let entry = object(&mut cache, 1, ENTRY);
        let s = senses(&mut cache, 2);
        cache.set_object(entry, ETYMOLOGY, s[0]).unwrap();
        assert_eq!(cache.ownership_of(s[0]), Some((entry, ETYMOLOGY)));
        assert_eq!(cache.ordinal_of(s[0]).unwrap(), None);
        cache.set_object(entry, ETYMOLOGY, s[1]).unwrap();
        assert_eq!(cache.ownership_of(s[0]), None);
        assert_eq!(cache.owner_of(s[1]).unwrap(), Some(entry));
        cache.set_object(entry, ETYMOLOGY, ObjectHandle::NULL).unwrap();
        assert_eq!(cache.ownership_of(s[1]), None);
        assert!(cache.verify_ownership().unwrap().is_empty());
    }

    #[test]
    fn make_new_object_placements() {
        let mut cache = cache();
        let entry = object(&mut cache, 1, ENTRY);
        let class = ClassId::new(SENSE);

        let first = cache.make_new_object(class, entry, SENSES, APPEND_TO_COLLECTION).unwrap();
        let second = cache.make_new_object(class, entry, SENSES, 0).unwrap();
        let third = cache.make_new_object(class, entry, SENSES, 99).unwrap();
        assert_eq!(cache.vec_prop(entry, SENSES).unwrap(), vec![second, first, third]);
        assert_ordinals(&cache, entry, SENSES);

        let atomic = cache.make_new_object(class, entry, ETYMOLOGY, SET_ATOMIC).unwrap();
        assert_eq!(cache.get_obj_prop(entry, ETYMOLOGY).unwrap(), atomic);

        let loose = cache.make_new_object(class, ObjectHandle::NULL, FieldId::new(0), 0).unwrap();
        assert_eq!(cache.owner_of(loose).unwrap(), None);

        // fresh handles follow the explicitly cached one
        assert!(first.raw() > entry.raw());
        assert!(cache.is_dirty());
        assert!(cache.verify_ownership().unwrap().is_empty());
    }

    #[test]
    fn new_objects_get_identity_guids() {
        let mut cache = cache();
        let a = cache
            .make_new_object(ClassId::new(ENTRY), ObjectHandle::NULL, FieldId::new(0), 0)
            .unwrap();
        let guid_field = cache.system_fields().guid;
        let guid = cache.get_guid_prop(a, guid_field).unwrap();
        assert_eq!(cache.object_from_guid(&guid).unwrap(), a);
        assert_eq!(cache.class_of(a).unwrap(), ClassId::new(ENTRY));
    }

    #[test]
    fn make_new_object_rejections() {
        let mut cache = cache();
        let entry = object(&mut cache, 1, ENTRY);
        let count = cache.object_count();
        assert!(matches!(
            cache.make_new_object(ClassId::new(42), ObjectHandle::NULL, FieldId::new(0), 0),
            Err(CacheError::SchemaViolation { .. })
        ));
        assert!(matches!(
            cache.make_new_object(ClassId::new(SENSE), entry, SENSES, -7),
            Err(CacheError::InvalidOrdinal(-7))
        ));
        assert!(matches!(
            cache.make_new_object(ClassId::new(SENSE), entry, SENSES, SET_ATOMIC),
            Err(CacheError::SchemaViolation { .. })
        ));
        assert!(matches!(
            cache.make_new_object(ClassId::new(SENSE), entry, RELATED, APPEND_TO_COLLECTION),
            Err(CacheError::SchemaViolation { .. })
        ));
        assert_eq!(cache.object_count(), count);
    }

    #[test]
    fn loading_a_reordered_owning_sequence_renumbers() {
        let mut cache = cache();
        let entry = object(&mut cache, 1, ENTRY);
        let s = senses(&mut cache, 3);
        cache.replace(entry, SENSES, 0, 0, &s).unwrap();
        cache.clear_dirty();

        cache.cache_vec_prop(entry, SENSES, &[s[2], s[0], s[1]]).unwrap();
        assert_ordinals(&cache, entry, SENSES);
        assert_eq!(cache.ordinal_of(s[2]).unwrap(), Some(0));
        assert!(cache.verify_ownership().unwrap().is_empty());
        // the load path never marks objects dirty
        assert!(!cache.is_dirty());
    }

    #[test]
    fn loading_owning_values_adopts_and_orphans() {
        let mut cache = cache();
        let entry = object(&mut cache, 1, ENTRY);
        let s = senses(&mut cache, 3);
        cache.cache_vec_prop(entry, SENSES, &s).unwrap();
        assert_ordinals(&cache, entry, SENSES);

        cache.cache_vec_prop(entry, SENSES, &s[1..]).unwrap();
        assert_eq!(cache.ownership_of(s[0]), None);
        assert_eq!(cache.ordinal_of(s[0]).unwrap(), None);
        assert_ordinals(&cache, entry, SENSES);

        cache.cache_obj_prop(entry, ETYMOLOGY, s[0]).unwrap();
        assert_eq!(cache.ownership_of(s[0]), Some((entry, ETYMOLOGY)));
        cache.cache_obj_prop(entry, ETYMOLOGY, ObjectHandle::NULL).unwrap();
        assert_eq!(cache.ownership_of(s[0]), None);
        assert!(cache.verify_ownership().unwrap().is_empty());
    }

    #[test]
    fn loading_rejects_what_replace_rejects() {
        let mut cache = cache();
        let a = object(&mut cache, 1, ENTRY);
        let b = object(&mut cache, 2, ENTRY);
        let s = senses(&mut cache, 2);
        cache.cache_vec_prop(a, SENSES, &s[..1]).unwrap();

        let err = cache.cache_vec_prop(b, SENSES, &s).unwrap_err();
        assert!(matches!(err, CacheError::Unsupported(_)));
        assert!(cache.peek(b, SENSES).is_none());
        assert_eq!(cache.ownership_of(s[1]), None);

        let err = cache.cache_vec_prop(a, SENSES, &[s[1], s[1]]).unwrap_err();
        assert!(matches!(err, CacheError::SchemaViolation { .. }));
        assert_eq!(cache.vec_prop(a, SENSES).unwrap(), vec![s[0]]);
        assert_ordinals(&cache, a, SENSES);
    }

    #[test]
    fn members_loaded_before_they_exist_are_adopted_by_reindex() {
        let mut cache = cache();
        let entry = object(&mut cache, 1, ENTRY);
        let early = object(&mut cache, 100, SENSE);
        let late = ObjectHandle::new(101);
        cache.cache_vec_prop(entry, SENSES, &[late, early]).unwrap();
        assert_eq!(cache.ordinal_of(early).unwrap(), Some(1));

        object(&mut cache, late.raw(), SENSE);
        assert_eq!(cache.ownership_of(late), None);
        cache.reindex_owned(entry, SENSES).unwrap();
        assert_ordinals(&cache, entry, SENSES);
        assert!(cache.verify_ownership().unwrap().is_empty());
        assert!(matches!(
            cache.reindex_owned(entry, RELATED),
            Err(CacheError::SchemaViolation { .. })
        ));
    }

    #[test]
    fn compute_once_owning_result_is_adopted() {
        let mut cache = cache();
        let entry = object(&mut cache, 1, ENTRY);
        let s = senses(&mut cache, 2);
        let items = s.clone();
        cache
            .install_virtual(
                SENSES,
                Arc::new(crate::virtuals::VirtualFn::once(move |_, _| {
                    Ok(PropertyValue::Sequence(items.clone()))
                })),
            )
            .unwrap();
        assert_eq!(cache.vec_prop(entry, SENSES).unwrap(), s);
        assert_ordinals(&cache, entry, SENSES);
        assert!(cache.verify_ownership().unwrap().is_empty());
    }

    /// Schema whose only owning field has an id beyond `i32::MAX`.
    struct WideFieldSchema;

    const WIDE: FieldId = FieldId::new(3_000_000_000);

    impl SchemaProvider for WideFieldSchema {
        fn field_type(&self, field: FieldId) -> Option<ValueKind> {
            let system = cellar_schema::SystemFields::default();
            if field == WIDE {
                Some(ValueKind::OwningSequence)
            } else if field == system.guid {
                Some(ValueKind::Guid)
            } else if field == system.owner {
                Some(ValueKind::ReferenceAtomic)
            } else if system.contains(field) {
                Some(ValueKind::Integer)
            } else {
                None
            }
        }

        fn is_valid_class(&self, _field: FieldId, class: ClassId) -> bool {
            class == ClassId::new(ENTRY)
        }

        fn class_count(&self) -> usize {
            1
        }

        fn all_class_ids(&self) -> Vec<ClassId> {
            vec![ClassId::new(ENTRY)]
        }
    }

    #[test]
    fn unrecordable_owning_field_rejected_before_mutation() {
        let mut cache = PropertyCache::new(Arc::new(WideFieldSchema));
        let owner = object(&mut cache, 1, ENTRY);
        let member = object(&mut cache, 10, ENTRY);

        let err = cache.replace(owner, WIDE, 0, 0, &[member]).unwrap_err();
        assert!(matches!(err, CacheError::SchemaViolation { .. }));
        assert!(cache.peek(owner, WIDE).is_none());
        assert_eq!(cache.ownership_of(member), None);

        assert!(cache.cache_vec_prop(owner, WIDE, &[member]).is_err());
        assert!(cache.peek(owner, WIDE).is_none());

        let count = cache.object_count();
        assert!(cache
            .make_new_object(ClassId::new(ENTRY), owner, WIDE, APPEND_TO_COLLECTION)
            .is_err());
        assert_eq!(cache.object_count(), count);
        assert!(!cache.is_dirty());
    }

    #[test]
    fn verify_reports_stray_owner_facts() {
        let mut cache = cache();
        let entry = object(&mut cache, 1, ENTRY);
        let s = senses(&mut cache, 1);
        let owner_field = cache.system_fields().owner;
        cache.cache_obj_prop(s[0], owner_field, entry).unwrap();
        let violations = cache.verify_ownership().unwrap();
        assert_eq!(
            violations,
            vec![OwnershipViolation::NotInOwner {
                handle: s[0],
                owner: entry,
                field: None,
            }]
        );
        assert!(violations[0].to_string().contains("without an owning field"));
    }

    #[test]
    fn verify_requires_schema() {
        let cache = PropertyCache::without_schema();
        assert!(matches!(cache.verify_ownership(), Err(CacheError::MissingSchema)));
    }
}
