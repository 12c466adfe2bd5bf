//! Property tests for the ownership ordinal invariant and GUID index scoping.

use std::sync::Arc;

use cellar_cache::{CacheError, PropertyCache};
use cellar_schema::{InMemorySchema, SchemaProvider};
use cellar_types::{FieldId, ObjectGuid, ObjectHandle, ValueKind};
use proptest::prelude::*;

const ENTRY: u32 = 1;
const SENSE: u32 = 2;
const SENSES: FieldId = FieldId::new(1001);
const IMPORT_GUID: FieldId = FieldId::new(1002);
const POOL: u32 = 48;

fn new_cache() -> PropertyCache {
    let schema = InMemorySchema::builder()
        .class(ENTRY, "LexEntry")
        .class(SENSE, "LexSense")
        .field(1001, "Senses", ENTRY, ValueKind::OwningSequence)
        .field(1002, "ImportGuid", ENTRY, ValueKind::Guid)
        .build()
        .unwrap();
    let schema: Arc<dyn SchemaProvider> = Arc::new(schema);
    PropertyCache::new(schema)
}

fn owner_with_pool() -> (PropertyCache, ObjectHandle, Vec<ObjectHandle>) {
    let mut cache = new_cache();
    let class_field = cache.system_fields().class;
    let owner = ObjectHandle::new(1);
    cache.cache_int_prop(owner, class_field, ENTRY as i32).unwrap();
    let pool: Vec<ObjectHandle> = (0..POOL)
        .map(|i| {
            let handle = ObjectHandle::new(100 + i);
            cache.cache_int_prop(handle, class_field, SENSE as i32).unwrap();
            handle
        })
        .collect();
    (cache, owner, pool)
}

fn entries(count: u32) -> PropertyCache {
    let mut cache = new_cache();
    let class_field = cache.system_fields().class;
    for raw in 1..=count {
        cache
            .cache_int_prop(ObjectHandle::new(raw), class_field, ENTRY as i32)
            .unwrap();
    }
    cache
}

fn guid(n: usize) -> ObjectGuid {
    ObjectGuid::from_bytes([n as u8 + 1; 16])
}

proptest! {
    #[test]
    fn ordinals_follow_positions_after_any_replace(
        ops in prop::collection::vec((0usize..12, 0usize..12, 0usize..4), 1..40)
    ) {
        let (mut cache, owner, pool) = owner_with_pool();
        let mut model: Vec<ObjectHandle> = Vec::new();

        for (from, to, count) in ops {
            let fresh: Vec<ObjectHandle> = pool
                .iter()
                .copied()
                .filter(|h| !model.contains(h))
                .take(count)
                .collect();
            let len = model.len();
            let (start, end) = (from.min(len), to.min(len));
            let result = cache.replace(owner, SENSES, from, to, &fresh);
            if start > end {
                let is_range_error = matches!(result, Err(CacheError::InvalidRange { .. }));
                prop_assert!(is_range_error);
            } else {
                prop_assert!(result.is_ok());
                model.splice(start..end, fresh.iter().copied());
            }

            prop_assert_eq!(cache.vec_prop(owner, SENSES).unwrap(), model.clone());
            for (i, handle) in model.iter().enumerate() {
                prop_assert_eq!(cache.ordinal_of(*handle).unwrap(), Some(i));
                prop_assert_eq!(cache.owner_of(*handle).unwrap(), Some(owner));
            }
            for handle in pool.iter().filter(|h| !model.contains(h)) {
                prop_assert_eq!(cache.owner_of(*handle).unwrap(), None);
                prop_assert_eq!(cache.ordinal_of(*handle).unwrap(), None);
            }
            prop_assert!(cache.verify_ownership().unwrap().is_empty());
        }
    }

    #[test]
    fn non_identity_guids_never_change_lookups(
        ops in prop::collection::vec((1u32..5, any::<bool>(), 0usize..3), 0..30),
        removed in 1u32..5,
    ) {
        let mut full = entries(4);
        let mut identity_only = entries(4);
        let identity = full.system_fields().guid;

        for (raw, is_identity, g) in ops {
            let handle = ObjectHandle::new(raw);
            if is_identity {
                full.cache_guid_prop(handle, identity, guid(g)).unwrap();
                identity_only.cache_guid_prop(handle, identity, guid(g)).unwrap();
            } else {
                full.cache_guid_prop(handle, IMPORT_GUID, guid(g)).unwrap();
            }
        }
        for g in 0..3 {
            prop_assert_eq!(
                full.object_from_guid(&guid(g)).ok(),
                identity_only.object_from_guid(&guid(g)).ok()
            );
        }

        let handle = ObjectHandle::new(removed);
        prop_assert_eq!(
            full.remove_object_references(handle),
            identity_only.remove_object_references(handle)
        );
        for g in 0..3 {
            let found = full.object_from_guid(&guid(g)).ok();
            prop_assert_eq!(found, identity_only.object_from_guid(&guid(g)).ok());
            prop_assert_ne!(found, Some(handle));
        }
    }
}
