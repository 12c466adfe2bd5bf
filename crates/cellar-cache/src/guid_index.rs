//! Reverse index from identity GUID to object handle.
//!
//! Only identity GUIDs are registered here. GUID values stored under any
//! other field live in the property store alone and can never shadow or
//! remove an identity entry.

use std::collections::HashMap;

use cellar_types::{ObjectGuid, ObjectHandle};

/// Bidirectional handle/identity-GUID map.
#[derive(Debug, Default, Clone)]
pub struct GuidIndex {
    by_guid: HashMap<ObjectGuid, ObjectHandle>,
    by_handle: HashMap<ObjectHandle, ObjectGuid>,
}

impl GuidIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `guid` as the identity of `handle`.
    ///
    /// Overwrites any handle previously registered for `guid`, and drops
    /// the entry for a different identity `handle` held before.
    pub fn register(&mut self, handle: ObjectHandle, guid: ObjectGuid) {
        if let Some(old) = self.by_handle.insert(handle, guid) {
            if old != guid && self.by_guid.get(&old) == Some(&handle) {
                self.by_guid.remove(&old);
            }
        }
        if let Some(previous) = self.by_guid.insert(guid, handle) {
            if previous != handle && self.by_handle.get(&previous) == Some(&guid) {
                self.by_handle.remove(&previous);
            }
        }
    }

    /// Handle whose identity is `guid`.
    pub fn lookup(&self, guid: &ObjectGuid) -> Option<ObjectHandle> {
        self.by_guid.get(guid).copied()
    }

    /// Identity GUID registered for `handle`.
    pub fn guid_of(&self, handle: ObjectHandle) -> Option<ObjectGuid> {
        self.by_handle.get(&handle).copied()
    }

    /// Remove the entry established by `handle`'s own identity.
    ///
    /// Returns the GUID that was unregistered.
    pub fn remove_handle(&mut self, handle: ObjectHandle) -> Option<ObjectGuid> {
        let guid = self.by_handle.remove(&handle)?;
        if self.by_guid.get(&guid) == Some(&handle) {
            self.by_guid.remove(&guid);
        }
        Some(guid)
    }

    pub fn len(&self) -> usize {
        self.by_guid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_guid.is_empty()
    }

    pub fn clear(&mut self) {
        self.by_guid.clear();
        self.by_handle.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn h(raw: u32) -> ObjectHandle {
        ObjectHandle::new(raw)
    }

    #[test]
    fn register_and_lookup() {
        let mut index = GuidIndex::new();
        let g = ObjectGuid::new();
        index.register(h(1), g);
        assert_eq!(index.lookup(&g), Some(h(1)));
        assert_eq!(index.guid_of(h(1)), Some(g));
    }

    #[test]
    fn lookup_missing() {
        let index = GuidIndex::new();
        assert_eq!(index.lookup(&ObjectGuid::new()), None);
    }

    #[test]
    fn reregistering_handle_drops_stale_guid() {
        let mut index = GuidIndex::new();
        let g1 = ObjectGuid::new();
        let g2 = ObjectGuid::new();
        index.register(h(1), g1);
        index.register(h(1), g2);
        assert_eq!(index.lookup(&g1), None);
        assert_eq!(index.lookup(&g2), Some(h(1)));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn guid_moves_to_new_handle() {
        let mut index = GuidIndex::new();
        let g = ObjectGuid::new();
        index.register(h(1), g);
        index.register(h(2), g);
        assert_eq!(index.lookup(&g), Some(h(2)));
        assert_eq!(index.guid_of(h(1)), None);
        // The old handle no longer owns the entry, so removing it is a no-op.
        assert_eq!(index.remove_handle(h(1)), None);
        assert_eq!(index.lookup(&g), Some(h(2)));
    }

    #[test]
    fn remove_handle_only_touches_own_entry() {
        let mut index = GuidIndex::new();
        let ga = ObjectGuid::new();
        let gb = ObjectGuid::new();
        index.register(h(1), ga);
        index.register(h(2), gb);
        assert_eq!(index.remove_handle(h(2)), Some(gb));
        assert_eq!(index.lookup(&ga), Some(h(1)));
        assert_eq!(index.lookup(&gb), None);
    }

    #[test]
    fn clear() {
        let mut index = GuidIndex::new();
        index.register(h(1), ObjectGuid::new());
        index.clear();
        assert!(index.is_empty());
        assert_eq!(index.guid_of(h(1)), None);
    }
}
