use std::collections::HashMap;

use cellar_types::ObjectHandle;
use chrono::{DateTime, Utc};

/// Last-modified timestamps per object plus an aggregate dirty flag.
#[derive(Debug, Default, Clone)]
pub struct DirtyTracker {
    modified: HashMap<ObjectHandle, DateTime<Utc>>,
    dirty: bool,
}

impl DirtyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamp `handle` with the current time and raise the dirty flag.
    pub fn touch(&mut self, handle: ObjectHandle) {
        self.modified.insert(handle, Utc::now());
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Lower the aggregate flag. Timestamps are kept.
    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    pub fn last_modified(&self, handle: ObjectHandle) -> Option<DateTime<Utc>> {
        self.modified.get(&handle).copied()
    }

    /// Number of objects with a recorded modification.
    pub fn modified_count(&self) -> usize {
        self.modified.len()
    }

    /// Forget timestamps and lower the flag.
    pub fn reset(&mut self) {
        self.modified.clear();
        self.dirty = false;
    }
}
