use cellar_types::ObjectHandle;

/// Issues ever-increasing object handles.
///
/// Handles cached explicitly by callers are observed so that allocation
/// never reissues them.
#[derive(Debug, Clone)]
pub struct HandleAllocator {
    next: u32,
}

impl HandleAllocator {
    /// Start at `first` (raised to 1 if zero).
    pub fn new(first: u32) -> Self {
        Self { next: first.max(1) }
    }

    /// Issue the next handle, or `None` once the handle space is exhausted.
    pub fn allocate(&mut self) -> Option<ObjectHandle> {
        let handle = self.next;
        self.next = self.next.checked_add(1)?;
        Some(ObjectHandle::new(handle))
    }

    /// Record an externally chosen handle.
    pub fn observe(&mut self, handle: ObjectHandle) {
        if handle.raw() >= self.next {
            self.next = handle.raw().saturating_add(1);
        }
    }

    /// The handle the next `allocate` will return.
    pub fn peek(&self) -> ObjectHandle {
        ObjectHandle::new(self.next)
    }
}
