//! Plug points for collaborators layered above the cache.
//!
//! The cache stores an undo/redo action handler and a list of change
//! listeners, but never calls either: transaction management and change
//! propagation belong to the layer that owns the cache.

use std::fmt;
use std::sync::Arc;

use cellar_types::{FieldId, ObjectHandle};

/// Undo/redo transaction manager.
pub trait ActionHandler: Send + Sync {
    fn begin_undo_task(&self, undo_label: &str, redo_label: &str);
    fn end_undo_task(&self);
    fn can_undo(&self) -> bool;
    fn can_redo(&self) -> bool;
}

/// Description of a change to a property, as delivered to listeners.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PropChange {
    pub handle: ObjectHandle,
    pub field: FieldId,
    /// First affected index (0 for single-valued properties).
    pub index: usize,
    pub inserted: usize,
    pub deleted: usize,
}

/// Receiver of property change notifications.
pub trait ChangeListener: Send + Sync {
    fn prop_changed(&self, change: &PropChange);
}

/// Listener that ignores every notification.
pub struct NoOpListener;

impl ChangeListener for NoOpListener {
    fn prop_changed(&self, _change: &PropChange) {}
}

/// Stored collaborator references.
#[derive(Default, Clone)]
pub struct HookSlots {
    action_handler: Option<Arc<dyn ActionHandler>>,
    listeners: Vec<Arc<dyn ChangeListener>>,
}

impl HookSlots {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn action_handler(&self) -> Option<Arc<dyn ActionHandler>> {
        self.action_handler.clone()
    }

    /// Replace the action handler; `None` clears it.
    pub fn set_action_handler(&mut self, handler: Option<Arc<dyn ActionHandler>>) {
        self.action_handler = handler;
    }

    /// Register a listener. Registering the same `Arc` twice is a no-op.
    pub fn add_listener(&mut self, listener: Arc<dyn ChangeListener>) {
        if !self.listeners.iter().any(|l| Arc::ptr_eq(l, &listener)) {
            self.listeners.push(listener);
        }
    }

    /// Unregister a listener by identity. Returns `true` if it was present.
    pub fn remove_listener(&mut self, listener: &Arc<dyn ChangeListener>) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|l| !Arc::ptr_eq(l, listener));
        self.listeners.len() != before
    }

    pub fn listeners(&self) -> &[Arc<dyn ChangeListener>] {
        &self.listeners
    }
}

impl fmt::Debug for HookSlots {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookSlots")
            .field("has_action_handler", &self.action_handler.is_some())
            .field("listener_count", &self.listeners.len())
            .finish()
    }
}
