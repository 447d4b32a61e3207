//! DOM events - Event objects and listener handles.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::DomNode;

/// Listener callback (Rc so the same closure can be registered and later
/// compared or cloned into other closures).
pub type EventListener = Rc<dyn Fn(&Event)>;

/// Identifies one registered listener for removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) u64);

/// A dispatched DOM event.
pub struct Event {
    event_type: String,
    bubbles: bool,
    target: RefCell<Option<DomNode>>,
    default_prevented: Cell<bool>,
    propagation_stopped: Cell<bool>,
}

impl Event {
    /// A bubbling event (`input`, `change`, `click`).
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            bubbles: true,
            target: RefCell::new(None),
            default_prevented: Cell::new(false),
            propagation_stopped: Cell::new(false),
        }
    }

    /// An event that only reaches its target (`focus`, `load`).
    pub fn non_bubbling(event_type: impl Into<String>) -> Self {
        Self {
            bubbles: false,
            ..Self::new(event_type)
        }
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn bubbles(&self) -> bool {
        self.bubbles
    }

    /// The node the event was dispatched at.
    pub fn target(&self) -> Option<DomNode> {
        self.target.borrow().clone()
    }

    pub(crate) fn set_target(&self, target: DomNode) {
        *self.target.borrow_mut() = Some(target);
    }

    pub fn prevent_default(&self) {
        self.default_prevented.set(true);
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented.get()
    }

    pub fn stop_propagation(&self) {
        self.propagation_stopped.set(true);
    }

    pub fn propagation_stopped(&self) -> bool {
        self.propagation_stopped.get()
    }
}

impl std::fmt::Debug for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Event")
            .field("type", &self.event_type)
            .field("bubbles", &self.bubbles)
            .finish()
    }
}
