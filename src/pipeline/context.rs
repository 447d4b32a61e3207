//! Root Context - Everything one root owns.
//!
//! There is no process-wide state. Each root carries its own instance arena,
//! scheduler batch, persisted-node registry, id counters and subscriber
//! lists, and the reconciler threads `&RootContext` through every call.
//! Futures and DOM listeners hold a `Weak` so a dropped root is not kept
//! alive by work it scheduled.

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;

use super::event_loop::EventLoop;
use super::scheduler::SchedulerState;
use crate::config::RuntimeConfig;
use crate::dom::{Document, DomNode};
use crate::engine::registry::{InstanceId, Tree};
use crate::error::RenderError;
use crate::types::Key;

/// Scheduler phase broadcast to mixin runtimes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    BeforeUpdate,
    Commit,
}

/// Phase subscriber: receives the phase and the DOM parents the pass touches.
pub type PhaseListener = Rc<dyn Fn(Phase, &[DomNode])>;

/// Error subscriber.
pub type ErrorListener = Rc<dyn Fn(&RenderError)>;

/// A host node whose removal is deferred by a mixin.
#[derive(Debug, Clone)]
pub(crate) struct PersistedEntry {
    pub id: InstanceId,
    pub dom: DomNode,
    pub dom_parent: DomNode,
    pub tag: Rc<str>,
    pub key: Option<Key>,
}

pub struct RootContext {
    pub(crate) document: Document,
    pub(crate) container: DomNode,
    pub(crate) config: RuntimeConfig,
    pub(crate) event_loop: Rc<EventLoop>,
    pub(crate) tree: RefCell<Tree>,
    /// Committed root instance.
    pub(crate) root: Cell<Option<InstanceId>>,
    pub(crate) scheduler: RefCell<SchedulerState>,
    /// Removal token → persisted node.
    pub(crate) persisted: RefCell<IndexMap<u64, PersistedEntry>>,
    /// `document.head` elements owned by a hoisted host of this root.
    pub(crate) head_claims: RefCell<HashSet<DomNode>>,
    next_scope: Cell<u64>,
    next_frame_id: Cell<u64>,
    next_token: Cell<u64>,
    next_phase_id: Cell<u64>,
    phase_listeners: RefCell<Vec<(u64, PhaseListener)>>,
    error_listeners: RefCell<Vec<ErrorListener>>,
    unmounted: Cell<bool>,
    this: Weak<RootContext>,
}

impl RootContext {
    pub(crate) fn new(document: Document, container: DomNode, config: RuntimeConfig) -> Rc<Self> {
        Rc::new_cyclic(|this| Self {
            document,
            container,
            config,
            event_loop: Rc::new(EventLoop::new()),
            tree: RefCell::new(Tree::new()),
            root: Cell::new(None),
            scheduler: RefCell::new(SchedulerState::default()),
            persisted: RefCell::new(IndexMap::new()),
            head_claims: RefCell::new(HashSet::new()),
            next_scope: Cell::new(0),
            next_frame_id: Cell::new(0),
            next_token: Cell::new(0),
            next_phase_id: Cell::new(0),
            phase_listeners: RefCell::new(Vec::new()),
            error_listeners: RefCell::new(Vec::new()),
            unmounted: Cell::new(false),
            this: this.clone(),
        })
    }

    pub(crate) fn weak(&self) -> Weak<RootContext> {
        self.this.clone()
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn is_unmounted(&self) -> bool {
        self.unmounted.get()
    }

    pub(crate) fn mark_unmounted(&self) {
        self.unmounted.set(true);
    }

    // -------------------------------------------------------------------------
    // Id counters
    // -------------------------------------------------------------------------

    /// Fresh mixin scope id.
    pub(crate) fn next_scope(&self) -> u64 {
        bump(&self.next_scope)
    }

    /// Fresh frame id for client-created markers.
    pub(crate) fn next_frame_id(&self) -> u64 {
        bump(&self.next_frame_id)
    }

    /// Fresh token (frame resolutions, deferred removals).
    pub(crate) fn next_token(&self) -> u64 {
        bump(&self.next_token)
    }

    // -------------------------------------------------------------------------
    // Phase events
    // -------------------------------------------------------------------------

    pub(crate) fn subscribe_phase(&self, listener: PhaseListener) -> u64 {
        let id = bump(&self.next_phase_id);
        self.phase_listeners.borrow_mut().push((id, listener));
        id
    }

    pub(crate) fn unsubscribe_phase(&self, id: u64) {
        self.phase_listeners.borrow_mut().retain(|(lid, _)| *lid != id);
    }

    #[cfg(test)]
    pub(crate) fn phase_listener_count(&self) -> usize {
        self.phase_listeners.borrow().len()
    }

    /// Broadcast a phase. Listeners added during dispatch miss this one.
    pub(crate) fn dispatch_phase(&self, phase: Phase, parents: &[DomNode]) {
        let listeners: Vec<(u64, PhaseListener)> = self.phase_listeners.borrow().clone();
        for (id, listener) in listeners {
            // Skip listeners removed by an earlier one in this dispatch.
            let live = self.phase_listeners.borrow().iter().any(|(lid, _)| *lid == id);
            if live {
                listener(phase, parents);
            }
        }
    }

    // -------------------------------------------------------------------------
    // Errors
    // -------------------------------------------------------------------------

    pub(crate) fn on_error(&self, listener: ErrorListener) {
        self.error_listeners.borrow_mut().push(listener);
    }

    /// Log and broadcast a recoverable error.
    pub(crate) fn report(&self, error: RenderError) {
        tracing::error!(error = %error, "render error");
        let listeners: Vec<ErrorListener> = self.error_listeners.borrow().clone();
        for listener in listeners {
            listener(&error);
        }
    }

    // -------------------------------------------------------------------------
    // Persisted nodes
    // -------------------------------------------------------------------------

    pub(crate) fn is_persisted(&self, dom: &DomNode) -> bool {
        self.persisted.borrow().values().any(|entry| &entry.dom == dom)
    }

    /// A persisted node that a keyed insert of `tag`/`key` under `dom_parent`
    /// can reclaim.
    pub(crate) fn find_reclaimable(&self, tag: &str, key: &Key, dom_parent: &DomNode) -> Option<(u64, PersistedEntry)> {
        self.persisted
            .borrow()
            .iter()
            .find(|(_, entry)| {
                &*entry.tag == tag && entry.key.as_ref() == Some(key) && &entry.dom_parent == dom_parent
            })
            .map(|(token, entry)| (*token, entry.clone()))
    }
}

fn bump(counter: &Cell<u64>) -> u64 {
    let value = counter.get();
    counter.set(value + 1);
    value
}
