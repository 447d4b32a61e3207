//! Mixin handles - The surface a runner sees.
//!
//! Every runner gets its own [`MixinHandle`] carrying a fresh [`ScopeId`].
//! Listeners are registered per scope in the node's shared registry, so
//! releasing a scope (the runner left the `mix` list) drops exactly that
//! runner's listeners and leaves the others untouched.

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::rc::{Rc, Weak};

use futures::channel::oneshot;
use futures::future::LocalBoxFuture;

use super::{MixinEvent, MixinEventKind};
use crate::dom::DomNode;
use crate::engine::abort::{AbortController, AbortSignal};
use crate::engine::node::{HostBuilder, h};
use crate::pipeline::context::{Phase, RootContext};
use crate::pipeline::scheduler::{self, UpdateTarget};
use crate::types::Key;

/// Isolated lifecycle namespace of one runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(pub(crate) u64);

/// Returned by [`MixinHandle::add_event_listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MixinListenerId(u64);

pub(crate) type MixinListener = Rc<dyn Fn(&MixinEvent)>;

/// Deferred-removal teardown registered through
/// [`MixinHandle::persist_node`].
pub(crate) type PersistFn = Box<dyn FnOnce(AbortSignal) -> LocalBoxFuture<'static, ()>>;

struct ListenerEntry {
    id: MixinListenerId,
    scope: ScopeId,
    kind: MixinEventKind,
    listener: MixinListener,
}

#[derive(Clone)]
pub(crate) struct Binding {
    pub node: DomNode,
    pub parent: DomNode,
    pub key: Option<Key>,
}

/// State shared by every runner of one host node.
pub(crate) struct MixinShared {
    cx: Weak<RootContext>,
    pub(crate) host_type: Rc<str>,
    listeners: RefCell<Vec<ListenerEntry>>,
    next_listener: Cell<u64>,
    pub(crate) binding: RefCell<Option<Binding>>,
    pub(crate) owner: Cell<UpdateTarget>,
    /// Node-lifetime signal. Aborted once, at final teardown.
    pub(crate) controller: AbortController,
    /// `Some` while `BeforeRemove` is being dispatched.
    pub(crate) persist_requests: RefCell<Option<Vec<PersistFn>>>,
    /// Signal handed to in-flight teardowns of a deferred removal.
    pub(crate) pending_removal: RefCell<Option<AbortController>>,
    waiters: RefCell<Vec<oneshot::Sender<()>>>,
    phase_subscription: Cell<Option<u64>>,
    pub(crate) torn_down: Cell<bool>,
}

impl MixinShared {
    pub(crate) fn new(cx: &RootContext, host_type: Rc<str>) -> Rc<Self> {
        Rc::new(Self {
            cx: cx.weak(),
            host_type,
            listeners: RefCell::new(Vec::new()),
            next_listener: Cell::new(0),
            binding: RefCell::new(None),
            owner: Cell::new(UpdateTarget::Root),
            controller: AbortController::new(),
            persist_requests: RefCell::new(None),
            pending_removal: RefCell::new(None),
            waiters: RefCell::new(Vec::new()),
            phase_subscription: Cell::new(None),
            torn_down: Cell::new(false),
        })
    }

    pub(crate) fn context(&self) -> Option<Rc<RootContext>> {
        self.cx.upgrade()
    }

    /// Dispatch `kind` to one scope, or to every scope when `scope` is `None`.
    /// Nothing is dispatched before the node is bound.
    pub(crate) fn dispatch(&self, kind: MixinEventKind, scope: Option<ScopeId>) {
        let Some(binding) = self.binding.borrow().clone() else {
            return;
        };
        let event = MixinEvent {
            kind,
            node: binding.node,
            parent: binding.parent,
            key: binding.key,
        };
        let listeners: Vec<MixinListener> = self
            .listeners
            .borrow()
            .iter()
            .filter(|entry| entry.kind == kind && scope.is_none_or(|s| entry.scope == s))
            .map(|entry| entry.listener.clone())
            .collect();
        for listener in listeners {
            listener(&event);
        }
    }

    /// Drop every listener of `scope`.
    pub(crate) fn release_scope(self: &Rc<Self>, scope: ScopeId) {
        self.listeners.borrow_mut().retain(|entry| entry.scope != scope);
        self.sync_phase_subscription();
    }

    /// Number of `BeforeUpdate`/`Commit` listeners across all scopes.
    pub(crate) fn phase_listener_count(&self) -> usize {
        self.listeners
            .borrow()
            .iter()
            .filter(|entry| matches!(entry.kind, MixinEventKind::BeforeUpdate | MixinEventKind::Commit))
            .count()
    }

    pub(crate) fn listener_count(&self, scope: ScopeId) -> usize {
        self.listeners.borrow().iter().filter(|entry| entry.scope == scope).count()
    }

    /// Subscribe to the root's phase events exactly while some runner listens
    /// for them or an `update()` is waiting for its commit.
    pub(crate) fn sync_phase_subscription(self: &Rc<Self>) {
        let needed = !self.torn_down.get()
            && (self.phase_listener_count() > 0 || !self.waiters.borrow().is_empty());
        let Some(cx) = self.context() else {
            return;
        };
        match (needed, self.phase_subscription.get()) {
            (true, None) => {
                let weak = Rc::downgrade(self);
                let id = cx.subscribe_phase(Rc::new(move |phase, parents| {
                    if let Some(shared) = weak.upgrade() {
                        shared.on_phase(phase, parents);
                    }
                }));
                self.phase_subscription.set(Some(id));
            }
            (false, Some(id)) => {
                cx.unsubscribe_phase(id);
                self.phase_subscription.set(None);
            }
            _ => {}
        }
    }

    fn on_phase(self: &Rc<Self>, phase: Phase, parents: &[DomNode]) {
        let Some(node) = self.binding.borrow().as_ref().map(|b| b.node.clone()) else {
            return;
        };
        if !parents.iter().any(|parent| parent.contains(&node)) {
            return;
        }
        match phase {
            Phase::BeforeUpdate => self.dispatch(MixinEventKind::BeforeUpdate, None),
            Phase::Commit => {
                self.dispatch(MixinEventKind::Commit, None);
                let waiters = std::mem::take(&mut *self.waiters.borrow_mut());
                for waiter in waiters {
                    let _ = waiter.send(());
                }
                self.sync_phase_subscription();
            }
        }
    }

    /// Final teardown of the shared state: listeners, waiters, subscription
    /// and the node signal.
    pub(crate) fn shutdown(self: &Rc<Self>) {
        self.torn_down.set(true);
        self.listeners.borrow_mut().clear();
        self.waiters.borrow_mut().clear();
        self.sync_phase_subscription();
        self.controller.abort();
        self.binding.borrow_mut().take();
    }
}

// =============================================================================
// Handle
// =============================================================================

/// A runner's view of its host node.
#[derive(Clone)]
pub struct MixinHandle {
    scope: ScopeId,
    shared: Rc<MixinShared>,
}

impl MixinHandle {
    pub(crate) fn new(scope: ScopeId, shared: Rc<MixinShared>) -> Self {
        Self { scope, shared }
    }

    pub fn scope(&self) -> ScopeId {
        self.scope
    }

    /// Listen for a lifecycle event in this runner's scope.
    pub fn add_event_listener(
        &self,
        kind: MixinEventKind,
        listener: impl Fn(&MixinEvent) + 'static,
    ) -> MixinListenerId {
        let id = MixinListenerId(self.shared.next_listener.get());
        self.shared.next_listener.set(id.0 + 1);
        if self.shared.torn_down.get() {
            return id;
        }
        self.shared.listeners.borrow_mut().push(ListenerEntry {
            id,
            scope: self.scope,
            kind,
            listener: Rc::new(listener),
        });
        self.shared.sync_phase_subscription();
        id
    }

    pub fn remove_event_listener(&self, id: MixinListenerId) {
        self.shared
            .listeners
            .borrow_mut()
            .retain(|entry| !(entry.id == id && entry.scope == self.scope));
        self.shared.sync_phase_subscription();
    }

    /// Listeners currently registered in this scope.
    pub fn listener_count(&self) -> usize {
        self.shared.listener_count(self.scope)
    }

    /// Tag of the host node this runner is attached to.
    pub fn host_type(&self) -> &str {
        &self.shared.host_type
    }

    /// Builder for a node of this host's type, for composing props:
    /// `handle.element().class("active").build()`.
    pub fn element(&self) -> HostBuilder {
        h(&*self.shared.host_type)
    }

    /// Aborted once, when the node is finally torn down. Not aborted by a
    /// deferred removal that gets reclaimed.
    pub fn signal(&self) -> AbortSignal {
        self.shared.controller.signal()
    }

    /// The DOM node, once bound.
    pub fn node(&self) -> Option<DomNode> {
        self.shared.binding.borrow().as_ref().map(|b| b.node.clone())
    }

    /// Ask for a re-render of the owning component. The returned future
    /// completes after the next commit pass that includes this node (or right
    /// away if the node is gone).
    pub fn update(&self) -> impl Future<Output = ()> + 'static {
        let (tx, rx) = oneshot::channel();
        if !self.shared.torn_down.get() {
            if let Some(cx) = self.shared.context() {
                self.shared.waiters.borrow_mut().push(tx);
                self.shared.sync_phase_subscription();
                scheduler::enqueue(&cx, self.shared.owner.get());
            }
        }
        async move {
            let _ = rx.await;
        }
    }

    /// Run `task` after the next commit.
    pub fn queue_task(&self, task: impl FnOnce() + 'static) {
        if let Some(cx) = self.shared.context() {
            scheduler::enqueue_tasks(&cx, vec![Box::new(task)]);
        }
    }

    /// Spawn a future on the root's event loop.
    pub fn spawn(&self, future: impl Future<Output = ()> + 'static) {
        if let Some(cx) = self.shared.context() {
            cx.event_loop.spawn(future);
        }
    }

    /// Defer removal of the node until `teardown` completes. Only valid while
    /// handling `BeforeRemove`; returns `false` (and drops `teardown`)
    /// otherwise. The signal passed to `teardown` aborts if the node is
    /// reclaimed first.
    pub fn persist_node<F>(&self, teardown: F) -> bool
    where
        F: FnOnce(AbortSignal) -> LocalBoxFuture<'static, ()> + 'static,
    {
        match self.shared.persist_requests.borrow_mut().as_mut() {
            Some(requests) => {
                requests.push(Box::new(teardown));
                true
            }
            None => {
                tracing::warn!(host = %self.shared.host_type, "persist_node called outside of BeforeRemove");
                false
            }
        }
    }
}

impl std::fmt::Debug for MixinHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MixinHandle")
            .field("scope", &self.scope)
            .field("host_type", &self.shared.host_type)
            .finish()
    }
}
