//! Built-in mixins - Event wiring and node refs.
//!
//! ```ignore
//! h("button")
//!     .mix([
//!         on("click", move |_| count.set(count.get() + 1)),
//!         node_ref(move |node, _signal| button.set(Some(node.clone()))),
//!     ])
//!     .build();
//! ```

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use futures::future::{Either, LocalBoxFuture, select};

use super::{Mixin, MixinDescriptor, MixinEventKind, MixinHandle, MixinResult};
use crate::dom::{DomNode, Event, ListenerId};
use crate::engine::abort::{AbortController, AbortSignal};
use crate::types::Props;

// =============================================================================
// on
// =============================================================================

type AsyncHandler = Rc<dyn Fn(&Event, AbortSignal) -> LocalBoxFuture<'static, ()>>;

#[derive(Clone)]
enum Handler {
    Sync(Rc<dyn Fn(&Event)>),
    Async(AsyncHandler),
}

#[derive(Clone)]
struct OnArgs {
    event_type: Rc<str>,
    handler: Handler,
}

/// The DOM listener an `on` runner currently owns.
struct Attached {
    node: DomNode,
    event_type: Rc<str>,
    id: ListenerId,
}

struct OnState {
    args: RefCell<Option<OnArgs>>,
    attached: RefCell<Option<Attached>>,
    /// Controller of the in-flight async invocation.
    in_flight: RefCell<Option<AbortController>>,
}

impl OnState {
    fn attach(self: &Rc<Self>, node: &DomNode, handle: &MixinHandle) {
        let Some(event_type) = self.args.borrow().as_ref().map(|a| a.event_type.clone()) else {
            return;
        };
        if let Some(attached) = self.attached.borrow().as_ref() {
            if &attached.node == node && attached.event_type == event_type {
                return;
            }
        }
        self.detach();

        let state = Rc::downgrade(self);
        let handle = handle.clone();
        let id = node.add_event_listener(
            &event_type,
            Rc::new(move |event: &Event| {
                if let Some(state) = state.upgrade() {
                    state.fire(event, &handle);
                }
            }),
        );
        *self.attached.borrow_mut() = Some(Attached {
            node: node.clone(),
            event_type,
            id,
        });
    }

    fn detach(&self) {
        if let Some(attached) = self.attached.borrow_mut().take() {
            attached.node.remove_event_listener(attached.id);
        }
        self.abort_in_flight();
    }

    fn abort_in_flight(&self) {
        if let Some(controller) = self.in_flight.borrow_mut().take() {
            controller.abort();
        }
    }

    /// Call the latest handler.
    fn fire(&self, event: &Event, handle: &MixinHandle) {
        let Some(handler) = self.args.borrow().as_ref().map(|a| a.handler.clone()) else {
            return;
        };
        match handler {
            Handler::Sync(handler) => handler(event),
            Handler::Async(handler) => {
                // A new occurrence supersedes the previous invocation.
                self.abort_in_flight();
                let controller = AbortController::new();
                let signal = controller.signal();
                *self.in_flight.borrow_mut() = Some(controller);

                let work = handler(event, signal.clone());
                handle.spawn(async move {
                    if let Either::Right(_) = select(work, signal.cancelled()).await {
                        tracing::trace!("async event handler aborted");
                    }
                });
            }
        }
    }
}

thread_local! {
    static ON: Mixin<OnArgs> = Mixin::new("on", |handle: &MixinHandle, _host: &str| {
        let state = Rc::new(OnState {
            args: RefCell::new(None),
            attached: RefCell::new(None),
            in_flight: RefCell::new(None),
        });

        for kind in [MixinEventKind::Insert, MixinEventKind::Reclaimed] {
            let state = state.clone();
            let listener_handle = handle.clone();
            handle.add_event_listener(kind, move |event| state.attach(&event.node, &listener_handle));
        }
        {
            let state = state.clone();
            handle.add_event_listener(MixinEventKind::Remove, move |_| state.detach());
        }

        let handle = handle.clone();
        move |args: &OnArgs, _props: &Props| {
            *state.args.borrow_mut() = Some(args.clone());
            // The event type may have changed since the listener was added.
            if let Some(node) = handle.node() {
                state.attach(&node, &handle);
            }
            MixinResult::None
        }
    });
}

/// Listen for DOM `event_type` on the host node. The newest handler is always
/// the one called; the listener is removed with the mixin.
pub fn on(event_type: &str, handler: impl Fn(&Event) + 'static) -> MixinDescriptor {
    ON.with(|mixin| {
        mixin.with(OnArgs {
            event_type: event_type.into(),
            handler: Handler::Sync(Rc::new(handler)),
        })
    })
}

/// Like [`on`], for async handlers. Each occurrence of the event aborts the
/// signal of the previous, still running invocation.
pub fn on_async<F>(event_type: &str, handler: F) -> MixinDescriptor
where
    F: Fn(&Event, AbortSignal) -> LocalBoxFuture<'static, ()> + 'static,
{
    ON.with(|mixin| {
        mixin.with(OnArgs {
            event_type: event_type.into(),
            handler: Handler::Async(Rc::new(handler)),
        })
    })
}

// =============================================================================
// node_ref
// =============================================================================

type RefCallback = Rc<dyn Fn(&DomNode, AbortSignal)>;

thread_local! {
    static NODE_REF: Mixin<RefCallback> = Mixin::new("ref", |handle: &MixinHandle, _host: &str| {
        let latest: Rc<RefCell<Option<RefCallback>>> = Rc::new(RefCell::new(None));
        let delivered = Rc::new(Cell::new(false));

        for kind in [MixinEventKind::Insert, MixinEventKind::Reclaimed] {
            let (latest, delivered) = (latest.clone(), delivered.clone());
            let signal = handle.signal();
            handle.add_event_listener(kind, move |event| {
                let callback = latest.borrow().clone();
                if let Some(callback) = callback {
                    delivered.set(true);
                    callback(&event.node, signal.clone());
                }
            });
        }

        let handle = handle.clone();
        move |callback: &RefCallback, _props: &Props| {
            *latest.borrow_mut() = Some(callback.clone());
            // Added to a node that was already bound: `Insert` fired before
            // the first run, with no callback yet.
            if !delivered.get() {
                if let Some(node) = handle.node() {
                    delivered.set(true);
                    callback(&node, handle.signal());
                }
            }
            MixinResult::None
        }
    });
}

/// Receive the host's DOM node on insert and on reclaim, with the node's
/// lifetime signal.
pub fn node_ref(callback: impl Fn(&DomNode, AbortSignal) + 'static) -> MixinDescriptor {
    NODE_REF.with(|mixin| mixin.with(Rc::new(callback) as RefCallback))
}
