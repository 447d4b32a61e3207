//! Mixins - Composable behaviors attached to host nodes.
//!
//! A host node lists its behaviors in the `mix` prop. Each list position runs
//! one mixin *runner*, created by the mixin's constructor with a
//! [`MixinHandle`] scoped to that runner. The runtime keeps runners alive
//! across renders as long as the constructor at their position is unchanged,
//! so a mixin's internal state survives re-rendering.
//!
//! A runner is called on every render with its arguments and the props
//! composed so far, and may contribute more props (and more mixins) by
//! returning a node of the same host type:
//!
//! ```ignore
//! let tooltip = Mixin::new("tooltip", |handle: &MixinHandle, _host: &str| {
//!     let element = handle.clone();
//!     move |text: &String, _props: &Props| {
//!         MixinResult::Node(element.element().prop("title", text.as_str()).build())
//!     }
//! });
//!
//! h("button").mix([tooltip.with("Save".to_string())]).child("Save").build();
//! ```
//!
//! Lifecycle events reach a runner only through the listeners it added on
//! its own handle: `Insert`, `Reclaimed`, `BeforeUpdate`, `Commit`,
//! `BeforeRemove`, `Remove`.

pub mod builtin;
mod handle;
mod runtime;

use std::any::Any;
use std::marker::PhantomData;
use std::rc::Rc;

use crate::dom::DomNode;
use crate::engine::node::Node;
use crate::types::{Key, Props};

pub use handle::{MixinHandle, MixinListenerId, ScopeId};
pub use runtime::MixinRuntime;

// =============================================================================
// Events
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MixinEventKind {
    /// The node was inserted (or the runner was created on a bound node).
    Insert,
    /// A persisted node was reused by a new render instead of being removed.
    Reclaimed,
    /// A pass touching this node is about to mutate the DOM.
    BeforeUpdate,
    /// That pass finished mutating.
    Commit,
    /// The node is about to be removed. Listeners may call
    /// [`MixinHandle::persist_node`] to defer the removal.
    BeforeRemove,
    /// The runner is gone: its mixin left the `mix` list or the node was
    /// torn down.
    Remove,
}

/// A lifecycle event as seen by a runner.
#[derive(Debug, Clone)]
pub struct MixinEvent {
    pub kind: MixinEventKind,
    pub node: DomNode,
    pub parent: DomNode,
    pub key: Option<Key>,
}

// =============================================================================
// Results
// =============================================================================

/// What a runner returns from one render.
pub enum MixinResult {
    /// Contribute nothing.
    None,
    /// The host element itself, unchanged.
    Placeholder,
    /// A node of the same host type. Its props merge into the composed props
    /// (later wins) and its `mix` entries are appended to the queue.
    Node(Node),
    /// Another mixin to run after the queued ones.
    Mixin(MixinDescriptor),
}

impl From<Node> for MixinResult {
    fn from(node: Node) -> Self {
        MixinResult::Node(node)
    }
}

impl From<MixinDescriptor> for MixinResult {
    fn from(descriptor: MixinDescriptor) -> Self {
        MixinResult::Mixin(descriptor)
    }
}

impl From<()> for MixinResult {
    fn from(_: ()) -> Self {
        MixinResult::None
    }
}

// =============================================================================
// Constructors & Descriptors
// =============================================================================

/// Type-erased runner: positional arguments plus the props composed so far.
pub(crate) type ErasedRunner = Box<dyn FnMut(&dyn Any, &Props) -> MixinResult>;

struct ConstructorInner {
    name: String,
    setup: Box<dyn Fn(&MixinHandle, &str) -> ErasedRunner>,
}

/// Constructor identity. Runners are kept across renders while the
/// constructor at their position is the same pointer.
#[derive(Clone)]
pub struct MixinConstructor(Rc<ConstructorInner>);

impl MixinConstructor {
    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub(crate) fn construct(&self, handle: &MixinHandle, host_type: &str) -> ErasedRunner {
        (self.0.setup)(handle, host_type)
    }
}

impl PartialEq for MixinConstructor {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl std::fmt::Debug for MixinConstructor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MixinConstructor({})", self.0.name)
    }
}

/// One entry of a `mix` list: a constructor plus the arguments for this
/// render.
#[derive(Clone)]
pub struct MixinDescriptor {
    ctor: MixinConstructor,
    args: Rc<dyn Any>,
}

impl MixinDescriptor {
    pub fn constructor(&self) -> &MixinConstructor {
        &self.ctor
    }

    pub(crate) fn args(&self) -> &dyn Any {
        &*self.args
    }
}

impl std::fmt::Debug for MixinDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MixinDescriptor({})", self.ctor.name())
    }
}

/// A mixin taking arguments of type `A`.
///
/// Build it once (a `thread_local!` or a struct field) and call
/// [`Mixin::with`] every render. A `Mixin` built inside a render is a new
/// constructor each time, so its runners are recreated on every render.
pub struct Mixin<A> {
    ctor: MixinConstructor,
    _args: PhantomData<fn(&A)>,
}

impl<A: 'static> Mixin<A> {
    /// `setup` runs once per runner with the runner's handle and the host
    /// tag, and returns the per-render function.
    pub fn new<F, R>(name: &str, setup: F) -> Self
    where
        F: Fn(&MixinHandle, &str) -> R + 'static,
        R: FnMut(&A, &Props) -> MixinResult + 'static,
    {
        let setup = move |handle: &MixinHandle, host_type: &str| -> ErasedRunner {
            let mut run = setup(handle, host_type);
            Box::new(move |args: &dyn Any, props: &Props| match args.downcast_ref::<A>() {
                Some(args) => run(args, props),
                None => MixinResult::None,
            })
        };
        Self {
            ctor: MixinConstructor(Rc::new(ConstructorInner {
                name: name.to_string(),
                setup: Box::new(setup),
            })),
            _args: PhantomData,
        }
    }

    /// A descriptor for this render.
    pub fn with(&self, args: A) -> MixinDescriptor {
        MixinDescriptor {
            ctor: self.ctor.clone(),
            args: Rc::new(args),
        }
    }

    pub fn constructor(&self) -> &MixinConstructor {
        &self.ctor
    }
}

impl<A> Clone for Mixin<A> {
    fn clone(&self) -> Self {
        Self {
            ctor: self.ctor.clone(),
            _args: PhantomData,
        }
    }
}
