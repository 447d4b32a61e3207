//! # spark-dom
//!
//! Keyed DOM reconciliation with composable mixins, batched updates,
//! server-DOM hydration and async frames.
//!
//! ## Architecture
//!
//! Each render produces an immutable [`Node`] tree. The reconciler walks it
//! against an arena of committed instances (one per node) and writes only the
//! difference to the DOM:
//!
//! ```text
//! Node tree → reconciler (arena diff) → DOM mutations → Commit
//!                  ▲
//!                  └── scheduler: component / mixin update requests
//! ```
//!
//! The DOM is the in-memory [`dom`] module: a single-threaded tree with
//! events, focus, selection and a mutation log.
//!
//! ## Modules
//!
//! - [`types`] - Keys, namespaces, prop values, diff flags
//! - [`dom`] - In-memory DOM, HTML parsing and serialization
//! - [`engine`] - Node model, component contract, instance arena, abort
//! - [`mixin`] - Host behaviors composed through the `mix` prop
//! - [`props`] - Attribute/property diff and controlled form reflection
//! - [`reconciler`] - Insert / update / remove, children diff, frames, hydration
//! - [`pipeline`] - Roots, scheduler, event loop
//! - [`state`] - Focus and selection preservation

pub mod config;
pub mod dom;
pub mod engine;
pub mod error;
pub mod mixin;
pub mod pipeline;
pub mod props;
pub mod reconciler;
pub mod state;
pub mod types;

// Re-export commonly used items
pub use types::{Key, Namespace, PropValue, Props, Style, Task};

pub use config::RuntimeConfig;

pub use dom::{Document, DomNode, Event, Mutation, MutationKind};

pub use engine::{
    AbortController, AbortSignal, Component, ComponentType, Node, Rendered, ScheduleUpdate, component, fragment,
    frame, h, keyed_component, keyed_fragment, props, text,
};

pub use error::{ComponentError, FrameError, MixinError, RenderError};

pub use mixin::builtin::{node_ref, on, on_async};
pub use mixin::{Mixin, MixinDescriptor, MixinEvent, MixinEventKind, MixinHandle, MixinResult};

pub use pipeline::{Root, create_root};

pub use reconciler::{FrameRequest, FrameResolver};
