//! Engine - Node model, component contract and the instance arena.
//!
//! - Node: immutable per-render tree (`Text`, `Host`, `Fragment`,
//!   `Component`, `Frame`) plus builders
//! - Component: the handle contract the reconciler drives
//! - Registry: arena of committed instances, addressed by generational ids
//! - Abort: cancellation tokens threaded through every async boundary
//!
//! # Architecture
//!
//! Nodes describe; instances own. A render produces a fresh node tree, and
//! the reconciler walks it against the arena, where each instance keeps the
//! node it last rendered as its diff baseline:
//!
//! ```text
//! Node (this render)          Instance (committed)
//! Host "ul"              ───▶ #0 Host  dom=<ul>  children=[#1, #2]
//!   Host "li" key=a      ───▶ #1 Host  dom=<li>  parent=#0
//!   Host "li" key=b      ───▶ #2 Host  dom=<li>  parent=#0
//! ```

pub mod abort;
pub mod component;
pub mod node;
pub mod registry;

pub use abort::{AbortController, AbortSignal};
pub use component::{Component, ComponentType, RenderFn, Rendered, ScheduleUpdate};
pub use node::*;
pub use registry::{InstanceId, Tree};
