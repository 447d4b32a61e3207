//! Pipeline - Roots, the event loop and the update scheduler.
//!
//! # Pipeline Architecture
//!
//! ```text
//! Root::render ─┐
//!               ├─▶ run_pass: BeforeUpdate ─▶ reconcile ─▶ focus restore ─▶ Commit
//! scheduler ────┘        ▲
//!                        └── microtask flush of batched component/mixin updates
//! ```
//!
//! ## Data Flow
//!
//! 1. **mount** - `Root` owns a container and drives synchronous renders
//! 2. **scheduler** - batches update requests, flushes them as one pass per
//!    microtask, caps cascades, runs deferred tasks after the pass
//! 3. **event_loop** - microtasks, macrotasks and spawned futures
//! 4. **context** - per-root state shared by everything above

pub mod context;
pub mod event_loop;
pub mod mount;
pub mod scheduler;

// Re-exports
pub use context::Phase;
pub use event_loop::EventLoop;
pub use mount::{Root, create_root};
pub use scheduler::UpdateTarget;
