//! State Module - Document state the reconciler preserves across passes.
//!
//! - **Focus** - Active element and selection capture/restore around a pass

pub mod focus;

pub use focus::{SelectionSnapshot, capture, restore};
