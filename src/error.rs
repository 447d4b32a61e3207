//! Error types.
//!
//! Programming-invariant violations panic. Everything here is recoverable and
//! reported: render errors go to `tracing` and to the root's error
//! subscribers, mixin contract violations are logged and ignored.

use thiserror::Error;

/// Failure returned by a component's `render`.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ComponentError {
    pub message: String,
}

impl ComponentError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

/// Failure resolving frame content.
#[derive(Debug, Clone, Error)]
pub enum FrameError {
    #[error("frame content for `{src}` could not be loaded: {reason}")]
    Load { src: String, reason: String },
    #[error("frame resolution for `{src}` was aborted")]
    Aborted { src: String },
}

/// Errors reported through a root's error channel.
#[derive(Debug, Clone, Error)]
pub enum RenderError {
    #[error("component `{component}` failed to render: {source}")]
    Component {
        component: String,
        #[source]
        source: ComponentError,
    },

    #[error("maximum update depth exceeded: {count} cascading flushes (limit {limit})")]
    CascadeLimit { count: usize, limit: usize },

    #[error("deferred task panicked: {message}")]
    TaskPanicked { message: String },

    #[error(transparent)]
    Frame(#[from] FrameError),
}

/// Mixin contract violations. Logged, never propagated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MixinError {
    #[error("mixin `{mixin}` returned a `{found}` node for a `{expected}` host")]
    WrongHostType {
        mixin: String,
        expected: String,
        found: String,
    },

    #[error("mixin `{mixin}` returned a non-host node")]
    NotAHostNode { mixin: String },

    #[error("mixin descriptor limit of {limit} reached; remaining descriptors were dropped")]
    DescriptorLimit { limit: usize },
}
