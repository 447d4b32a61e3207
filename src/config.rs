//! Runtime configuration, one per root.
//!
//! ```ignore
//! let config = RuntimeConfig::default()
//!     .with_max_cascade(20)
//!     .with_frame_resolver(Rc::new(MyResolver));
//! let root = create_root(&document, &container, config);
//! ```

use std::rc::Rc;

use crate::reconciler::FrameResolver;

/// Default ceiling on back-to-back scheduler flushes within one event-loop
/// turn.
pub const DEFAULT_MAX_CASCADE: usize = 50;

/// Default cap on mixin descriptor positions processed per resolve.
pub const DEFAULT_MAX_MIXIN_DESCRIPTORS: usize = 1024;

#[derive(Clone)]
pub struct RuntimeConfig {
    /// Flushes allowed before the scheduler reports a runaway update loop.
    pub max_cascade: usize,
    /// Descriptor positions processed per mixin resolve (nested mixin output
    /// included).
    pub max_mixin_descriptors: usize,
    /// Hoist `<head>` children and `title/meta/link/style` into
    /// `document.head`.
    pub hoist_head: bool,
    /// Loads frame content. Without one, frames keep showing their fallback.
    pub frame_resolver: Option<Rc<dyn FrameResolver>>,
}

impl RuntimeConfig {
    pub fn with_max_cascade(mut self, max_cascade: usize) -> Self {
        self.max_cascade = max_cascade;
        self
    }

    pub fn with_max_mixin_descriptors(mut self, max: usize) -> Self {
        self.max_mixin_descriptors = max;
        self
    }

    pub fn with_hoist_head(mut self, hoist: bool) -> Self {
        self.hoist_head = hoist;
        self
    }

    pub fn with_frame_resolver(mut self, resolver: Rc<dyn FrameResolver>) -> Self {
        self.frame_resolver = Some(resolver);
        self
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_cascade: DEFAULT_MAX_CASCADE,
            max_mixin_descriptors: DEFAULT_MAX_MIXIN_DESCRIPTORS,
            hoist_head: true,
            frame_resolver: None,
        }
    }
}

impl std::fmt::Debug for RuntimeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeConfig")
            .field("max_cascade", &self.max_cascade)
            .field("max_mixin_descriptors", &self.max_mixin_descriptors)
            .field("hoist_head", &self.hoist_head)
            .field("frame_resolver", &self.frame_resolver.is_some())
            .finish()
    }
}
