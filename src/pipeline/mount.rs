//! Mount API - Root lifecycle.
//!
//! A [`Root`] owns one container element and everything rendered into it.
//! Rendering is synchronous; work that components and mixins schedule runs
//! on the root's event loop, driven by [`Root::settle`] (or the finer
//! [`Root::run_microtasks`] / [`Root::turn`]).
//!
//! # Example
//!
//! ```ignore
//! use spark_dom::{create_root, h, text, Document, RuntimeConfig};
//!
//! let document = Document::new();
//! let root = create_root(&document, &document.body(), RuntimeConfig::default());
//!
//! root.render(h("p").child(text("hello")));
//! root.settle();
//!
//! // Clean up (also happens on drop)
//! root.unmount();
//! ```

use std::rc::Rc;

use super::context::RootContext;
use super::event_loop::EventLoop;
use super::scheduler;
use crate::config::RuntimeConfig;
use crate::dom::{Document, DomNode};
use crate::engine::node::Node;
use crate::error::RenderError;
use crate::reconciler::hydrate::Cursor;
use crate::reconciler::range::position_after;
use crate::reconciler::remove::finalize_all_persisted;
use crate::reconciler::{self, Placement};
use crate::types::Namespace;

// =============================================================================
// Root
// =============================================================================

/// Handle to a mounted tree. Dropping it unmounts.
pub struct Root {
    cx: Rc<RootContext>,
}

/// Create a root rendering into `container`.
pub fn create_root(document: &Document, container: &DomNode, config: RuntimeConfig) -> Root {
    tracing::debug!(?config, "creating root");
    Root {
        cx: RootContext::new(document.clone(), container.clone(), config),
    }
}

impl Root {
    /// Render `node`, diffing against the previous render.
    pub fn render(&self, node: impl Into<Node>) {
        if self.cx.is_unmounted() {
            tracing::warn!("render called on an unmounted root");
            return;
        }
        let node = node.into();
        let cx = &self.cx;
        let container = cx.container.clone();
        scheduler::run_pass(cx, std::slice::from_ref(&container), || {
            let prev = cx.root.get();
            let after = prev.and_then(|root| position_after(cx, root));
            let root = reconciler::diff(cx, prev, node, None, &container, container_namespace(&container), after);
            cx.root.set(Some(root));
        });
    }

    /// Adopt the server-rendered DOM already inside the container instead of
    /// creating it. Unmatched trailing nodes are removed. On a root that has
    /// rendered before this is a plain [`render`](Self::render).
    pub fn hydrate(&self, node: impl Into<Node>) {
        if self.cx.root.get().is_some() {
            self.render(node);
            return;
        }
        if self.cx.is_unmounted() {
            tracing::warn!("hydrate called on an unmounted root");
            return;
        }
        let node = node.into();
        let cx = &self.cx;
        let container = cx.container.clone();
        scheduler::run_pass(cx, std::slice::from_ref(&container), || {
            let mut placement = Placement::Hydrate(Cursor::new(container.first_child()));
            let root = reconciler::insert(cx, node, None, &container, container_namespace(&container), &mut placement);
            if let Placement::Hydrate(cursor) = placement {
                cursor.remove_trailing();
            }
            cx.root.set(Some(root));
        });
    }

    /// Run the event loop until nothing is queued: scheduler flushes,
    /// deferred tasks, frame resolutions, deferred removals.
    pub fn settle(&self) {
        self.cx.event_loop.run_until_idle();
    }

    /// Run one microtask checkpoint (scheduler flushes and ready futures).
    pub fn run_microtasks(&self) {
        self.cx.event_loop.run_microtasks();
    }

    /// Run one event-loop turn. Returns `false` if there was nothing to do.
    pub fn turn(&self) -> bool {
        self.cx.event_loop.turn()
    }

    /// Subscribe to reported render errors.
    pub fn on_error(&self, listener: impl Fn(&RenderError) + 'static) {
        self.cx.on_error(Rc::new(listener));
    }

    pub fn document(&self) -> &Document {
        self.cx.document()
    }

    pub fn container(&self) -> &DomNode {
        &self.cx.container
    }

    pub fn event_loop(&self) -> Rc<EventLoop> {
        self.cx.event_loop.clone()
    }

    /// Live instances in the root's arena.
    pub fn instance_count(&self) -> usize {
        self.cx.tree.borrow().len()
    }

    /// Nodes whose removal is currently deferred by a mixin.
    pub fn persisted_count(&self) -> usize {
        self.cx.persisted.borrow().len()
    }

    /// Whether a scheduler flush or deferred work is pending.
    pub fn has_pending_updates(&self) -> bool {
        !self.cx.scheduler.borrow().is_idle()
    }

    /// Tear everything down and empty the container.
    pub fn unmount(self) {
        // Drop does the work.
    }

    fn teardown(&self) {
        if self.cx.is_unmounted() {
            return;
        }
        self.cx.mark_unmounted();
        self.cx.scheduler.borrow_mut().clear();
        if let Some(root) = self.cx.root.take() {
            reconciler::remove(&self.cx, root, true);
        }
        finalize_all_persisted(&self.cx);
        tracing::debug!(remaining = self.cx.tree.borrow().len(), "root unmounted");
    }
}

impl Drop for Root {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn container_namespace(container: &DomNode) -> Namespace {
    match (container.namespace(), container.tag_name()) {
        (Some(namespace), Some(tag)) => namespace.for_children(&tag),
        _ => Namespace::Html,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::markup::inner_html;
    use crate::engine::node::{h, text};

    #[test]
    fn test_render_and_rerender() {
        let doc = Document::new();
        let container = doc.create_element("div");
        let root = create_root(&doc, &container, RuntimeConfig::default());

        root.render(h("p").class("a").child(text("one")));
        assert_eq!(inner_html(&container), r#"<p class="a">one</p>"#);
        let p = container.first_child().unwrap();

        root.render(h("p").class("b").child(text("two")));
        assert_eq!(inner_html(&container), r#"<p class="b">two</p>"#);
        assert_eq!(container.first_child(), Some(p));
    }

    #[test]
    fn test_replace_on_type_change() {
        let doc = Document::new();
        let container = doc.create_element("div");
        let root = create_root(&doc, &container, RuntimeConfig::default());

        root.render(h("p").child(text("x")));
        root.render(h("span").child(text("y")));
        assert_eq!(inner_html(&container), "<span>y</span>");
        assert_eq!(root.instance_count(), 2);
    }

    #[test]
    fn test_unmount_empties_container() {
        let doc = Document::new();
        let container = doc.create_element("div");
        let root = create_root(&doc, &container, RuntimeConfig::default());
        root.render(h("ul").children([h("li").child(text("a")), h("li").child(text("b"))]));
        root.unmount();
        assert!(container.first_child().is_none());
    }

    #[test]
    fn test_svg_container_namespace() {
        let doc = Document::new();
        let svg = doc.create_element_ns(Namespace::Svg, "svg");
        assert_eq!(container_namespace(&svg), Namespace::Svg);
        assert_eq!(container_namespace(&doc.create_element("div")), Namespace::Html);
    }
}
