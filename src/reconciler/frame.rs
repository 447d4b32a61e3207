//! Frames - Async content boundaries rendered as a comment-marker range.
//!
//! ```text
//! <!-- rmx:f:3 -->  fallback, then resolved content  <!-- /rmx:f -->
//! ```
//!
//! On mount the fallback renders between the markers and resolution starts.
//! Every resolution carries a token; removal and re-resolution bump it and
//! abort the previous signal, so a stale result is dropped even if it settles.
//!
//! - `src`/`name` change before the first resolution: replace the frame
//! - `src`/`name` change after it: re-resolve in place, markers kept
//! - Hydration adopts a server range and hands its DOM to the first
//!   resolution instead of the fallback

use std::rc::Rc;

use futures::future::{Either, LocalBoxFuture, select};

use super::hydrate::{Cursor, find_frame_end, is_frame_start};
use super::{Placement, insert, remove, replace, update};
use crate::dom::DomNode;
use crate::engine::abort::{AbortController, AbortSignal};
use crate::engine::node::{FrameNode, Node};
use crate::engine::registry::{FrameInstance, Instance, InstanceId, InstanceKind};
use crate::error::FrameError;
use crate::pipeline::context::RootContext;
use crate::pipeline::scheduler;
use crate::types::Namespace;

// =============================================================================
// Resolver
// =============================================================================

/// What a frame asks its resolver for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameRequest {
    pub src: Rc<str>,
    pub name: Option<Rc<str>>,
}

/// Loads frame content.
pub trait FrameResolver {
    /// Resolve `request` to the tree to show. `signal` aborts when the
    /// result is no longer wanted.
    fn resolve(&self, request: FrameRequest, signal: AbortSignal) -> LocalBoxFuture<'static, Result<Node, FrameError>>;
}

impl<F> FrameResolver for F
where
    F: Fn(FrameRequest, AbortSignal) -> LocalBoxFuture<'static, Result<Node, FrameError>>,
{
    fn resolve(&self, request: FrameRequest, signal: AbortSignal) -> LocalBoxFuture<'static, Result<Node, FrameError>> {
        self(request, signal)
    }
}

// =============================================================================
// Insert
// =============================================================================

pub(crate) fn insert_frame(
    cx: &RootContext,
    node: Node,
    frame: &FrameNode,
    parent: Option<InstanceId>,
    dom_parent: &DomNode,
    namespace: Namespace,
    placement: &mut Placement,
) -> InstanceId {
    let (reference, adopted) = match placement {
        Placement::Before(reference) => (reference.clone(), None),
        Placement::Hydrate(cursor) => match adopt_server_range(cursor) {
            Some(range) => (None, Some(range)),
            None => {
                tracing::warn!(src = %frame.src, "hydration mismatch: expected a frame range");
                (cursor.insertion_point(), None)
            }
        },
    };

    if let Some((start, end)) = adopted {
        let id = cx.tree.borrow_mut().allocate(Instance::new(
            node,
            parent,
            dom_parent.clone(),
            namespace,
            InstanceKind::Frame(FrameInstance {
                start,
                end,
                token: cx.next_token(),
                controller: None,
                resolved: false,
                child: None,
                pending_hydration: true,
            }),
        ));
        start_resolution(cx, id);
        return id;
    }

    let start = cx.document.create_comment(&format!(" rmx:f:{} ", cx.next_frame_id()));
    let end = cx.document.create_comment(" /rmx:f ");
    dom_parent.insert_before(&start, reference.as_ref());
    dom_parent.insert_before(&end, reference.as_ref());

    let id = cx.tree.borrow_mut().allocate(Instance::new(
        node,
        parent,
        dom_parent.clone(),
        namespace,
        InstanceKind::Frame(FrameInstance {
            start,
            end: end.clone(),
            token: cx.next_token(),
            controller: None,
            resolved: false,
            child: None,
            pending_hydration: false,
        }),
    ));
    if let Some(fallback) = &frame.fallback {
        let child = insert(
            cx,
            fallback.clone(),
            Some(id),
            dom_parent,
            namespace,
            &mut Placement::Before(Some(end)),
        );
        set_child(cx, id, Some(child));
    }
    start_resolution(cx, id);
    id
}

/// Adopt a server frame range at the cursor and step past it.
fn adopt_server_range(cursor: &mut Cursor) -> Option<(DomNode, DomNode)> {
    let start = cursor.peek().filter(is_frame_start)?;
    let end = find_frame_end(&start)?;
    cursor.advance_past(&end);
    Some((start, end))
}

fn set_child(cx: &RootContext, id: InstanceId, child: Option<InstanceId>) {
    if let Some(frame) = cx.tree.borrow_mut().get_mut(id).and_then(|i| i.as_frame_mut()) {
        frame.child = child;
    }
}

// =============================================================================
// Update
// =============================================================================

pub(crate) fn update_frame(cx: &RootContext, id: InstanceId, node: Node, after: Option<DomNode>) -> InstanceId {
    let Node::Frame(next) = &node else {
        unreachable!("update_frame with a non-frame node");
    };
    let (same_source, resolved, pending_hydration, child, start, end, dom_parent, namespace) = {
        let tree = cx.tree.borrow();
        let instance = &tree[id];
        let Node::Frame(prev) = &instance.node else {
            unreachable!("frame instance holds a frame node");
        };
        let frame = instance.as_frame().expect("frame instance");
        (
            prev.src == next.src && prev.name == next.name,
            frame.resolved,
            frame.pending_hydration,
            frame.child,
            frame.start.clone(),
            frame.end.clone(),
            instance.dom_parent.clone(),
            instance.namespace,
        )
    };

    if !same_source && !resolved {
        return replace(cx, id, node, after);
    }

    cx.tree.borrow_mut()[id].node = node.clone();

    if !same_source {
        tracing::debug!(src = %next.src, "frame source changed, resolving again");
        start_resolution(cx, id);
        return id;
    }

    // Still on the fallback: keep it in sync with the new fallback tree.
    if !resolved && !pending_hydration {
        let child = match (child, next.fallback.clone()) {
            (Some(old), Some(fallback)) => Some(update(cx, old, fallback, Some(start))),
            (Some(old), None) => {
                remove(cx, old, true);
                None
            }
            (None, Some(fallback)) => Some(insert(
                cx,
                fallback,
                Some(id),
                &dom_parent,
                namespace,
                &mut Placement::Before(Some(end)),
            )),
            (None, None) => None,
        };
        set_child(cx, id, child);
    }
    id
}

// =============================================================================
// Resolution
// =============================================================================

/// Start (or restart) resolving `id`'s content, superseding any in-flight
/// resolution.
pub(crate) fn start_resolution(cx: &RootContext, id: InstanceId) {
    let request = {
        let tree = cx.tree.borrow();
        let Node::Frame(frame) = &tree[id].node else {
            unreachable!("frame instance holds a frame node");
        };
        FrameRequest {
            src: frame.src.clone(),
            name: frame.name.clone(),
        }
    };
    let Some(resolver) = cx.config.frame_resolver.clone() else {
        tracing::warn!(src = %request.src, "no frame resolver configured; keeping current frame content");
        return;
    };

    let controller = AbortController::new();
    let signal = controller.signal();
    let token = cx.next_token();
    let previous = {
        let mut tree = cx.tree.borrow_mut();
        let frame = tree[id].as_frame_mut().expect("frame instance");
        frame.token = token;
        frame.controller.replace(controller)
    };
    if let Some(previous) = previous {
        previous.abort();
    }

    let src = request.src.clone();
    let work = resolver.resolve(request, signal.clone());
    let weak = cx.weak();
    cx.event_loop.spawn(async move {
        let outcome = match select(work, signal.cancelled()).await {
            Either::Left((outcome, _)) => outcome,
            Either::Right(_) => {
                tracing::trace!(src = %src, "frame resolution aborted");
                return;
            }
        };
        let Some(cx) = weak.upgrade() else { return };
        if !is_current(&cx, id, token) {
            return;
        }
        match outcome {
            Ok(content) => apply_resolution(&cx, id, content),
            Err(err) => {
                if let Some(frame) = cx.tree.borrow_mut().get_mut(id).and_then(|i| i.as_frame_mut()) {
                    frame.controller = None;
                }
                cx.report(err.into());
            }
        }
    });
}

fn is_current(cx: &RootContext, id: InstanceId, token: u64) -> bool {
    !cx.is_unmounted()
        && cx
            .tree
            .borrow()
            .get(id)
            .and_then(|i| i.as_frame())
            .is_some_and(|frame| frame.token == token)
}

/// Show resolved `content` in the frame's range.
fn apply_resolution(cx: &RootContext, id: InstanceId, content: Node) {
    let (start, end, child, resolved, pending_hydration, dom_parent, namespace) = {
        let mut tree = cx.tree.borrow_mut();
        let instance = &mut tree[id];
        let dom_parent = instance.dom_parent.clone();
        let namespace = instance.namespace;
        let frame = instance.as_frame_mut().expect("frame instance");
        frame.controller = None;
        (
            frame.start.clone(),
            frame.end.clone(),
            frame.child,
            frame.resolved,
            frame.pending_hydration,
            dom_parent,
            namespace,
        )
    };

    scheduler::run_pass(cx, std::slice::from_ref(&dom_parent), || {
        let child = if pending_hydration {
            let mut placement = Placement::Hydrate(Cursor::bounded(start.next_sibling(), end.clone()));
            let child = insert(cx, content, Some(id), &dom_parent, namespace, &mut placement);
            if let Placement::Hydrate(cursor) = placement {
                cursor.remove_trailing();
            }
            child
        } else if !resolved {
            if let Some(fallback) = child {
                remove(cx, fallback, true);
            }
            insert(cx, content, Some(id), &dom_parent, namespace, &mut Placement::Before(Some(end)))
        } else {
            match child {
                Some(old) => update(cx, old, content, Some(start)),
                None => insert(cx, content, Some(id), &dom_parent, namespace, &mut Placement::Before(Some(end))),
            }
        };

        if let Some(frame) = cx.tree.borrow_mut().get_mut(id).and_then(|i| i.as_frame_mut()) {
            frame.child = Some(child);
            frame.resolved = true;
            frame.pending_hydration = false;
        }
    });
    tracing::debug!(frame = ?id, "frame resolved");
}

// =============================================================================
// Remove
// =============================================================================

pub(crate) fn remove_frame(cx: &RootContext, id: InstanceId, detach: bool) {
    let (child, start, end, controller) = {
        let mut tree = cx.tree.borrow_mut();
        let token = cx.next_token();
        let frame = tree[id].as_frame_mut().expect("frame instance");
        frame.token = token;
        (
            frame.child.take(),
            frame.start.clone(),
            frame.end.clone(),
            frame.controller.take(),
        )
    };
    if let Some(controller) = controller {
        controller.abort();
    }

    if let Some(child) = child {
        remove(cx, child, false);
    }
    if detach {
        // Everything between the markers goes, server DOM and persisted
        // nodes included.
        let mut current = Some(start);
        while let Some(node) = current {
            let done = node == end;
            current = if done { None } else { node.next_sibling() };
            node.remove();
        }
    }
    cx.tree.borrow_mut().release(id);
}
