//! DOM ranges - Which DOM nodes an instance occupies, and where its slot is.
//!
//! An instance's range is the ordered run of top-level DOM nodes it owns
//! inside its DOM parent:
//!
//! | Kind      | Range                                     |
//! |-----------|-------------------------------------------|
//! | Text      | its text node                             |
//! | Host      | its element (empty when hoisted)          |
//! | Fragment  | concatenation of its children's ranges    |
//! | Component | its child's range                         |
//! | Frame     | start marker through end marker           |

use crate::dom::DomNode;
use crate::engine::registry::{InstanceId, InstanceKind, Tree};
use crate::pipeline::context::RootContext;

/// Top-level DOM nodes of `id`, in order.
pub(crate) fn dom_range(tree: &Tree, id: InstanceId) -> Vec<DomNode> {
    let mut out = Vec::new();
    collect(tree, id, &mut out);
    out
}

fn collect(tree: &Tree, id: InstanceId, out: &mut Vec<DomNode>) {
    let Some(instance) = tree.get(id) else { return };
    match &instance.kind {
        InstanceKind::Text(dom) => out.push(dom.clone()),
        InstanceKind::Host(host) => {
            if !host.hoisted && !host.document_head {
                out.push(host.dom.clone());
            }
        }
        InstanceKind::Fragment(children) => {
            for child in children {
                collect(tree, *child, out);
            }
        }
        InstanceKind::Component(component) => {
            if let Some(child) = component.child {
                collect(tree, child, out);
            }
        }
        InstanceKind::Frame(frame) => {
            let mut current = Some(frame.start.clone());
            while let Some(node) = current {
                let done = node == frame.end;
                current = if done { None } else { node.next_sibling() };
                out.push(node);
            }
        }
    }
}

pub(crate) fn first_dom(tree: &Tree, id: InstanceId) -> Option<DomNode> {
    let instance = tree.get(id)?;
    match &instance.kind {
        InstanceKind::Text(dom) => Some(dom.clone()),
        InstanceKind::Host(host) => (!host.hoisted && !host.document_head).then(|| host.dom.clone()),
        InstanceKind::Fragment(children) => children.iter().find_map(|child| first_dom(tree, *child)),
        InstanceKind::Component(component) => component.child.and_then(|child| first_dom(tree, child)),
        InstanceKind::Frame(frame) => Some(frame.start.clone()),
    }
}

pub(crate) fn last_dom(tree: &Tree, id: InstanceId) -> Option<DomNode> {
    let instance = tree.get(id)?;
    match &instance.kind {
        InstanceKind::Text(dom) => Some(dom.clone()),
        InstanceKind::Host(host) => (!host.hoisted && !host.document_head).then(|| host.dom.clone()),
        InstanceKind::Fragment(children) => children.iter().rev().find_map(|child| last_dom(tree, *child)),
        InstanceKind::Component(component) => component.child.and_then(|child| last_dom(tree, child)),
        InstanceKind::Frame(frame) => Some(frame.end.clone()),
    }
}

/// First DOM node after `id`'s slot that belongs to a later sibling (or to
/// an enclosing frame's end marker). `None` means the slot is at the end of
/// the DOM parent.
pub(crate) fn insertion_anchor(tree: &Tree, id: InstanceId) -> Option<DomNode> {
    let mut current = id;
    loop {
        let parent = tree.get(current)?.parent?;
        let parent_instance = tree.get(parent)?;
        match &parent_instance.kind {
            InstanceKind::Host(host) => {
                return later_sibling_dom(tree, &host.children, current);
            }
            InstanceKind::Fragment(children) => {
                if let Some(dom) = later_sibling_dom(tree, children, current) {
                    return Some(dom);
                }
            }
            InstanceKind::Frame(frame) => return Some(frame.end.clone()),
            InstanceKind::Component(_) => {}
            InstanceKind::Text(_) => return None,
        }
        current = parent;
    }
}

fn later_sibling_dom(tree: &Tree, siblings: &[InstanceId], id: InstanceId) -> Option<DomNode> {
    let index = siblings.iter().position(|sibling| *sibling == id)?;
    siblings[index + 1..]
        .iter()
        .find_map(|sibling| first_dom(tree, *sibling))
}

/// The DOM node right before `id`'s slot, or `None` when the slot starts
/// the DOM parent. This is the `after` cursor for re-diffing `id` in place.
pub(crate) fn position_after(cx: &RootContext, id: InstanceId) -> Option<DomNode> {
    let tree = cx.tree.borrow();
    if let Some(first) = first_dom(&tree, id) {
        return first.previous_sibling();
    }
    match insertion_anchor(&tree, id) {
        Some(anchor) => anchor.previous_sibling(),
        None => tree.get(id)?.dom_parent.last_child(),
    }
}

/// Node to insert before so new DOM lands right after `after`.
pub(crate) fn reference_after(dom_parent: &DomNode, after: Option<&DomNode>) -> Option<DomNode> {
    match after {
        Some(after) => after.next_sibling(),
        None => dom_parent.first_child(),
    }
}

/// Like [`reference_after`], skipping nodes kept alive by a deferred
/// removal. This is where a correctly placed sibling's range must start.
pub(crate) fn next_live_sibling(cx: &RootContext, dom_parent: &DomNode, after: Option<&DomNode>) -> Option<DomNode> {
    let mut current = reference_after(dom_parent, after);
    while let Some(node) = current {
        if !cx.is_persisted(&node) {
            return Some(node);
        }
        current = node.next_sibling();
    }
    None
}

/// Move every node of `range` so it sits right after `after`. Nothing moves
/// when the target position is inside the range already.
pub(crate) fn move_range(dom_parent: &DomNode, range: &[DomNode], after: Option<&DomNode>) -> bool {
    let reference = reference_after(dom_parent, after);
    if reference.as_ref().is_some_and(|r| range.contains(r)) {
        return false;
    }
    for node in range {
        dom_parent.insert_before(node, reference.as_ref());
    }
    true
}
