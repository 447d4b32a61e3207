//! Child-list diff - Keyed and unkeyed, one two-pass algorithm.
//!
//! Pass 1 matches every new child to at most one old child:
//! - keyed mode (any new child has a key): by key, through an old-key map
//! - unkeyed children: by position, only against an unkeyed old child
//! - a candidate must have the same concrete type and be unmatched
//!
//! Unmatched old children are removed before anything is placed.
//!
//! Pass 2 walks the new list in order with an `after` cursor (the last DOM
//! node placed so far). Each matched child is moved into place if needed and
//! then updated, each new child is inserted right after the cursor. A child
//! is in place when its first DOM node is the first live node after the
//! cursor; that probe decides moves, and the skew counter only marks
//! children known to have shifted so the probe can be skipped for them.
//!
//! ```text
//! old: a b c d        new: d a b c
//! pass 2: d (probe fails: moved to front), a ✓, b ✓, c ✓   → 1 move
//! ```

use std::collections::HashMap;

use super::range::{dom_range, last_dom, move_range, next_live_sibling, reference_after};
use super::{Placement, insert, remove, update};
use crate::dom::DomNode;
use crate::engine::node::Node;
use crate::engine::registry::InstanceId;
use crate::pipeline::context::RootContext;
use crate::types::{DiffFlags, Key, Namespace};

/// Diff `old` (children of `parent`) against `next`. Returns the new child
/// list. The range starts right after `after` (`None`: at the start of
/// `dom_parent`).
pub(crate) fn diff_children(
    cx: &RootContext,
    parent: InstanceId,
    dom_parent: &DomNode,
    namespace: Namespace,
    old: Vec<InstanceId>,
    next: &[Node],
    after: Option<DomNode>,
) -> Vec<InstanceId> {
    let matches = match_children(cx, &old, next);

    // Unmatched old children go first, so their DOM never sits between two
    // placed siblings.
    for id in &old {
        let matched = cx
            .tree
            .borrow()
            .get(*id)
            .is_some_and(|i| i.flags.contains(DiffFlags::MATCHED));
        if !matched {
            remove(cx, *id, true);
        }
    }

    let mut after = after;
    let mut out = Vec::with_capacity(next.len());
    for (node, matched) in next.iter().zip(matches) {
        let id = match matched {
            Some(id) => {
                place(cx, id, dom_parent, after.as_ref());
                update(cx, id, node.clone(), after.clone())
            }
            None => {
                let reference = reference_after(dom_parent, after.as_ref());
                let id = insert(
                    cx,
                    node.clone(),
                    Some(parent),
                    dom_parent,
                    namespace,
                    &mut Placement::Before(reference),
                );
                if let Some(instance) = cx.tree.borrow_mut().get_mut(id) {
                    instance.flags.insert(DiffFlags::MOUNTED);
                }
                id
            }
        };
        if let Some(last) = last_dom(&cx.tree.borrow(), id) {
            after = Some(last);
        }
        out.push(id);
    }

    let mut tree = cx.tree.borrow_mut();
    for id in &out {
        if let Some(instance) = tree.get_mut(*id) {
            instance.flags = DiffFlags::NONE;
        }
    }
    out
}

/// Pass 1. Flags matched old children `MATCHED` (and `NEEDS_PLACEMENT` when
/// the skew says they shifted) and returns the match for each new child.
fn match_children(cx: &RootContext, old: &[InstanceId], next: &[Node]) -> Vec<Option<InstanceId>> {
    let mut tree = cx.tree.borrow_mut();
    let old_nodes: Vec<Node> = old.iter().map(|id| tree[*id].node.clone()).collect();
    let keyed = next.iter().any(|node| node.key().is_some());

    let mut old_by_key: HashMap<&Key, usize> = HashMap::new();
    let mut last_new: HashMap<&Key, usize> = HashMap::new();
    if keyed {
        for (index, node) in old_nodes.iter().enumerate() {
            if let Some(key) = node.key() {
                old_by_key.insert(key, index);
            }
        }
        for (index, node) in next.iter().enumerate() {
            if let Some(key) = node.key() {
                if last_new.insert(key, index).is_some() {
                    tracing::warn!(key = %key, "duplicate key among siblings; the last one wins");
                }
            }
        }
    }

    let mut matched = vec![false; old.len()];
    let mut matches = vec![None; next.len()];
    let mut skew: isize = 0;

    for (index, node) in next.iter().enumerate() {
        let candidate = match node.key() {
            Some(key) if keyed => {
                // Only the last duplicate may claim the old node.
                if last_new.get(key) == Some(&index) {
                    old_by_key.get(key).copied()
                } else {
                    None
                }
            }
            _ => (index < old_nodes.len() && old_nodes[index].key().is_none()).then_some(index),
        };
        let candidate = candidate.filter(|&i| !matched[i] && old_nodes[i].same_type(node));

        let skewed = index as isize + skew;
        match candidate {
            None => {
                if next.len() > old.len() {
                    skew -= 1;
                } else if next.len() < old.len() {
                    skew += 1;
                }
            }
            Some(old_index) => {
                matched[old_index] = true;
                matches[index] = Some(old[old_index]);
                let instance = &mut tree[old[old_index]];
                instance.flags.insert(DiffFlags::MATCHED);

                let old_index = old_index as isize;
                if old_index != skewed {
                    if old_index == skewed + 1 {
                        skew += 1;
                    } else if old_index == skewed - 1 {
                        skew -= 1;
                    } else {
                        instance.flags.insert(DiffFlags::NEEDS_PLACEMENT);
                        if old_index > skewed {
                            skew -= 1;
                        } else {
                            skew += 1;
                        }
                    }
                }
            }
        }
    }
    matches
}

/// Move a matched child's DOM range to sit right after `after` unless it is
/// there already.
fn place(cx: &RootContext, id: InstanceId, dom_parent: &DomNode, after: Option<&DomNode>) {
    let (range, flagged) = {
        let tree = cx.tree.borrow();
        let flagged = tree[id].flags.contains(DiffFlags::NEEDS_PLACEMENT);
        (dom_range(&tree, id), flagged)
    };
    let Some(first) = range.first() else { return };
    if !flagged && next_live_sibling(cx, dom_parent, after).as_ref() == Some(first) {
        return;
    }
    if move_range(dom_parent, &range, after) {
        tracing::trace!(instance = ?id, nodes = range.len(), "moved child range");
    }
}
