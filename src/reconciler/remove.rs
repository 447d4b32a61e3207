//! Removal - Depth-first teardown, deferred removal and reclaim.
//!
//! `remove(id, detach)` tears an instance down bottom-up. `detach` is set
//! for the top of a removed subtree only: descendants leave the DOM with
//! their ancestor's element, except hoisted elements which always detach
//! themselves.
//!
//! A top-level host whose mixins call `persist_node` during `BeforeRemove`
//! is not torn down yet:
//!
//! ```text
//! remove ──▶ Persisted (in DOM, off the tree) ──teardowns settle──▶ finalized
//!                 │
//!                 └──keyed insert of same (tag, key, dom parent)──▶ Reclaimed
//! ```

use std::rc::Rc;

use futures::future::join_all;

use super::Placement;
use crate::dom::DomNode;
use crate::engine::node::{HostNode, Node, NodeKind};
use crate::engine::registry::{InstanceId, InstanceKind};
use crate::pipeline::context::{PersistedEntry, RootContext};
use crate::pipeline::scheduler;

pub(crate) fn remove(cx: &RootContext, id: InstanceId, detach: bool) {
    let Some((kind, children)) = cx.tree.borrow().get(id).map(|i| (i.node.kind(), i.children())) else {
        return;
    };
    match kind {
        NodeKind::Text => {
            let instance = cx.tree.borrow_mut().release(id);
            if let Some(InstanceKind::Text(dom)) = instance.map(|i| i.kind) {
                if detach {
                    dom.remove();
                }
            }
        }
        NodeKind::Host => remove_host(cx, id, detach),
        NodeKind::Fragment => {
            for child in children {
                remove(cx, child, detach);
            }
            cx.tree.borrow_mut().release(id);
        }
        NodeKind::Component => {
            for child in children {
                remove(cx, child, detach);
            }
            let instance = cx.tree.borrow_mut().release(id);
            if let Some(InstanceKind::Component(component)) = instance.map(|i| i.kind) {
                let tasks = component.handle.borrow_mut().remove();
                scheduler::enqueue_tasks(cx, tasks);
            }
        }
        NodeKind::Frame => super::frame::remove_frame(cx, id, detach),
    }
}

// =============================================================================
// Hosts
// =============================================================================

fn remove_host(cx: &RootContext, id: InstanceId, detach: bool) {
    let (runtime, hoisted) = {
        let tree = cx.tree.borrow();
        let host = tree[id].as_host().expect("host instance");
        (host.mixins.clone(), host.hoisted)
    };

    if detach && !cx.is_unmounted() {
        if let Some(runtime) = &runtime {
            if let Some(teardowns) = runtime.prepare_removal() {
                persist(cx, id, teardowns);
                return;
            }
        }
    }
    finalize_host(cx, id, detach || hoisted);
}

/// Tear a host down for good: children, mixins, controlled reflection, DOM.
pub(crate) fn finalize_host(cx: &RootContext, id: InstanceId, detach_dom: bool) {
    let (children, document_head) = {
        let tree = cx.tree.borrow();
        let Some(host) = tree.get(id).and_then(|i| i.as_host()) else {
            return;
        };
        (host.children.clone(), host.document_head)
    };

    // Children of the document head host live in `document.head`, not
    // inside an element that is about to go.
    for child in children {
        remove(cx, child, document_head);
    }

    let Some(instance) = cx.tree.borrow_mut().release(id) else {
        return;
    };
    let InstanceKind::Host(host) = instance.kind else {
        unreachable!("finalize_host on a non-host instance");
    };
    if let Some(runtime) = &host.mixins {
        runtime.teardown();
    }
    if let Some(controlled) = host.controlled {
        controlled.teardown();
    }
    if let Some(token) = host.persisted {
        cx.persisted.borrow_mut().shift_remove(&token);
    }
    if host.hoisted {
        cx.head_claims.borrow_mut().remove(&host.dom);
    }
    if detach_dom && !host.document_head {
        host.dom.remove();
    }
}

fn persist(cx: &RootContext, id: InstanceId, teardowns: Vec<futures::future::LocalBoxFuture<'static, ()>>) {
    let token = cx.next_token();
    let entry = {
        let mut tree = cx.tree.borrow_mut();
        let instance = &mut tree[id];
        instance.parent = None;
        let dom_parent = instance.dom_parent.clone();
        let (tag, key) = match &instance.node {
            Node::Host(node) => (node.tag.clone(), node.key.clone()),
            _ => unreachable!("persisted instance is a host"),
        };
        let host = instance.as_host_mut().expect("host instance");
        host.persisted = Some(token);
        PersistedEntry {
            id,
            dom: host.dom.clone(),
            dom_parent,
            tag,
            key,
        }
    };
    tracing::debug!(tag = %entry.tag, key = ?entry.key, token, "deferring removal");
    cx.persisted.borrow_mut().insert(token, entry);

    let weak = cx.weak();
    cx.event_loop.spawn(async move {
        join_all(teardowns).await;
        if let Some(cx) = weak.upgrade() {
            finish_persisted(&cx, id, token);
        }
    });
}

fn finish_persisted(cx: &RootContext, id: InstanceId, token: u64) {
    let current = cx
        .tree
        .borrow()
        .get(id)
        .and_then(|i| i.as_host())
        .is_some_and(|host| host.persisted == Some(token));
    if !current {
        return;
    }
    tracing::debug!(token, "deferred removal settled");
    finalize_host(cx, id, true);
}

/// Finalize every pending deferred removal now.
pub(crate) fn finalize_all_persisted(cx: &RootContext) {
    let entries: Vec<PersistedEntry> = cx.persisted.borrow_mut().drain(..).map(|(_, entry)| entry).collect();
    for entry in entries {
        finalize_host(cx, entry.id, true);
    }
}

// =============================================================================
// Reclaim
// =============================================================================

/// Rebind a persisted node to `node` instead of creating a new element.
pub(crate) fn try_reclaim(
    cx: &RootContext,
    node: &Node,
    host: &Rc<HostNode>,
    parent: Option<InstanceId>,
    dom_parent: &DomNode,
    placement: &mut Placement,
) -> Option<InstanceId> {
    let key = host.key.as_ref()?;
    let (token, entry) = cx.find_reclaimable(&host.tag, key, dom_parent)?;
    cx.persisted.borrow_mut().shift_remove(&token);

    let runtime = {
        let mut tree = cx.tree.borrow_mut();
        let instance = &mut tree[entry.id];
        instance.parent = parent;
        let host = instance.as_host_mut().expect("persisted host");
        host.persisted = None;
        host.mixins.clone()
    };
    if let Some(runtime) = &runtime {
        runtime.cancel_pending_removal();
    }
    tracing::debug!(tag = %host.tag, key = %key, "reclaiming persisted node");

    match placement {
        // Already in place: later siblings of this insert go after it.
        Placement::Before(reference) if reference.as_ref() == Some(&entry.dom) => {
            *reference = entry.dom.next_sibling();
        }
        Placement::Before(reference) => dom_parent.insert_before(&entry.dom, reference.as_ref()),
        Placement::Hydrate(cursor) => {
            let reference = cursor.insertion_point();
            if reference.as_ref() == Some(&entry.dom) {
                cursor.advance_past(&entry.dom);
            } else {
                dom_parent.insert_before(&entry.dom, reference.as_ref());
            }
        }
    }

    super::update_host(cx, entry.id, node.clone());
    if let Some(runtime) = runtime {
        let owner = super::owner_target(cx, entry.id);
        runtime.bind(&entry.dom, dom_parent, host.key.clone(), owner, true);
    }
    Some(entry.id)
}
