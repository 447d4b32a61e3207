//! Reconciler - Diff node trees against the instance arena and the DOM.
//!
//! Entry points, all threaded with the root's [`RootContext`]:
//! - [`diff`]: insert when there is no previous instance, update otherwise
//! - `insert`: create DOM (or adopt server DOM through a hydration cursor)
//! - `update`: same concrete type and key → type-specific update, otherwise
//!   replace (insert the next node in the previous one's slot, then remove
//!   the previous one)
//! - [`rerender`]: re-render one scheduler target in place
//!
//! The arena is never borrowed across user code (component renders, mixin
//! runners, lifecycle listeners): every step copies what it needs out of the
//! arena, drops the borrow, calls out, then writes back.
//!
//! # Slots
//!
//! Updates take an `after` cursor: the DOM node right before the instance's
//! range (`None` when the range starts its DOM parent). New DOM for a slot is
//! inserted before `after.next_sibling()`.

mod children;
pub(crate) mod frame;
mod head;
pub(crate) mod hydrate;
pub(crate) mod range;
pub(crate) mod remove;

use std::cell::RefCell;
use std::rc::Rc;

pub use frame::{FrameRequest, FrameResolver};

use crate::dom::DomNode;
use crate::engine::component::{Component, ScheduleUpdate};
use crate::engine::node::{ComponentNode, HostNode, Node, NodeKind};
use crate::engine::registry::{ComponentInstance, HostInstance, Instance, InstanceId, InstanceKind};
use crate::error::RenderError;
use crate::mixin::MixinRuntime;
use crate::pipeline::context::RootContext;
use crate::pipeline::scheduler::{self, UpdateTarget};
use crate::props::{ControlledReflection, diff_host_props};
use crate::types::{Namespace, PropValue, Props};
use head::HeadRole;
use hydrate::Cursor;
use range::{position_after, reference_after};

pub(crate) use remove::remove;

/// Where an insert puts its DOM.
pub(crate) enum Placement {
    /// Create new DOM and insert it before this node (append on `None`).
    Before(Option<DomNode>),
    /// Adopt existing DOM at the cursor, creating only on mismatch.
    Hydrate(Cursor),
}

// =============================================================================
// Entry points
// =============================================================================

/// Diff `next` against `prev` in the slot right after `after`.
pub(crate) fn diff(
    cx: &RootContext,
    prev: Option<InstanceId>,
    next: Node,
    parent: Option<InstanceId>,
    dom_parent: &DomNode,
    namespace: Namespace,
    after: Option<DomNode>,
) -> InstanceId {
    match prev {
        Some(prev) => update(cx, prev, next, after),
        None => {
            let reference = reference_after(dom_parent, after.as_ref());
            insert(cx, next, parent, dom_parent, namespace, &mut Placement::Before(reference))
        }
    }
}

/// Re-render a scheduler target in place.
pub(crate) fn rerender(cx: &RootContext, target: UpdateTarget) -> Result<(), RenderError> {
    match target {
        UpdateTarget::Root => {
            let Some(root) = cx.root.get() else { return Ok(()) };
            let node = match cx.tree.borrow().get(root) {
                Some(instance) => instance.node.clone(),
                None => return Ok(()),
            };
            let after = position_after(cx, root);
            let root = update(cx, root, node, after);
            cx.root.set(Some(root));
            Ok(())
        }
        UpdateTarget::Component(id) => {
            if !cx.tree.borrow().contains(id) {
                return Ok(());
            }
            let (handle, node) = component_parts(cx, id);
            let tree = render_component(cx, &handle, &node)?;
            let after = position_after(cx, id);
            diff_component_child(cx, id, tree, after);
            Ok(())
        }
    }
}

// =============================================================================
// Insert
// =============================================================================

pub(crate) fn insert(
    cx: &RootContext,
    node: Node,
    parent: Option<InstanceId>,
    dom_parent: &DomNode,
    namespace: Namespace,
    placement: &mut Placement,
) -> InstanceId {
    match &node {
        Node::Text(value) => {
            let value = value.clone();
            insert_text(cx, node, &value, parent, dom_parent, namespace, placement)
        }
        Node::Host(host) => {
            let host = host.clone();
            insert_host(cx, node, &host, parent, dom_parent, namespace, placement)
        }
        Node::Fragment(fragment) => {
            let children = fragment.children.clone();
            let id = cx.tree.borrow_mut().allocate(Instance::new(
                node,
                parent,
                dom_parent.clone(),
                namespace,
                InstanceKind::Fragment(Vec::new()),
            ));
            let children: Vec<InstanceId> = children
                .into_iter()
                .map(|child| insert(cx, child, Some(id), dom_parent, namespace, &mut *placement))
                .collect();
            cx.tree.borrow_mut()[id].kind = InstanceKind::Fragment(children);
            id
        }
        Node::Component(component) => {
            let component = component.clone();
            insert_component(cx, node, &component, parent, dom_parent, namespace, placement)
        }
        Node::Frame(frame) => {
            let frame = frame.clone();
            frame::insert_frame(cx, node, &frame, parent, dom_parent, namespace, placement)
        }
    }
}

fn insert_text(
    cx: &RootContext,
    node: Node,
    value: &str,
    parent: Option<InstanceId>,
    dom_parent: &DomNode,
    namespace: Namespace,
    placement: &mut Placement,
) -> InstanceId {
    let dom = match placement {
        Placement::Before(reference) => {
            let dom = cx.document.create_text_node(value);
            dom_parent.insert_before(&dom, reference.as_ref());
            dom
        }
        Placement::Hydrate(cursor) => hydrate_text(cx, cursor, dom_parent, value),
    };
    cx.tree.borrow_mut().allocate(Instance::new(
        node,
        parent,
        dom_parent.clone(),
        namespace,
        InstanceKind::Text(dom),
    ))
}

fn hydrate_text(cx: &RootContext, cursor: &mut Cursor, dom_parent: &DomNode, value: &str) -> DomNode {
    let create = |cursor: &Cursor| {
        let dom = cx.document.create_text_node(value);
        dom_parent.insert_before(&dom, cursor.insertion_point().as_ref());
        dom
    };
    // Empty text has no server counterpart.
    if value.is_empty() {
        return create(cursor);
    }
    let Some(candidate) = cursor.peek().filter(DomNode::is_text) else {
        tracing::warn!(expected = value, "hydration mismatch: expected a text node");
        return create(cursor);
    };

    let data = candidate.data().unwrap_or_default();
    if data != value {
        if data.starts_with(value) {
            // The server merged adjacent text; split off our part.
            candidate.split_text(value.chars().count());
        } else {
            tracing::warn!(expected = value, found = %data, "hydration mismatch: text differs");
            let dom = create(cursor);
            cursor.advance_past(&candidate);
            candidate.remove();
            return dom;
        }
    }
    cursor.advance_past(&candidate);
    candidate
}

fn insert_host(
    cx: &RootContext,
    node: Node,
    host: &Rc<HostNode>,
    parent: Option<InstanceId>,
    dom_parent: &DomNode,
    namespace: Namespace,
    placement: &mut Placement,
) -> InstanceId {
    if let Some(id) = remove::try_reclaim(cx, &node, host, parent, dom_parent, placement) {
        return id;
    }

    let own_namespace = namespace.for_element(&host.tag);
    let role = head::head_role(cx, host, own_namespace);
    let hydrating = matches!(placement, Placement::Hydrate(_));

    // Resolve the element: adopted (already in place) or created, plus
    // where a created one goes.
    let (dom, adopted, attach) = match role {
        HeadRole::DocumentHead => (cx.document.head(), true, Attach::None),
        HeadRole::Hoisted => {
            let existing = if hydrating { head::find_existing(cx, host) } else { None };
            let (dom, adopted) = match existing {
                Some(dom) => (dom, true),
                None => (create_element(cx, own_namespace, &host.tag), false),
            };
            cx.head_claims.borrow_mut().insert(dom.clone());
            (dom, adopted, Attach::Head)
        }
        HeadRole::None => match placement {
            Placement::Before(reference) => (
                create_element(cx, own_namespace, &host.tag),
                false,
                Attach::Before(reference.clone()),
            ),
            Placement::Hydrate(cursor) => match hydrate_element(cursor, &host.tag) {
                Some(dom) => (dom, true, Attach::None),
                None => {
                    tracing::warn!(tag = %host.tag, "hydration mismatch: creating a fresh element");
                    (
                        create_element(cx, own_namespace, &host.tag),
                        false,
                        Attach::Before(cursor.insertion_point()),
                    )
                }
            },
        },
    };

    let id = cx.tree.borrow_mut().allocate(Instance::new(
        node,
        parent,
        dom_parent.clone(),
        namespace,
        InstanceKind::Host(HostInstance {
            dom: dom.clone(),
            namespace: own_namespace,
            applied: Props::new(),
            children: Vec::new(),
            mixins: None,
            controlled: None,
            hoisted: role == HeadRole::Hoisted,
            document_head: role == HeadRole::DocumentHead,
            persisted: None,
        }),
    ));

    let runtime = has_mix(&host.props).then(|| MixinRuntime::new(cx, host.tag.clone()));
    let composed = compose(cx, runtime.as_deref(), &host.props);
    diff_host_props(&Props::new(), &composed, &dom, own_namespace);
    let controlled = ControlledReflection::sync(None, &dom, &composed, &cx.event_loop);

    let children = if composed.contains_key("innerHTML") {
        Vec::new()
    } else {
        let child_namespace = namespace.for_children(&host.tag);
        let mut child_placement = match role {
            // Head children append; an empty cursor still lets hoisted
            // ones adopt their server counterparts.
            HeadRole::DocumentHead if hydrating => Placement::Hydrate(Cursor::new(None)),
            HeadRole::DocumentHead => Placement::Before(None),
            _ if adopted => Placement::Hydrate(Cursor::new(dom.first_child())),
            _ => Placement::Before(None),
        };
        let children = host
            .children
            .iter()
            .map(|child| insert(cx, child.clone(), Some(id), &dom, child_namespace, &mut child_placement))
            .collect();
        if let Placement::Hydrate(cursor) = child_placement {
            cursor.remove_trailing();
        }
        children
    };

    match attach {
        Attach::None => {}
        Attach::Before(reference) => dom_parent.insert_before(&dom, reference.as_ref()),
        Attach::Head => {
            if !adopted {
                cx.document.head().append_child(&dom);
            }
        }
    }

    {
        let mut tree = cx.tree.borrow_mut();
        let instance = tree[id].as_host_mut().expect("host instance");
        instance.applied = composed;
        instance.children = children;
        instance.mixins = runtime.clone();
        instance.controlled = controlled;
    }

    if let Some(runtime) = runtime {
        let binding_parent = dom.parent().unwrap_or_else(|| dom_parent.clone());
        runtime.bind(&dom, &binding_parent, host.key.clone(), owner_target(cx, id), false);
    }
    id
}

enum Attach {
    /// Adopted in place, or the document head itself.
    None,
    Before(Option<DomNode>),
    Head,
}

fn create_element(cx: &RootContext, namespace: Namespace, tag: &str) -> DomNode {
    match namespace {
        Namespace::Html => cx.document.create_element(tag),
        _ => cx.document.create_element_ns(namespace, tag),
    }
}

/// Adopt the element at the cursor, tolerating one unexpected sibling.
fn hydrate_element(cursor: &mut Cursor, tag: &str) -> Option<DomNode> {
    let matches = |node: &DomNode| {
        node.tag_name()
            .is_some_and(|name| name.eq_ignore_ascii_case(tag))
    };
    let candidate = cursor.peek()?;
    if matches(&candidate) {
        cursor.advance_past(&candidate);
        return Some(candidate);
    }
    if let Some(next) = cursor.peek_after(&candidate).filter(|node| matches(node)) {
        tracing::warn!(tag, skipped = ?candidate, "hydration: skipping one unexpected node");
        cursor.advance_past(&next);
        return Some(next);
    }
    // Give up on this node, but leave it where the server put it.
    cursor.keep(&candidate);
    None
}

fn insert_component(
    cx: &RootContext,
    node: Node,
    component: &Rc<ComponentNode>,
    parent: Option<InstanceId>,
    dom_parent: &DomNode,
    namespace: Namespace,
    placement: &mut Placement,
) -> InstanceId {
    let handle: Rc<RefCell<Box<dyn Component>>> = Rc::new(RefCell::new(component.ty.create()));
    let id = cx.tree.borrow_mut().allocate(Instance::new(
        node,
        parent,
        dom_parent.clone(),
        namespace,
        InstanceKind::Component(ComponentInstance {
            handle: handle.clone(),
            child: None,
        }),
    ));

    let weak = cx.weak();
    handle.borrow_mut().set_schedule_update(ScheduleUpdate::new(move || {
        if let Some(cx) = weak.upgrade() {
            if cx.tree.borrow().contains(id) {
                scheduler::enqueue(&cx, UpdateTarget::Component(id));
            }
        }
    }));

    match render_component(cx, &handle, component) {
        Ok(tree) => {
            let child = insert(cx, tree, Some(id), dom_parent, namespace, placement);
            set_component_child(cx, id, Some(child));
        }
        Err(err) => cx.report(err),
    }
    id
}

// =============================================================================
// Update
// =============================================================================

pub(crate) fn update(cx: &RootContext, id: InstanceId, next: Node, after: Option<DomNode>) -> InstanceId {
    let prev = cx.tree.borrow()[id].node.clone();
    if !prev.same_type(&next) || prev.key() != next.key() {
        return replace(cx, id, next, after);
    }
    match next.kind() {
        NodeKind::Text => {
            update_text(cx, id, next);
            id
        }
        NodeKind::Host => {
            update_host(cx, id, next);
            id
        }
        NodeKind::Fragment => {
            update_fragment(cx, id, next, after);
            id
        }
        NodeKind::Component => update_component(cx, id, next, after),
        NodeKind::Frame => frame::update_frame(cx, id, next, after),
    }
}

/// Insert `next` in `id`'s slot, then remove `id`.
pub(crate) fn replace(cx: &RootContext, id: InstanceId, next: Node, after: Option<DomNode>) -> InstanceId {
    let (parent, dom_parent, namespace) = {
        let tree = cx.tree.borrow();
        let instance = &tree[id];
        (instance.parent, instance.dom_parent.clone(), instance.namespace)
    };
    tracing::trace!(next = %next.type_name(), "replacing instance");
    let reference = reference_after(&dom_parent, after.as_ref());
    let replacement = insert(cx, next, parent, &dom_parent, namespace, &mut Placement::Before(reference));
    remove(cx, id, true);
    replacement
}

fn update_text(cx: &RootContext, id: InstanceId, next: Node) {
    let Node::Text(value) = &next else {
        unreachable!("update_text with a non-text node");
    };
    let mut tree = cx.tree.borrow_mut();
    let instance = &mut tree[id];
    if let InstanceKind::Text(dom) = &instance.kind {
        dom.set_data(value);
    }
    instance.node = next;
}

/// Re-diff a host's props and children against `next`.
pub(crate) fn update_host(cx: &RootContext, id: InstanceId, next: Node) {
    let Node::Host(host) = &next else {
        unreachable!("update_host with a non-host node");
    };
    let (dom, own_namespace, child_namespace, applied, old_children, runtime, controlled) = {
        let mut tree = cx.tree.borrow_mut();
        let instance = &mut tree[id];
        let child_namespace = instance.namespace.for_children(&host.tag);
        let state = instance.as_host_mut().expect("host instance");
        (
            state.dom.clone(),
            state.namespace,
            child_namespace,
            state.applied.clone(),
            state.children.clone(),
            state.mixins.clone(),
            state.controlled.take(),
        )
    };

    let (runtime, created) = match runtime {
        Some(runtime) => (Some(runtime), false),
        None if has_mix(&host.props) => (Some(MixinRuntime::new(cx, host.tag.clone())), true),
        None => (None, false),
    };
    let composed = compose(cx, runtime.as_deref(), &host.props);
    diff_host_props(&applied, &composed, &dom, own_namespace);
    let controlled = ControlledReflection::sync(controlled, &dom, &composed, &cx.event_loop);

    let children = if composed.contains_key("innerHTML") {
        for child in old_children {
            remove(cx, child, true);
        }
        Vec::new()
    } else {
        children::diff_children(cx, id, &dom, child_namespace, old_children, &host.children, None)
    };

    {
        let mut tree = cx.tree.borrow_mut();
        let instance = &mut tree[id];
        instance.node = next.clone();
        let state = instance.as_host_mut().expect("host instance");
        state.applied = composed;
        state.children = children;
        state.mixins = runtime.clone();
        state.controlled = controlled;
    }

    if created {
        if let Some(runtime) = runtime {
            let parent = dom.parent().unwrap_or_else(|| cx.tree.borrow()[id].dom_parent.clone());
            runtime.bind(&dom, &parent, host.key.clone(), owner_target(cx, id), false);
        }
    }
}

fn update_fragment(cx: &RootContext, id: InstanceId, next: Node, after: Option<DomNode>) {
    let Node::Fragment(fragment) = &next else {
        unreachable!("update_fragment with a non-fragment node");
    };
    let (old, dom_parent, namespace) = {
        let tree = cx.tree.borrow();
        let instance = &tree[id];
        (instance.children(), instance.dom_parent.clone(), instance.namespace)
    };
    let children = children::diff_children(cx, id, &dom_parent, namespace, old, &fragment.children, after);
    let mut tree = cx.tree.borrow_mut();
    let instance = &mut tree[id];
    instance.kind = InstanceKind::Fragment(children);
    instance.node = next.clone();
}

fn update_component(cx: &RootContext, id: InstanceId, next: Node, after: Option<DomNode>) -> InstanceId {
    cx.tree.borrow_mut()[id].node = next;
    let (handle, node) = component_parts(cx, id);
    match render_component(cx, &handle, &node) {
        Ok(tree) => diff_component_child(cx, id, tree, after),
        // The previous output stays.
        Err(err) => cx.report(err),
    }
    id
}

// =============================================================================
// Components
// =============================================================================

fn component_parts(cx: &RootContext, id: InstanceId) -> (Rc<RefCell<Box<dyn Component>>>, Rc<ComponentNode>) {
    let tree = cx.tree.borrow();
    let instance = &tree[id];
    let (InstanceKind::Component(component), Node::Component(node)) = (&instance.kind, &instance.node) else {
        unreachable!("component instance holds a component node");
    };
    (component.handle.clone(), node.clone())
}

fn render_component(
    cx: &RootContext,
    handle: &Rc<RefCell<Box<dyn Component>>>,
    node: &ComponentNode,
) -> Result<Node, RenderError> {
    let rendered = handle
        .borrow_mut()
        .render(&node.props)
        .map_err(|source| RenderError::Component {
            component: node.ty.name().to_string(),
            source,
        })?;
    scheduler::enqueue_tasks(cx, rendered.tasks);
    Ok(rendered.tree)
}

fn diff_component_child(cx: &RootContext, id: InstanceId, tree: Node, after: Option<DomNode>) {
    let (child, dom_parent, namespace) = {
        let arena = cx.tree.borrow();
        let instance = &arena[id];
        (instance.children().first().copied(), instance.dom_parent.clone(), instance.namespace)
    };
    let child = diff(cx, child, tree, Some(id), &dom_parent, namespace, after);
    set_component_child(cx, id, Some(child));
}

fn set_component_child(cx: &RootContext, id: InstanceId, child: Option<InstanceId>) {
    if let Some(instance) = cx.tree.borrow_mut().get_mut(id) {
        if let InstanceKind::Component(component) = &mut instance.kind {
            component.child = child;
        }
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Who re-renders when a mixin on `id` asks for an update.
pub(crate) fn owner_target(cx: &RootContext, id: InstanceId) -> UpdateTarget {
    cx.tree
        .borrow()
        .owning_component(id)
        .map_or(UpdateTarget::Root, UpdateTarget::Component)
}

fn has_mix(props: &Props) -> bool {
    matches!(props.get("mix"), Some(PropValue::Mix(_)))
}

/// Props after mixin composition, `mix` stripped.
fn compose(cx: &RootContext, runtime: Option<&MixinRuntime>, props: &Props) -> Props {
    match runtime {
        Some(runtime) => runtime.resolve(props, cx.config.max_mixin_descriptors),
        None => {
            let mut props = props.clone();
            props.shift_remove("mix");
            props
        }
    }
}
