//! In-memory DOM - The host tree the reconciler writes into.
//!
//! The engine never talks to a browser directly. It drives this single-threaded
//! DOM, which models the surface a reconciler needs:
//! - Element / Text / Comment nodes with pointer identity
//! - Attributes and a per-tag DOM property table ([`properties`])
//! - Event listeners with bubbling ([`events`])
//! - Focus, form-control selection and a document selection range
//! - A mutation log for asserting exactly what a render pass touched
//!
//! # Mutation log
//!
//! Only mutations on nodes connected to the document are recorded, the way a
//! `MutationObserver` on the document would see them. Building a detached
//! subtree and inserting it is one child-list record. Writing a value equal to
//! the current one is not a mutation.
//!
//! # Example
//!
//! ```ignore
//! let doc = Document::new();
//! let div = doc.create_element("div");
//! div.set_attribute("id", "app");
//! doc.body().append_child(&div);
//! assert_eq!(doc.take_mutations().len(), 1);
//! ```

pub mod events;
pub mod markup;
pub mod properties;

use std::cell::{Cell, RefCell};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::{Rc, Weak};

use crate::types::{Namespace, PropValue};

pub use events::{Event, EventListener, ListenerId};
use properties::PropertyKind;

// =============================================================================
// Node Data
// =============================================================================

/// The DOM node type, as reported by `nodeType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Element,
    Text,
    Comment,
    Document,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Attribute {
    pub(crate) name: String,
    pub(crate) namespace: Option<&'static str>,
    pub(crate) value: String,
}

pub(crate) struct ElementData {
    pub(crate) tag: String,
    pub(crate) namespace: Namespace,
    pub(crate) attributes: Vec<Attribute>,
    /// Non-reflecting property state (`value`, `checked`, expandos).
    pub(crate) state: Vec<(String, PropValue)>,
    pub(crate) selection: Option<(usize, usize)>,
}

enum NodeKind {
    Document,
    Element(ElementData),
    Text(String),
    Comment(String),
}

struct ListenerEntry {
    id: ListenerId,
    event_type: String,
    listener: EventListener,
}

struct NodeData {
    kind: NodeKind,
    parent: Weak<RefCell<NodeData>>,
    children: Vec<DomNode>,
    listeners: Vec<ListenerEntry>,
    owner: Weak<DocumentInner>,
}

/// Handle to a live DOM node. Cloning the handle does not clone the node;
/// equality and hashing are by identity.
#[derive(Clone)]
pub struct DomNode(Rc<RefCell<NodeData>>);

// =============================================================================
// Mutation Log
// =============================================================================

/// What a recorded mutation changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationKind {
    /// A child was inserted or removed.
    ChildList,
    /// An attribute was set or removed.
    Attribute(String),
    /// A non-reflecting DOM property changed.
    Property(String),
    /// Text or comment data changed.
    CharacterData,
}

/// One entry in the document's mutation log.
#[derive(Debug, Clone)]
pub struct Mutation {
    pub kind: MutationKind,
    pub target: DomNode,
}

// =============================================================================
// Document
// =============================================================================

/// A document selection range (anchor/focus pairs, like `Selection`).
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionRange {
    pub anchor_node: DomNode,
    pub anchor_offset: usize,
    pub focus_node: DomNode,
    pub focus_offset: usize,
}

struct DocumentInner {
    root: RefCell<Option<DomNode>>,
    head: RefCell<Option<DomNode>>,
    body: RefCell<Option<DomNode>>,
    active: RefCell<Option<DomNode>>,
    selection: RefCell<Option<SelectionRange>>,
    mutations: RefCell<Vec<Mutation>>,
    next_listener_id: Cell<u64>,
}

/// An in-memory document with `<html>`, `<head>` and `<body>`.
#[derive(Clone)]
pub struct Document(Rc<DocumentInner>);

impl Document {
    /// Create an empty document.
    pub fn new() -> Self {
        let inner = Rc::new(DocumentInner {
            root: RefCell::new(None),
            head: RefCell::new(None),
            body: RefCell::new(None),
            active: RefCell::new(None),
            selection: RefCell::new(None),
            mutations: RefCell::new(Vec::new()),
            next_listener_id: Cell::new(0),
        });
        let doc = Document(inner);

        let root = doc.new_node(NodeKind::Document);
        let html = doc.create_element("html");
        let head = doc.create_element("head");
        let body = doc.create_element("body");
        html.append_child(&head);
        html.append_child(&body);
        root.append_child(&html);

        *doc.0.root.borrow_mut() = Some(root);
        *doc.0.head.borrow_mut() = Some(head);
        *doc.0.body.borrow_mut() = Some(body);
        doc
    }

    fn new_node(&self, kind: NodeKind) -> DomNode {
        DomNode(Rc::new(RefCell::new(NodeData {
            kind,
            parent: Weak::new(),
            children: Vec::new(),
            listeners: Vec::new(),
            owner: Rc::downgrade(&self.0),
        })))
    }

    /// The document node itself.
    pub fn document_node(&self) -> DomNode {
        self.0.root.borrow().clone().expect("document root is created in Document::new")
    }

    pub fn head(&self) -> DomNode {
        self.0.head.borrow().clone().expect("document head is created in Document::new")
    }

    pub fn body(&self) -> DomNode {
        self.0.body.borrow().clone().expect("document body is created in Document::new")
    }

    /// Create an HTML element. Tag names are lowercased.
    pub fn create_element(&self, tag: &str) -> DomNode {
        self.create_element_ns(Namespace::Html, tag)
    }

    /// Create an element in the given namespace. SVG and MathML tag names keep
    /// their case (`foreignObject`, `linearGradient`).
    pub fn create_element_ns(&self, namespace: Namespace, tag: &str) -> DomNode {
        let tag = match namespace {
            Namespace::Html => tag.to_ascii_lowercase(),
            _ => tag.to_string(),
        };
        self.new_node(NodeKind::Element(ElementData {
            tag,
            namespace,
            attributes: Vec::new(),
            state: Vec::new(),
            selection: None,
        }))
    }

    pub fn create_text_node(&self, data: &str) -> DomNode {
        self.new_node(NodeKind::Text(data.to_string()))
    }

    pub fn create_comment(&self, data: &str) -> DomNode {
        self.new_node(NodeKind::Comment(data.to_string()))
    }

    // -------------------------------------------------------------------------
    // Focus and selection
    // -------------------------------------------------------------------------

    /// The focused element, if any.
    pub fn active_element(&self) -> Option<DomNode> {
        self.0.active.borrow().clone()
    }

    /// Drop focus from the active element.
    pub fn blur(&self) {
        self.0.active.borrow_mut().take();
    }

    pub fn selection(&self) -> Option<SelectionRange> {
        self.0.selection.borrow().clone()
    }

    pub fn set_selection(&self, range: Option<SelectionRange>) {
        *self.0.selection.borrow_mut() = range;
    }

    // -------------------------------------------------------------------------
    // Mutation log
    // -------------------------------------------------------------------------

    /// Drain the mutation log.
    pub fn take_mutations(&self) -> Vec<Mutation> {
        std::mem::take(&mut *self.0.mutations.borrow_mut())
    }

    /// Number of mutations recorded since the last [`Document::take_mutations`].
    pub fn mutation_count(&self) -> usize {
        self.0.mutations.borrow().len()
    }

    fn next_listener_id(&self) -> ListenerId {
        let id = self.0.next_listener_id.get();
        self.0.next_listener_id.set(id + 1);
        ListenerId(id)
    }

    /// Called when `node` leaves the document tree: focus and selection inside
    /// it are lost.
    fn forget_detached(&self, node: &DomNode) {
        let lost_focus = self
            .0
            .active
            .borrow()
            .as_ref()
            .is_some_and(|active| node.contains(active));
        if lost_focus {
            self.blur();
        }
        let lost_selection = self.0.selection.borrow().as_ref().is_some_and(|range| {
            node.contains(&range.anchor_node) || node.contains(&range.focus_node)
        });
        if lost_selection {
            self.set_selection(None);
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

// =============================================================================
// DomNode - Identity
// =============================================================================

impl PartialEq for DomNode {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for DomNode {}

impl Hash for DomNode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Rc::as_ptr(&self.0) as usize).hash(state);
    }
}

impl fmt::Debug for DomNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0.borrow().kind {
            NodeKind::Document => write!(f, "#document"),
            NodeKind::Element(el) => write!(f, "<{}>", el.tag),
            NodeKind::Text(data) => write!(f, "#text {data:?}"),
            NodeKind::Comment(data) => write!(f, "<!--{data}-->"),
        }
    }
}

// =============================================================================
// DomNode - Inspection
// =============================================================================

impl DomNode {
    pub fn node_type(&self) -> NodeType {
        match &self.0.borrow().kind {
            NodeKind::Document => NodeType::Document,
            NodeKind::Element(_) => NodeType::Element,
            NodeKind::Text(_) => NodeType::Text,
            NodeKind::Comment(_) => NodeType::Comment,
        }
    }

    pub fn is_element(&self) -> bool {
        self.node_type() == NodeType::Element
    }

    pub fn is_text(&self) -> bool {
        self.node_type() == NodeType::Text
    }

    pub fn is_comment(&self) -> bool {
        self.node_type() == NodeType::Comment
    }

    /// Element tag name (lowercase for HTML), `None` for other node types.
    pub fn tag_name(&self) -> Option<String> {
        match &self.0.borrow().kind {
            NodeKind::Element(el) => Some(el.tag.clone()),
            _ => None,
        }
    }

    pub fn namespace(&self) -> Option<Namespace> {
        match &self.0.borrow().kind {
            NodeKind::Element(el) => Some(el.namespace),
            _ => None,
        }
    }

    /// Text or comment data.
    pub fn data(&self) -> Option<String> {
        match &self.0.borrow().kind {
            NodeKind::Text(data) | NodeKind::Comment(data) => Some(data.clone()),
            _ => None,
        }
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        let data = self.0.borrow();
        match &data.kind {
            NodeKind::Text(text) => out.push_str(text),
            NodeKind::Comment(_) => {}
            _ => {
                for child in &data.children {
                    child.collect_text(out);
                }
            }
        }
    }

    pub(crate) fn owner(&self) -> Option<Document> {
        self.0.borrow().owner.upgrade().map(Document)
    }

    // -------------------------------------------------------------------------
    // Traversal
    // -------------------------------------------------------------------------

    pub fn parent(&self) -> Option<DomNode> {
        self.0.borrow().parent.upgrade().map(DomNode)
    }

    pub fn children(&self) -> Vec<DomNode> {
        self.0.borrow().children.clone()
    }

    pub fn first_child(&self) -> Option<DomNode> {
        self.0.borrow().children.first().cloned()
    }

    pub fn last_child(&self) -> Option<DomNode> {
        self.0.borrow().children.last().cloned()
    }

    fn index_in_parent(&self, parent: &DomNode) -> Option<usize> {
        parent.0.borrow().children.iter().position(|c| c == self)
    }

    pub fn next_sibling(&self) -> Option<DomNode> {
        let parent = self.parent()?;
        let index = self.index_in_parent(&parent)?;
        parent.0.borrow().children.get(index + 1).cloned()
    }

    pub fn previous_sibling(&self) -> Option<DomNode> {
        let parent = self.parent()?;
        let index = self.index_in_parent(&parent)?;
        index.checked_sub(1).and_then(|i| parent.0.borrow().children.get(i).cloned())
    }

    /// Inclusive descendant check, like `Node.contains`.
    pub fn contains(&self, other: &DomNode) -> bool {
        let mut current = Some(other.clone());
        while let Some(node) = current {
            if &node == self {
                return true;
            }
            current = node.parent();
        }
        false
    }

    /// Whether the node is attached to its document.
    pub fn is_connected(&self) -> bool {
        let mut current = self.clone();
        loop {
            if current.node_type() == NodeType::Document {
                return true;
            }
            match current.parent() {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    fn record(&self, kind: MutationKind) {
        if !self.is_connected() {
            return;
        }
        if let Some(doc) = self.owner() {
            doc.0.mutations.borrow_mut().push(Mutation {
                kind,
                target: self.clone(),
            });
        }
    }

    // -------------------------------------------------------------------------
    // Tree mutation
    // -------------------------------------------------------------------------

    pub fn append_child(&self, child: &DomNode) {
        self.insert_before(child, None);
    }

    /// Insert `child` before `reference` (or at the end when `None`), moving it
    /// out of its current parent first.
    ///
    /// # Panics
    ///
    /// Panics when `child` is an inclusive ancestor of `self`, or when
    /// `reference` is not a child of `self`.
    pub fn insert_before(&self, child: &DomNode, reference: Option<&DomNode>) {
        assert!(!child.contains(self), "cannot insert a node into its own subtree");

        let mut reference = reference.cloned();
        if reference.as_ref() == Some(child) {
            reference = child.next_sibling();
        }
        if let Some(reference) = &reference {
            assert!(
                reference.parent().as_ref() == Some(self),
                "insert_before reference {reference:?} is not a child of {self:?}"
            );
        }

        child.detach();

        {
            let mut data = self.0.borrow_mut();
            let index = match &reference {
                Some(reference) => data
                    .children
                    .iter()
                    .position(|c| c == reference)
                    .unwrap_or(data.children.len()),
                None => data.children.len(),
            };
            data.children.insert(index, child.clone());
        }
        child.0.borrow_mut().parent = Rc::downgrade(&self.0);
        self.record(MutationKind::ChildList);
    }

    pub fn remove_child(&self, child: &DomNode) {
        assert!(
            child.parent().as_ref() == Some(self),
            "remove_child: {child:?} is not a child of {self:?}"
        );
        child.detach();
    }

    /// Remove this node from its parent, if it has one.
    pub fn remove(&self) {
        self.detach();
    }

    fn detach(&self) {
        let Some(parent) = self.parent() else { return };
        let was_connected = parent.is_connected();
        {
            let mut data = parent.0.borrow_mut();
            data.children.retain(|c| c != self);
        }
        self.0.borrow_mut().parent = Weak::new();
        if was_connected {
            parent.record(MutationKind::ChildList);
            if let Some(doc) = self.owner() {
                doc.forget_detached(self);
            }
        }
    }

    /// Remove all children.
    pub fn clear_children(&self) {
        for child in self.children() {
            child.detach();
        }
    }

    // -------------------------------------------------------------------------
    // Character data
    // -------------------------------------------------------------------------

    /// Replace text/comment data.
    pub fn set_data(&self, value: &str) {
        let changed = {
            let mut data = self.0.borrow_mut();
            match &mut data.kind {
                NodeKind::Text(text) | NodeKind::Comment(text) if text != value => {
                    *text = value.to_string();
                    true
                }
                _ => false,
            }
        };
        if changed {
            self.record(MutationKind::CharacterData);
        }
    }

    /// Split a text node at `offset` (in chars), like `Text.splitText`.
    /// The remainder becomes a new text node inserted right after this one
    /// and is returned.
    pub fn split_text(&self, offset: usize) -> DomNode {
        let remainder = {
            let mut data = self.0.borrow_mut();
            let NodeKind::Text(text) = &mut data.kind else {
                panic!("split_text called on a non-text node");
            };
            let byte = text
                .char_indices()
                .nth(offset)
                .map(|(i, _)| i)
                .unwrap_or(text.len());
            text.split_off(byte)
        };
        self.record(MutationKind::CharacterData);

        let doc = self.owner().expect("text node outlived its document");
        let tail = doc.create_text_node(&remainder);
        if let Some(parent) = self.parent() {
            let next = self.next_sibling();
            parent.insert_before(&tail, next.as_ref());
        }
        tail
    }

    // -------------------------------------------------------------------------
    // Attributes
    // -------------------------------------------------------------------------

    pub(crate) fn with_element<R>(&self, f: impl FnOnce(&ElementData) -> R) -> Option<R> {
        match &self.0.borrow().kind {
            NodeKind::Element(el) => Some(f(el)),
            _ => None,
        }
    }

    fn with_element_mut<R>(&self, f: impl FnOnce(&mut ElementData) -> R) -> Option<R> {
        match &mut self.0.borrow_mut().kind {
            NodeKind::Element(el) => Some(f(el)),
            _ => None,
        }
    }

    pub fn get_attribute(&self, name: &str) -> Option<String> {
        self.with_element(|el| {
            el.attributes
                .iter()
                .find(|a| a.name == name)
                .map(|a| a.value.clone())
        })
        .flatten()
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.get_attribute(name).is_some()
    }

    /// All attributes as `(name, value)` pairs, in insertion order.
    pub fn attributes(&self) -> Vec<(String, String)> {
        self.with_element(|el| {
            el.attributes
                .iter()
                .map(|a| (a.name.clone(), a.value.clone()))
                .collect()
        })
        .unwrap_or_default()
    }

    pub fn set_attribute(&self, name: &str, value: &str) {
        self.set_attribute_inner(None, name, value);
    }

    /// Set a namespaced attribute (`xlink:href`). The qualified name is stored
    /// as given.
    pub fn set_attribute_ns(&self, namespace: Option<&'static str>, name: &str, value: &str) {
        self.set_attribute_inner(namespace, name, value);
    }

    fn set_attribute_inner(&self, namespace: Option<&'static str>, name: &str, value: &str) {
        let changed = self
            .with_element_mut(|el| match el.attributes.iter_mut().find(|a| a.name == name) {
                Some(attr) if attr.value == value && attr.namespace == namespace => false,
                Some(attr) => {
                    attr.value = value.to_string();
                    attr.namespace = namespace;
                    true
                }
                None => {
                    el.attributes.push(Attribute {
                        name: name.to_string(),
                        namespace,
                        value: value.to_string(),
                    });
                    true
                }
            })
            .unwrap_or(false);
        if changed {
            self.record(MutationKind::Attribute(name.to_string()));
        }
    }

    pub fn remove_attribute(&self, name: &str) {
        let removed = self
            .with_element_mut(|el| {
                let before = el.attributes.len();
                el.attributes.retain(|a| a.name != name);
                before != el.attributes.len()
            })
            .unwrap_or(false);
        if removed {
            self.record(MutationKind::Attribute(name.to_string()));
        }
    }

    // -------------------------------------------------------------------------
    // Properties
    // -------------------------------------------------------------------------

    /// Whether `name` is a DOM property of this element (the `name in node`
    /// check). Expandos set through [`DomNode::set_property`] count too.
    pub fn has_property(&self, name: &str) -> bool {
        self.with_element(|el| {
            properties::lookup(&el.tag, el.namespace, name).is_some()
                || el.state.iter().any(|(n, _)| n == name)
        })
        .unwrap_or(false)
    }

    /// Read a DOM property.
    pub fn get_property(&self, name: &str) -> PropValue {
        let Some((tag, namespace, state)) = self.with_element(|el| {
            (
                el.tag.clone(),
                el.namespace,
                el.state.iter().find(|(n, _)| n == name).map(|(_, v)| v.clone()),
            )
        }) else {
            return PropValue::Null;
        };

        match properties::lookup(&tag, namespace, name) {
            Some(PropertyKind::Reflect { attribute, boolean }) => {
                let value = self.get_attribute(attribute);
                if boolean {
                    PropValue::Bool(value.is_some())
                } else {
                    PropValue::Str(value.unwrap_or_default().into())
                }
            }
            Some(PropertyKind::State { default_attribute }) => state.unwrap_or_else(|| {
                properties::state_default(name, default_attribute.and_then(|a| self.get_attribute(a)))
            }),
            Some(PropertyKind::InnerHtml) => PropValue::Str(markup::inner_html(self).into()),
            None => state.unwrap_or(PropValue::Null),
        }
    }

    /// Assign a DOM property. Reflecting properties write their attribute.
    pub fn set_property(&self, name: &str, value: PropValue) {
        let Some((tag, namespace)) = self.with_element(|el| (el.tag.clone(), el.namespace)) else {
            return;
        };

        match properties::lookup(&tag, namespace, name) {
            Some(PropertyKind::Reflect { attribute, boolean: true }) => {
                if value.is_truthy() {
                    self.set_attribute(attribute, "");
                } else {
                    self.remove_attribute(attribute);
                }
            }
            Some(PropertyKind::Reflect { attribute, boolean: false }) => {
                self.set_attribute(attribute, &value.to_attribute_string());
            }
            Some(PropertyKind::InnerHtml) => {
                let html = value.to_attribute_string();
                if markup::inner_html(self) != html {
                    self.clear_children();
                    if let Some(doc) = self.owner() {
                        for node in markup::parse_fragment(&doc, &html) {
                            self.append_child(&node);
                        }
                    }
                }
            }
            Some(PropertyKind::State { .. }) | None => {
                let value = properties::coerce_state(name, value);
                if self.get_property(name).same(&value) {
                    return;
                }
                self.with_element_mut(|el| {
                    match el.state.iter_mut().find(|(n, _)| n == name) {
                        Some(slot) => slot.1 = value,
                        None => el.state.push((name.to_string(), value)),
                    }
                });
                self.record(MutationKind::Property(name.to_string()));
            }
        }
    }

    // -------------------------------------------------------------------------
    // Focus
    // -------------------------------------------------------------------------

    /// Focus this element. Detached elements cannot take focus.
    pub fn focus(&self) {
        if !self.is_element() || !self.is_connected() {
            return;
        }
        if let Some(doc) = self.owner() {
            *doc.0.active.borrow_mut() = Some(self.clone());
        }
    }

    /// Text selection of a form control.
    pub fn selection_range(&self) -> Option<(usize, usize)> {
        self.with_element(|el| el.selection).flatten()
    }

    pub fn set_selection_range(&self, start: usize, end: usize) {
        self.with_element_mut(|el| el.selection = Some((start, end)));
    }

    // -------------------------------------------------------------------------
    // Events
    // -------------------------------------------------------------------------

    pub fn add_event_listener(&self, event_type: &str, listener: EventListener) -> ListenerId {
        let id = match self.owner() {
            Some(doc) => doc.next_listener_id(),
            None => ListenerId(u64::MAX),
        };
        self.0.borrow_mut().listeners.push(ListenerEntry {
            id,
            event_type: event_type.to_string(),
            listener,
        });
        id
    }

    pub fn remove_event_listener(&self, id: ListenerId) {
        self.0.borrow_mut().listeners.retain(|l| l.id != id);
    }

    /// Number of listeners registered for `event_type`.
    pub fn listener_count(&self, event_type: &str) -> usize {
        self.0
            .borrow()
            .listeners
            .iter()
            .filter(|l| l.event_type == event_type)
            .count()
    }

    /// Dispatch `event` at this node, bubbling to ancestors when the event
    /// bubbles.
    pub fn dispatch_event(&self, event: &Event) {
        event.set_target(self.clone());
        let mut current = Some(self.clone());
        while let Some(node) = current {
            let listeners: Vec<EventListener> = node
                .0
                .borrow()
                .listeners
                .iter()
                .filter(|l| l.event_type == event.event_type())
                .map(|l| l.listener.clone())
                .collect();
            for listener in listeners {
                listener(event);
            }
            if !event.bubbles() || event.propagation_stopped() {
                break;
            }
            current = node.parent();
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
