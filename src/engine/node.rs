//! Node model - Immutable descriptions of what should render.
//!
//! A [`Node`] is built fresh for every render and never mutated. The committed
//! side (DOM reference, parent link, mixin state) lives in the instance arena
//! (see [`super::registry`]), which keeps the last node it rendered as its
//! diff baseline.
//!
//! # Example
//!
//! ```ignore
//! use spark_dom::{h, text, fragment};
//!
//! let tree = h("ul")
//!     .class("todos")
//!     .children(items.iter().map(|item| h("li").key(item.id).child(text(&item.title))))
//!     .build();
//! ```

use std::rc::Rc;

use crate::engine::component::ComponentType;
use crate::mixin::MixinDescriptor;
use crate::types::{Key, PropValue, Props, Style};

// =============================================================================
// Node
// =============================================================================

/// A tree node for one render pass. Cloning is cheap (variants are `Rc`).
#[derive(Clone)]
pub enum Node {
    Text(Rc<str>),
    Host(Rc<HostNode>),
    Fragment(Rc<FragmentNode>),
    Component(Rc<ComponentNode>),
    Frame(Rc<FrameNode>),
}

/// An element.
pub struct HostNode {
    pub tag: Rc<str>,
    pub key: Option<Key>,
    pub props: Props,
    pub children: Vec<Node>,
}

/// A list of siblings with no DOM of its own.
pub struct FragmentNode {
    pub key: Option<Key>,
    pub children: Vec<Node>,
}

/// A component invocation.
pub struct ComponentNode {
    pub ty: ComponentType,
    pub key: Option<Key>,
    pub props: Props,
}

/// An async content boundary: shows `fallback` until the content for `src`
/// resolves.
pub struct FrameNode {
    pub key: Option<Key>,
    pub src: Rc<str>,
    pub name: Option<Rc<str>>,
    pub fallback: Option<Node>,
}

/// Node variant without payload, for diagnostics and type checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Text,
    Host,
    Fragment,
    Component,
    Frame,
}

impl Node {
    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Text(_) => NodeKind::Text,
            Node::Host(_) => NodeKind::Host,
            Node::Fragment(_) => NodeKind::Fragment,
            Node::Component(_) => NodeKind::Component,
            Node::Frame(_) => NodeKind::Frame,
        }
    }

    pub fn key(&self) -> Option<&Key> {
        match self {
            Node::Text(_) => None,
            Node::Host(host) => host.key.as_ref(),
            Node::Fragment(fragment) => fragment.key.as_ref(),
            Node::Component(component) => component.key.as_ref(),
            Node::Frame(frame) => frame.key.as_ref(),
        }
    }

    /// Whether `self` and `other` have the same concrete type: same host tag,
    /// same component type, or the same payload-free variant.
    pub fn same_type(&self, other: &Node) -> bool {
        match (self, other) {
            (Node::Text(_), Node::Text(_)) => true,
            (Node::Host(a), Node::Host(b)) => a.tag == b.tag,
            (Node::Fragment(_), Node::Fragment(_)) => true,
            (Node::Component(a), Node::Component(b)) => a.ty == b.ty,
            (Node::Frame(_), Node::Frame(_)) => true,
            _ => false,
        }
    }

    /// Short type name for logs.
    pub fn type_name(&self) -> String {
        match self {
            Node::Text(_) => "#text".to_string(),
            Node::Host(host) => host.tag.to_string(),
            Node::Fragment(_) => "#fragment".to_string(),
            Node::Component(component) => component.ty.name().to_string(),
            Node::Frame(_) => "#frame".to_string(),
        }
    }

    pub fn as_host(&self) -> Option<&HostNode> {
        match self {
            Node::Host(host) => Some(host),
            _ => None,
        }
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Node::Text(value) => write!(f, "Text({value:?})"),
            Node::Host(host) => f
                .debug_struct("Host")
                .field("tag", &host.tag)
                .field("key", &host.key)
                .field("props", &host.props)
                .field("children", &host.children)
                .finish(),
            Node::Fragment(fragment) => f
                .debug_struct("Fragment")
                .field("key", &fragment.key)
                .field("children", &fragment.children)
                .finish(),
            Node::Component(component) => f
                .debug_struct("Component")
                .field("type", &component.ty.name())
                .field("key", &component.key)
                .finish(),
            Node::Frame(frame) => f
                .debug_struct("Frame")
                .field("src", &frame.src)
                .field("name", &frame.name)
                .finish(),
        }
    }
}

impl From<&str> for Node {
    fn from(value: &str) -> Self {
        Node::Text(value.into())
    }
}

impl From<String> for Node {
    fn from(value: String) -> Self {
        Node::Text(value.into())
    }
}

impl From<HostBuilder> for Node {
    fn from(builder: HostBuilder) -> Self {
        builder.build()
    }
}

impl From<FrameBuilder> for Node {
    fn from(builder: FrameBuilder) -> Self {
        builder.build()
    }
}

// =============================================================================
// Builders
// =============================================================================

/// A text node.
pub fn text(value: impl AsRef<str>) -> Node {
    Node::Text(value.as_ref().into())
}

/// Start building a host element.
pub fn h(tag: impl AsRef<str>) -> HostBuilder {
    HostBuilder {
        tag: tag.as_ref().into(),
        key: None,
        props: Props::new(),
        children: Vec::new(),
    }
}

/// An unkeyed fragment.
pub fn fragment(children: impl IntoIterator<Item = Node>) -> Node {
    Node::Fragment(Rc::new(FragmentNode {
        key: None,
        children: children.into_iter().collect(),
    }))
}

/// A keyed fragment.
pub fn keyed_fragment(key: impl Into<Key>, children: impl IntoIterator<Item = Node>) -> Node {
    Node::Fragment(Rc::new(FragmentNode {
        key: Some(key.into()),
        children: children.into_iter().collect(),
    }))
}

/// A component invocation.
pub fn component(ty: &ComponentType, props: Props) -> Node {
    Node::Component(Rc::new(ComponentNode {
        ty: ty.clone(),
        key: None,
        props,
    }))
}

/// A keyed component invocation.
pub fn keyed_component(key: impl Into<Key>, ty: &ComponentType, props: Props) -> Node {
    Node::Component(Rc::new(ComponentNode {
        ty: ty.clone(),
        key: Some(key.into()),
        props,
    }))
}

/// Start building a frame boundary.
pub fn frame(src: impl AsRef<str>) -> FrameBuilder {
    FrameBuilder {
        key: None,
        src: src.as_ref().into(),
        name: None,
        fallback: None,
    }
}

/// Builder for [`HostNode`].
pub struct HostBuilder {
    tag: Rc<str>,
    key: Option<Key>,
    props: Props,
    children: Vec<Node>,
}

impl HostBuilder {
    pub fn key(mut self, key: impl Into<Key>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn prop(mut self, name: impl Into<String>, value: impl Into<PropValue>) -> Self {
        self.props.insert(name.into(), value.into());
        self
    }

    pub fn props(mut self, props: Props) -> Self {
        self.props.extend(props);
        self
    }

    pub fn class(self, value: impl Into<PropValue>) -> Self {
        self.prop("class", value)
    }

    pub fn style(self, style: Style) -> Self {
        self.prop("style", style)
    }

    /// Attach mixins. Replaces any previous `mix` list.
    pub fn mix(self, descriptors: impl IntoIterator<Item = MixinDescriptor>) -> Self {
        let list: Vec<MixinDescriptor> = descriptors.into_iter().collect();
        self.prop("mix", PropValue::Mix(Rc::new(list)))
    }

    pub fn child(mut self, child: impl Into<Node>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn children<N: Into<Node>>(mut self, children: impl IntoIterator<Item = N>) -> Self {
        self.children.extend(children.into_iter().map(Into::into));
        self
    }

    pub fn build(self) -> Node {
        Node::Host(Rc::new(HostNode {
            tag: self.tag,
            key: self.key,
            props: self.props,
            children: self.children,
        }))
    }
}

/// Builder for [`FrameNode`].
pub struct FrameBuilder {
    key: Option<Key>,
    src: Rc<str>,
    name: Option<Rc<str>>,
    fallback: Option<Node>,
}

impl FrameBuilder {
    pub fn key(mut self, key: impl Into<Key>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn name(mut self, name: impl AsRef<str>) -> Self {
        self.name = Some(name.as_ref().into());
        self
    }

    pub fn fallback(mut self, fallback: impl Into<Node>) -> Self {
        self.fallback = Some(fallback.into());
        self
    }

    pub fn build(self) -> Node {
        Node::Frame(Rc::new(FrameNode {
            key: self.key,
            src: self.src,
            name: self.name,
            fallback: self.fallback,
        }))
    }
}

/// Build a [`Props`] map from pairs.
pub fn props<K: Into<String>, V: Into<PropValue>>(pairs: impl IntoIterator<Item = (K, V)>) -> Props {
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}
