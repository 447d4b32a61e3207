//! Core types for spark-dom.
//!
//! These are the values that flow between the node model, the property diff,
//! the mixin runtime and the DOM: prop values, keys, namespaces and the
//! per-pass diff flags.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::dom::Event;
use crate::mixin::MixinDescriptor;

// =============================================================================
// Namespaces
// =============================================================================

pub const HTML_NS: &str = "http://www.w3.org/1999/xhtml";
pub const SVG_NS: &str = "http://www.w3.org/2000/svg";
pub const MATHML_NS: &str = "http://www.w3.org/1998/Math/MathML";
pub const XLINK_NS: &str = "http://www.w3.org/1999/xlink";
pub const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

/// Element namespace. Decides tag casing, property availability and
/// attribute name translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Namespace {
    #[default]
    Html,
    Svg,
    MathMl,
}

impl Namespace {
    pub fn uri(self) -> &'static str {
        match self {
            Namespace::Html => HTML_NS,
            Namespace::Svg => SVG_NS,
            Namespace::MathMl => MATHML_NS,
        }
    }

    /// Namespace for the children of an element with `tag` in `self`.
    pub fn for_children(self, tag: &str) -> Namespace {
        match (self, tag) {
            (Namespace::Svg, "foreignObject") => Namespace::Html,
            _ => self.for_element(tag),
        }
    }

    /// Namespace of an element with `tag` whose parent is in `self`.
    pub fn for_element(self, tag: &str) -> Namespace {
        match tag {
            "svg" => Namespace::Svg,
            "math" => Namespace::MathMl,
            _ => self,
        }
    }
}

// =============================================================================
// Keys
// =============================================================================

/// Sibling key for keyed child diffing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Str(Rc<str>),
    Int(i64),
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Str(s) => f.write_str(s),
            Key::Int(n) => write!(f, "{n}"),
        }
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Key::Str(value.into())
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Key::Str(value.into())
    }
}

impl From<i64> for Key {
    fn from(value: i64) -> Self {
        Key::Int(value)
    }
}

impl From<i32> for Key {
    fn from(value: i32) -> Self {
        Key::Int(value.into())
    }
}

impl From<u32> for Key {
    fn from(value: u32) -> Self {
        Key::Int(value.into())
    }
}

impl From<usize> for Key {
    fn from(value: usize) -> Self {
        Key::Int(value as i64)
    }
}

// =============================================================================
// Callback Types
// =============================================================================

/// Callback-valued prop (Rc so prop maps stay cheap to clone and identity can
/// be compared).
pub type Callback = Rc<dyn Fn(&Event)>;

/// Deferred work run after a commit.
pub type Task = Box<dyn FnOnce()>;

// =============================================================================
// Prop Values
// =============================================================================

/// Inline style declarations, in declaration order.
pub type Style = IndexMap<String, PropValue>;

/// A host node's props, in declaration order.
pub type Props = IndexMap<String, PropValue>;

/// A single prop value.
///
/// A closed set of variants instead of duck-typed values: the property diff
/// and the mixin runtime match on the discriminant.
#[derive(Clone, Default)]
pub enum PropValue {
    /// Absent (`null`/`undefined`). A prop set to `Null` is treated as removed.
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    Str(Rc<str>),
    /// Inline style object, serialized to the `style` attribute.
    Style(Rc<Style>),
    /// Function value. Never serialized as an attribute.
    Callback(Callback),
    /// Mixin descriptor list (the `mix` prop).
    Mix(Rc<Vec<MixinDescriptor>>),
}

impl PropValue {
    pub fn is_null(&self) -> bool {
        matches!(self, PropValue::Null)
    }

    pub fn is_callback(&self) -> bool {
        matches!(self, PropValue::Callback(_))
    }

    /// JavaScript truthiness.
    pub fn is_truthy(&self) -> bool {
        match self {
            PropValue::Null => false,
            PropValue::Bool(b) => *b,
            PropValue::Number(n) => *n != 0.0 && !n.is_nan(),
            PropValue::Str(s) => !s.is_empty(),
            PropValue::Style(_) | PropValue::Callback(_) | PropValue::Mix(_) => true,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            PropValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// String form used for attribute writes.
    pub fn to_attribute_string(&self) -> String {
        match self {
            PropValue::Null => String::new(),
            PropValue::Bool(b) => b.to_string(),
            PropValue::Number(n) => format_number(*n),
            PropValue::Str(s) => s.to_string(),
            PropValue::Style(style) => crate::props::style_to_css(style),
            PropValue::Callback(_) | PropValue::Mix(_) => String::new(),
        }
    }

    /// Reference equality as the property diff sees it: scalars by value,
    /// callbacks and mixin lists by identity, style objects structurally.
    pub fn same(&self, other: &PropValue) -> bool {
        match (self, other) {
            (PropValue::Null, PropValue::Null) => true,
            (PropValue::Bool(a), PropValue::Bool(b)) => a == b,
            (PropValue::Number(a), PropValue::Number(b)) => a == b,
            (PropValue::Str(a), PropValue::Str(b)) => a == b,
            (PropValue::Style(a), PropValue::Style(b)) => {
                Rc::ptr_eq(a, b)
                    || (a.len() == b.len()
                        && a.iter().zip(b.iter()).all(|((ka, va), (kb, vb))| ka == kb && va.same(vb)))
            }
            (PropValue::Callback(a), PropValue::Callback(b)) => Rc::ptr_eq(a, b),
            (PropValue::Mix(a), PropValue::Mix(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Number to string the way JavaScript prints it for common values.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity".to_string() } else { "-Infinity".to_string() }
    } else if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

impl PartialEq for PropValue {
    fn eq(&self, other: &Self) -> bool {
        self.same(other)
    }
}

impl fmt::Debug for PropValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropValue::Null => write!(f, "Null"),
            PropValue::Bool(b) => write!(f, "Bool({b})"),
            PropValue::Number(n) => write!(f, "Number({n})"),
            PropValue::Str(s) => write!(f, "Str({s:?})"),
            PropValue::Style(style) => f.debug_map().entries(style.iter()).finish(),
            PropValue::Callback(_) => write!(f, "Callback(..)"),
            PropValue::Mix(list) => write!(f, "Mix({} descriptors)", list.len()),
        }
    }
}

impl From<&str> for PropValue {
    fn from(value: &str) -> Self {
        PropValue::Str(value.into())
    }
}

impl From<String> for PropValue {
    fn from(value: String) -> Self {
        PropValue::Str(value.into())
    }
}

impl From<Rc<str>> for PropValue {
    fn from(value: Rc<str>) -> Self {
        PropValue::Str(value)
    }
}

impl From<bool> for PropValue {
    fn from(value: bool) -> Self {
        PropValue::Bool(value)
    }
}

impl From<f64> for PropValue {
    fn from(value: f64) -> Self {
        PropValue::Number(value)
    }
}

impl From<i32> for PropValue {
    fn from(value: i32) -> Self {
        PropValue::Number(value.into())
    }
}

impl From<i64> for PropValue {
    fn from(value: i64) -> Self {
        PropValue::Number(value as f64)
    }
}

impl From<usize> for PropValue {
    fn from(value: usize) -> Self {
        PropValue::Number(value as f64)
    }
}

impl From<Style> for PropValue {
    fn from(value: Style) -> Self {
        PropValue::Style(Rc::new(value))
    }
}

impl<T: Into<PropValue>> From<Option<T>> for PropValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(PropValue::Null)
    }
}

// =============================================================================
// Diff Flags (bitflags)
// =============================================================================

bitflags::bitflags! {
    /// Per-pass bookkeeping on a committed node. Valid only while one child
    /// list is being diffed; cleared before the pass returns.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct DiffFlags: u8 {
        const NONE = 0;
        /// An old child was claimed by a new sibling.
        const MATCHED = 1 << 0;
        /// The child was created during this pass.
        const MOUNTED = 1 << 1;
        /// The child must be moved into its slot.
        const NEEDS_PLACEMENT = 1 << 2;
    }
}

// =============================================================================
// Tests
// =============================================================================
