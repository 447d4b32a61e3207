//! DOM property table.
//!
//! Answers the `name in element` question for HTML elements and describes how
//! each property is stored: reflected into an attribute, kept as element state
//! (form-control echo values), or special (`innerHTML`).

use crate::types::{Namespace, PropValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PropertyKind {
    /// Property reads and writes an attribute. Boolean properties map to
    /// attribute presence.
    Reflect { attribute: &'static str, boolean: bool },
    /// Property holds its own state. When unset it reads its default from
    /// `default_attribute`.
    State { default_attribute: Option<&'static str> },
    InnerHtml,
}

use PropertyKind::{InnerHtml, Reflect, State};

const fn reflect(attribute: &'static str) -> PropertyKind {
    Reflect { attribute, boolean: false }
}

const fn flag(attribute: &'static str) -> PropertyKind {
    Reflect { attribute, boolean: true }
}

const GLOBAL: &[(&str, PropertyKind)] = &[
    ("id", reflect("id")),
    ("className", reflect("class")),
    ("title", reflect("title")),
    ("lang", reflect("lang")),
    ("dir", reflect("dir")),
    ("slot", reflect("slot")),
    ("accessKey", reflect("accesskey")),
    ("hidden", flag("hidden")),
    ("tabIndex", reflect("tabindex")),
    ("draggable", reflect("draggable")),
    ("innerHTML", InnerHtml),
];

const INPUT: &[(&str, PropertyKind)] = &[
    ("value", State { default_attribute: Some("value") }),
    ("checked", State { default_attribute: Some("checked") }),
    ("indeterminate", State { default_attribute: None }),
    ("defaultValue", reflect("value")),
    ("defaultChecked", flag("checked")),
    ("disabled", flag("disabled")),
    ("readOnly", flag("readonly")),
    ("required", flag("required")),
    ("multiple", flag("multiple")),
    ("autofocus", flag("autofocus")),
    ("type", reflect("type")),
    ("name", reflect("name")),
    ("placeholder", reflect("placeholder")),
    ("autocomplete", reflect("autocomplete")),
    ("pattern", reflect("pattern")),
    ("min", reflect("min")),
    ("max", reflect("max")),
    ("step", reflect("step")),
    ("width", reflect("width")),
    ("height", reflect("height")),
    ("list", reflect("list")),
    ("form", reflect("form")),
];

const TEXTAREA: &[(&str, PropertyKind)] = &[
    ("value", State { default_attribute: None }),
    ("disabled", flag("disabled")),
    ("readOnly", flag("readonly")),
    ("required", flag("required")),
    ("name", reflect("name")),
    ("placeholder", reflect("placeholder")),
    ("rows", reflect("rows")),
    ("cols", reflect("cols")),
    ("form", reflect("form")),
];

const SELECT: &[(&str, PropertyKind)] = &[
    ("value", State { default_attribute: None }),
    ("selectedIndex", State { default_attribute: None }),
    ("disabled", flag("disabled")),
    ("multiple", flag("multiple")),
    ("required", flag("required")),
    ("name", reflect("name")),
    ("form", reflect("form")),
];

const OPTION: &[(&str, PropertyKind)] = &[
    ("value", reflect("value")),
    ("selected", State { default_attribute: Some("selected") }),
    ("defaultSelected", flag("selected")),
    ("disabled", flag("disabled")),
    ("label", reflect("label")),
];

const BUTTON: &[(&str, PropertyKind)] = &[
    ("disabled", flag("disabled")),
    ("type", reflect("type")),
    ("name", reflect("name")),
    ("value", reflect("value")),
    ("form", reflect("form")),
];

const ANCHOR: &[(&str, PropertyKind)] = &[
    ("href", reflect("href")),
    ("target", reflect("target")),
    ("rel", reflect("rel")),
    ("download", reflect("download")),
    ("hreflang", reflect("hreflang")),
];

const IMAGE: &[(&str, PropertyKind)] = &[
    ("src", reflect("src")),
    ("alt", reflect("alt")),
    ("width", reflect("width")),
    ("height", reflect("height")),
    ("loading", reflect("loading")),
];

const FORM: &[(&str, PropertyKind)] = &[
    ("action", reflect("action")),
    ("method", reflect("method")),
    ("target", reflect("target")),
    ("noValidate", flag("novalidate")),
];

const LABEL: &[(&str, PropertyKind)] = &[("htmlFor", reflect("for"))];

const TABLE_CELL: &[(&str, PropertyKind)] = &[
    ("rowSpan", reflect("rowspan")),
    ("colSpan", reflect("colspan")),
];

fn tag_table(tag: &str) -> &'static [(&'static str, PropertyKind)] {
    match tag {
        "input" => INPUT,
        "textarea" => TEXTAREA,
        "select" => SELECT,
        "option" => OPTION,
        "button" => BUTTON,
        "a" | "area" => ANCHOR,
        "img" => IMAGE,
        "form" => FORM,
        "label" => LABEL,
        "td" | "th" => TABLE_CELL,
        _ => &[],
    }
}

/// Look up a DOM property on an element. Only HTML elements expose
/// properties here; SVG always goes through attributes.
pub(crate) fn lookup(tag: &str, namespace: Namespace, name: &str) -> Option<PropertyKind> {
    if namespace != Namespace::Html {
        return None;
    }
    tag_table(tag)
        .iter()
        .chain(GLOBAL.iter())
        .find(|(n, _)| *n == name)
        .map(|(_, kind)| *kind)
}

/// Value of an unset state property.
pub(crate) fn state_default(name: &str, attribute: Option<String>) -> PropValue {
    match name {
        "value" => PropValue::Str(attribute.unwrap_or_default().into()),
        "checked" | "selected" => PropValue::Bool(attribute.is_some()),
        "indeterminate" => PropValue::Bool(false),
        "selectedIndex" => PropValue::Number(-1.0),
        _ => PropValue::Null,
    }
}

/// Coerce an assigned value the way the DOM's IDL setters do.
pub(crate) fn coerce_state(name: &str, value: PropValue) -> PropValue {
    match name {
        "checked" | "selected" | "indeterminate" => PropValue::Bool(value.is_truthy()),
        "value" => match value {
            PropValue::Null => PropValue::Str("".into()),
            other => PropValue::Str(other.to_attribute_string().into()),
        },
        "selectedIndex" => match value {
            PropValue::Number(n) => PropValue::Number(n.trunc()),
            _ => PropValue::Number(-1.0),
        },
        _ => value,
    }
}
