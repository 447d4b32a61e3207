//! Host Property Diff - Reconcile an element's attributes and properties.
//!
//! `diff_host_props(prev, next, dom, namespace)` writes the difference between
//! two prop maps to one element:
//! - `class` / `className` collapse to one canonical `class` prop first
//! - Removed props reset form-control state before the attribute goes
//! - Changed props go through `style` serialization, then the DOM property
//!   path (HTML only, outside [`attributes::ATTRIBUTE_ONLY`]), then the
//!   attribute path with per-namespace name translation
//!
//! Values are compared with [`PropValue::same`], so diffing a map against
//! itself writes nothing.

pub mod attributes;
pub mod controlled;

use std::borrow::Cow;

use indexmap::IndexMap;

use crate::dom::DomNode;
use crate::types::{Namespace, PropValue, Props, Style, format_number};
use attributes::{ATTRIBUTE_ONLY, ECHO_PROPS, EchoReset, attribute_name, keeps_false};

pub use controlled::ControlledReflection;

/// Props the engine consumes itself. Never written to the DOM.
pub const RESERVED_PROPS: &[&str] = &["key", "children", "mix"];

// =============================================================================
// Diff
// =============================================================================

/// Write the difference between `prev` and `next` to `dom`.
pub fn diff_host_props(prev: &Props, next: &Props, dom: &DomNode, namespace: Namespace) {
    let prev = canonicalize(prev);
    let next = canonicalize(next);

    for (name, old) in prev.iter() {
        if old.is_null() {
            continue;
        }
        let removed = next.get(name).is_none_or(PropValue::is_null);
        if removed {
            remove_prop(dom, name, old, namespace);
        }
    }

    for (name, value) in next.iter() {
        if value.is_null() {
            continue;
        }
        let old = prev.get(name);
        if old.is_some_and(|old| old.same(value)) {
            continue;
        }
        set_prop(dom, name, old, value, namespace);
    }
}

/// Props with reserved names dropped and `className` folded into `class`.
/// A non-null `class` wins over `className`.
fn canonicalize(props: &Props) -> IndexMap<&str, PropValue> {
    let mut out = IndexMap::with_capacity(props.len());
    for (name, value) in props {
        if RESERVED_PROPS.contains(&name.as_str()) {
            continue;
        }
        match name.as_str() {
            "className" => {
                if props.get("class").is_none_or(PropValue::is_null) {
                    out.insert("class", value.clone());
                }
            }
            _ => {
                out.insert(name.as_str(), value.clone());
            }
        }
    }
    out
}

fn remove_prop(dom: &DomNode, name: &str, old: &PropValue, namespace: Namespace) {
    if old.is_callback() {
        return;
    }
    if namespace != Namespace::Svg {
        if let Some((_, reset)) = ECHO_PROPS.iter().find(|(prop, _)| *prop == name) {
            if dom.has_property(name) {
                dom.set_property(name, reset_value(*reset));
            }
        }
        if name == "innerHTML" {
            dom.set_property(name, PropValue::from(""));
            return;
        }
    }
    let (_, attribute) = attribute_name(name, namespace);
    dom.remove_attribute(&attribute);
}

fn reset_value(reset: EchoReset) -> PropValue {
    match reset {
        EchoReset::EmptyString => PropValue::from(""),
        EchoReset::False => PropValue::Bool(false),
        EchoReset::MinusOne => PropValue::Number(-1.0),
    }
}

fn set_prop(dom: &DomNode, name: &str, old: Option<&PropValue>, value: &PropValue, namespace: Namespace) {
    match value {
        // Functions are never serialized. Drop an attribute the previous
        // value may have written.
        PropValue::Callback(_) | PropValue::Mix(_) => {
            if let Some(old) = old.filter(|old| !old.is_callback() && !old.is_null()) {
                remove_prop(dom, name, old, namespace);
            }
            return;
        }
        PropValue::Style(style) if name == "style" => {
            let css = style_to_css(style);
            if css.is_empty() {
                dom.remove_attribute("style");
            } else {
                dom.set_attribute("style", &css);
            }
            return;
        }
        _ => {}
    }

    if namespace != Namespace::Svg && !ATTRIBUTE_ONLY.contains(&name) && dom.has_property(name) {
        dom.set_property(name, value.clone());
        return;
    }

    let (attr_ns, attribute) = attribute_name(name, namespace);
    match value {
        PropValue::Bool(false) if !keeps_false(&attribute) => dom.remove_attribute(&attribute),
        PropValue::Bool(true) if name == "popover" => dom.set_attribute("popover", ""),
        _ => {
            let text = value.to_attribute_string();
            match attr_ns {
                Some(ns) => dom.set_attribute_ns(Some(ns), &attribute, &text),
                None => dom.set_attribute(&attribute, &text),
            }
        }
    }
}

// =============================================================================
// Style
// =============================================================================

/// CSS properties whose numeric values take no `px` suffix.
const UNITLESS: &[&str] = &[
    "animationIterationCount",
    "aspectRatio",
    "columnCount",
    "columns",
    "fillOpacity",
    "flex",
    "flexGrow",
    "flexShrink",
    "fontWeight",
    "gridArea",
    "gridColumn",
    "gridRow",
    "lineClamp",
    "lineHeight",
    "opacity",
    "order",
    "orphans",
    "scale",
    "stopOpacity",
    "strokeOpacity",
    "strokeWidth",
    "tabSize",
    "widows",
    "zIndex",
    "zoom",
];

/// Serialize a style object to CSS text: `fontSize: 12` → `font-size: 12px`.
/// Null and `false` entries are skipped; custom properties (`--x`) keep
/// their name.
pub fn style_to_css(style: &Style) -> String {
    let mut declarations = Vec::with_capacity(style.len());
    for (name, value) in style {
        let text = match value {
            PropValue::Null | PropValue::Bool(false) => continue,
            PropValue::Callback(_) | PropValue::Mix(_) | PropValue::Style(_) => continue,
            PropValue::Number(n) if *n != 0.0 && !name.starts_with("--") && !UNITLESS.contains(&name.as_str()) => {
                format!("{}px", format_number(*n))
            }
            other => other.to_attribute_string(),
        };
        declarations.push(format!("{}: {}", css_property_name(name), text));
    }
    declarations.join("; ")
}

fn css_property_name(name: &str) -> Cow<'_, str> {
    if name.starts_with("--") || name.contains('-') {
        return Cow::Borrowed(name);
    }
    // Vendor prefixes: WebkitTransition → -webkit-transition.
    let kebab = attributes::kebab_case(name);
    match kebab {
        Cow::Owned(s) if name.starts_with(|c: char| c.is_ascii_uppercase()) => Cow::Owned(s),
        Cow::Owned(s) if name.starts_with("ms") => Cow::Owned(format!("-{s}")),
        other => other,
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;
    use crate::engine::node::props;
    use std::rc::Rc;

    fn attached(doc: &Document, tag: &str) -> DomNode {
        let el = doc.create_element(tag);
        doc.body().append_child(&el);
        doc.take_mutations();
        el
    }

    #[test]
    fn test_idempotent_diff_writes_nothing() {
        let doc = Document::new();
        let input = attached(&doc, "input");
        let p = props([
            ("id", PropValue::from("name")),
            ("class", PropValue::from("field")),
            ("value", PropValue::from("a")),
            ("disabled", PropValue::from(true)),
            ("aria-label", PropValue::from("Name")),
        ]);
        diff_host_props(&Props::new(), &p, &input, Namespace::Html);
        assert!(doc.mutation_count() > 0);
        doc.take_mutations();

        diff_host_props(&p, &p, &input, Namespace::Html);
        assert_eq!(doc.mutation_count(), 0);
    }

    #[test]
    fn test_class_name_is_canonical_class() {
        let doc = Document::new();
        let div = attached(&doc, "div");
        let prev = props([("className", "a")]);
        diff_host_props(&Props::new(), &prev, &div, Namespace::Html);
        assert_eq!(div.get_attribute("class").as_deref(), Some("a"));

        // Switching spelling with the same value is not a change.
        doc.take_mutations();
        let next = props([("class", "a")]);
        diff_host_props(&prev, &next, &div, Namespace::Html);
        assert_eq!(doc.mutation_count(), 0);
    }

    #[test]
    fn test_removing_value_resets_property() {
        let doc = Document::new();
        let input = attached(&doc, "input");
        let prev = props([("value", "typed")]);
        diff_host_props(&Props::new(), &prev, &input, Namespace::Html);
        assert_eq!(input.get_property("value"), PropValue::from("typed"));

        diff_host_props(&prev, &Props::new(), &input, Namespace::Html);
        assert_eq!(input.get_property("value"), PropValue::from(""));
        assert!(!input.has_attribute("value"));
    }

    #[test]
    fn test_attribute_only_props_use_attributes() {
        let doc = Document::new();
        let a = attached(&doc, "a");
        let p = props([("href", PropValue::from("/x")), ("tabIndex", PropValue::from(2))]);
        diff_host_props(&Props::new(), &p, &a, Namespace::Html);
        assert_eq!(a.get_attribute("href").as_deref(), Some("/x"));
        assert_eq!(a.get_attribute("tabindex").as_deref(), Some("2"));
    }

    #[test]
    fn test_false_and_popover() {
        let doc = Document::new();
        let div = attached(&doc, "div");
        let p = props([
            ("data-open", PropValue::from(false)),
            ("translate", PropValue::from(false)),
            ("popover", PropValue::from(true)),
        ]);
        diff_host_props(&Props::new(), &p, &div, Namespace::Html);
        assert_eq!(div.get_attribute("data-open").as_deref(), Some("false"));
        assert!(!div.has_attribute("translate"));
        assert_eq!(div.get_attribute("popover").as_deref(), Some(""));
    }

    #[test]
    fn test_callbacks_are_never_attributes() {
        let doc = Document::new();
        let div = attached(&doc, "div");
        let cb: crate::types::Callback = Rc::new(|_| {});
        let p = props([("onclick", PropValue::Callback(cb))]);
        diff_host_props(&Props::new(), &p, &div, Namespace::Html);
        assert!(div.attributes().is_empty());
    }

    #[test]
    fn test_svg_attribute_translation() {
        let doc = Document::new();
        let circle = doc.create_element_ns(Namespace::Svg, "circle");
        let p = props([
            ("strokeWidth", PropValue::from(2)),
            ("className", PropValue::from("dot")),
        ]);
        diff_host_props(&Props::new(), &p, &circle, Namespace::Svg);
        assert_eq!(circle.get_attribute("stroke-width").as_deref(), Some("2"));
        assert_eq!(circle.get_attribute("class").as_deref(), Some("dot"));
    }

    #[test]
    fn test_style_to_css() {
        let mut style = Style::new();
        style.insert("fontSize".into(), PropValue::from(12));
        style.insert("opacity".into(), PropValue::from(0.5));
        style.insert("color".into(), PropValue::from("red"));
        style.insert("--gap".into(), PropValue::from(4));
        style.insert("margin".into(), PropValue::Null);
        style.insert("WebkitTransition".into(), PropValue::from("none"));
        assert_eq!(
            style_to_css(&style),
            "font-size: 12px; opacity: 0.5; color: red; --gap: 4; -webkit-transition: none"
        );
    }
}
