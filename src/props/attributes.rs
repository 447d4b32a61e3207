//! Attribute names - Prop name → DOM attribute name per namespace.

use std::borrow::Cow;

use crate::types::{Namespace, XLINK_NS, XML_NS};

/// Props that exist as DOM properties but must be written as attributes
/// (their property forms either reject strings or resolve URLs).
pub const ATTRIBUTE_ONLY: &[&str] = &[
    "width", "height", "href", "list", "form", "tabIndex", "download", "rowSpan", "colSpan", "role",
    "popover",
];

/// Form-control props whose DOM property is the live state. Removing one
/// resets the property before the attribute goes.
pub const ECHO_PROPS: &[(&str, EchoReset)] = &[
    ("value", EchoReset::EmptyString),
    ("checked", EchoReset::False),
    ("selected", EchoReset::False),
    ("selectedIndex", EchoReset::MinusOne),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EchoReset {
    EmptyString,
    False,
    MinusOne,
}

const HTML_ALIASES: &[(&str, &str)] = &[
    ("className", "class"),
    ("htmlFor", "for"),
    ("httpEquiv", "http-equiv"),
    ("acceptCharset", "accept-charset"),
];

/// SVG attributes that are camelCase in the DOM.
const SVG_CAMEL_CASE: &[&str] = &[
    "allowReorder",
    "attributeName",
    "attributeType",
    "baseFrequency",
    "baseProfile",
    "calcMode",
    "clipPathUnits",
    "diffuseConstant",
    "edgeMode",
    "filterUnits",
    "glyphRef",
    "gradientTransform",
    "gradientUnits",
    "kernelMatrix",
    "kernelUnitLength",
    "keyPoints",
    "keySplines",
    "keyTimes",
    "lengthAdjust",
    "limitingConeAngle",
    "markerHeight",
    "markerUnits",
    "markerWidth",
    "maskContentUnits",
    "maskUnits",
    "numOctaves",
    "pathLength",
    "patternContentUnits",
    "patternTransform",
    "patternUnits",
    "pointsAtX",
    "pointsAtY",
    "pointsAtZ",
    "preserveAlpha",
    "preserveAspectRatio",
    "primitiveUnits",
    "refX",
    "refY",
    "repeatCount",
    "repeatDur",
    "requiredExtensions",
    "requiredFeatures",
    "specularConstant",
    "specularExponent",
    "spreadMethod",
    "startOffset",
    "stdDeviation",
    "stitchTiles",
    "surfaceScale",
    "systemLanguage",
    "tableValues",
    "targetX",
    "targetY",
    "textLength",
    "viewBox",
    "viewTarget",
    "xChannelSelector",
    "yChannelSelector",
    "zoomAndPan",
];

/// Attribute namespace and name for prop `name` on an element in `namespace`.
pub fn attribute_name(name: &str, namespace: Namespace) -> (Option<&'static str>, Cow<'_, str>) {
    if let Some((_, alias)) = HTML_ALIASES.iter().find(|(prop, _)| *prop == name) {
        return (None, Cow::Borrowed(alias));
    }
    match namespace {
        // HTML attribute names are case-insensitive and stored lowercase.
        Namespace::Html if name.contains(|c: char| c.is_ascii_uppercase()) => {
            return (None, Cow::Owned(name.to_ascii_lowercase()));
        }
        Namespace::Html | Namespace::MathMl => return (None, Cow::Borrowed(name)),
        Namespace::Svg => {}
    }

    if let Some(rest) = name.strip_prefix("xlink") {
        if let Some(local) = rest.strip_prefix(':') {
            return (Some(XLINK_NS), Cow::Owned(format!("xlink:{local}")));
        }
        if rest.starts_with(|c: char| c.is_ascii_uppercase()) {
            return (Some(XLINK_NS), Cow::Owned(format!("xlink:{}", rest.to_ascii_lowercase())));
        }
    }
    if let Some(rest) = name.strip_prefix("xml") {
        if let Some(local) = rest.strip_prefix(':') {
            return (Some(XML_NS), Cow::Owned(format!("xml:{local}")));
        }
        if rest.starts_with(|c: char| c.is_ascii_uppercase()) {
            return (Some(XML_NS), Cow::Owned(format!("xml:{}", rest.to_ascii_lowercase())));
        }
    }
    if SVG_CAMEL_CASE.contains(&name) || name.starts_with("aria") || name.starts_with("data") {
        return (None, Cow::Borrowed(name));
    }
    (None, kebab_case(name))
}

/// `strokeWidth` → `stroke-width`. Names without uppercase letters are
/// returned as is.
pub fn kebab_case(name: &str) -> Cow<'_, str> {
    if !name.contains(|c: char| c.is_ascii_uppercase()) {
        return Cow::Borrowed(name);
    }
    let mut out = String::with_capacity(name.len() + 4);
    for c in name.chars() {
        if c.is_ascii_uppercase() {
            out.push('-');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    Cow::Owned(out)
}

/// `aria-*` and `data-*` attributes keep `false` as a string value.
pub fn keeps_false(attribute: &str) -> bool {
    attribute.starts_with("aria-") || attribute.starts_with("data-")
}
