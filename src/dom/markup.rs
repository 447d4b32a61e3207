//! Markup - HTML parsing into the in-memory DOM and serialization back out.
//!
//! Parsing goes through `html5ever`'s fragment parser (body context), so
//! server-rendered markup lands in the DOM exactly as a browser would build
//! it, comments included. Serialization is a small outer/inner HTML writer
//! used by `innerHTML` and by tests.

use html5ever::tendril::TendrilSink;
use html5ever::{local_name, namespace_url, ns, parse_fragment as parse_html_fragment, ParseOpts, QualName};
use markup5ever_rcdom::{Handle, NodeData, RcDom};

use super::{Document, DomNode, NodeType};
use crate::types::{Namespace, XLINK_NS, XML_NS};

/// Elements that never have children or an end tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

/// Elements whose text content is written raw.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

// =============================================================================
// Parsing
// =============================================================================

/// Parse an HTML fragment into detached DOM nodes owned by `doc`.
pub fn parse_fragment(doc: &Document, html: &str) -> Vec<DomNode> {
    let dom = parse_html_fragment(
        RcDom::default(),
        ParseOpts::default(),
        QualName::new(None, ns!(html), local_name!("body")),
        Vec::new(),
    )
    .one(html);

    // The fragment parser wraps its output in a synthetic <html> element.
    let document = dom.document;
    let roots: Vec<Handle> = document.children.borrow().clone();
    let wrapper = roots.iter().find(|handle| {
        matches!(&handle.data, NodeData::Element { name, .. } if name.local == local_name!("html"))
    });
    let top: Vec<Handle> = match wrapper {
        Some(html) => html.children.borrow().clone(),
        None => roots,
    };

    top.iter().filter_map(|handle| convert(doc, handle)).collect()
}

fn convert(doc: &Document, handle: &Handle) -> Option<DomNode> {
    match &handle.data {
        NodeData::Text { contents } => Some(doc.create_text_node(&contents.borrow())),
        NodeData::Comment { contents } => Some(doc.create_comment(contents)),
        NodeData::Element { name, attrs, .. } => {
            let namespace = if name.ns == ns!(svg) {
                Namespace::Svg
            } else if name.ns == ns!(mathml) {
                Namespace::MathMl
            } else {
                Namespace::Html
            };
            let element = doc.create_element_ns(namespace, &name.local);
            for attr in attrs.borrow().iter() {
                let qualified = match &attr.name.prefix {
                    Some(prefix) => format!("{}:{}", prefix, attr.name.local),
                    None => attr.name.local.to_string(),
                };
                let attr_ns = if attr.name.ns == ns!(xlink) {
                    Some(XLINK_NS)
                } else if attr.name.ns == ns!(xml) {
                    Some(XML_NS)
                } else {
                    None
                };
                element.set_attribute_ns(attr_ns, &qualified, &attr.value);
            }
            for child in handle.children.borrow().iter() {
                if let Some(node) = convert(doc, child) {
                    element.append_child(&node);
                }
            }
            Some(element)
        }
        NodeData::Document
        | NodeData::Doctype { .. }
        | NodeData::ProcessingInstruction { .. } => None,
    }
}

// =============================================================================
// Serialization
// =============================================================================

/// Serialize a node and its subtree.
pub fn outer_html(node: &DomNode) -> String {
    let mut out = String::new();
    write_node(node, &mut out, false);
    out
}

/// Serialize the children of a node.
pub fn inner_html(node: &DomNode) -> String {
    let raw = node
        .tag_name()
        .is_some_and(|tag| RAW_TEXT_ELEMENTS.contains(&tag.as_str()));
    let mut out = String::new();
    for child in node.children() {
        write_node(&child, &mut out, raw);
    }
    out
}

fn write_node(node: &DomNode, out: &mut String, raw_text: bool) {
    match node.node_type() {
        NodeType::Text => {
            let data = node.data().unwrap_or_default();
            if raw_text {
                out.push_str(&data);
            } else {
                escape_text(&data, out);
            }
        }
        NodeType::Comment => {
            out.push_str("<!--");
            out.push_str(&node.data().unwrap_or_default());
            out.push_str("-->");
        }
        NodeType::Document => out.push_str(&inner_html(node)),
        NodeType::Element => {
            let tag = node.tag_name().unwrap_or_default();
            out.push('<');
            out.push_str(&tag);
            for (name, value) in node.attributes() {
                out.push(' ');
                out.push_str(&name);
                out.push_str("=\"");
                escape_attribute(&value, out);
                out.push('"');
            }
            out.push('>');
            if VOID_ELEMENTS.contains(&tag.as_str()) && node.namespace() == Some(Namespace::Html) {
                return;
            }
            out.push_str(&inner_html(node));
            out.push_str("</");
            out.push_str(&tag);
            out.push('>');
        }
    }
}

fn escape_text(text: &str, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(ch),
        }
    }
}

fn escape_attribute(value: &str, out: &mut String) {
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(ch),
        }
    }
}
