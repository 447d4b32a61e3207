//! Head elements - `<head>` mapping and metadata hoisting.
//!
//! With hoisting enabled, an HTML `head` host renders onto the document's
//! own `<head>`, and metadata hosts (`title`, `meta`, `link`, `style`,
//! JSON-LD `script`) are appended to `document.head` wherever they appear in
//! the tree. During hydration a hoisted host adopts an existing matching
//! element instead of creating a duplicate.

use crate::dom::DomNode;
use crate::engine::node::HostNode;
use crate::pipeline::context::RootContext;
use crate::types::{Namespace, PropValue};

/// How a host relates to `document.head`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HeadRole {
    None,
    /// The `head` host itself.
    DocumentHead,
    /// Lives in `document.head` regardless of its logical parent.
    Hoisted,
}

pub(crate) fn head_role(cx: &RootContext, host: &HostNode, namespace: Namespace) -> HeadRole {
    if !cx.config.hoist_head || namespace != Namespace::Html {
        return HeadRole::None;
    }
    match host.tag.to_ascii_lowercase().as_str() {
        "head" => HeadRole::DocumentHead,
        "title" | "meta" | "link" | "style" => HeadRole::Hoisted,
        "script" if prop_string(host, "type").as_deref() == Some("application/ld+json") => HeadRole::Hoisted,
        _ => HeadRole::None,
    }
}

fn prop_string(host: &HostNode, name: &str) -> Option<String> {
    match host.props.get(name) {
        None | Some(PropValue::Null) => None,
        Some(value) => Some(value.to_attribute_string()),
    }
}

/// First prop present among `names` (aliases of one attribute).
fn first_prop(host: &HostNode, names: &[&str]) -> Option<(&'static str, String)> {
    const CANONICAL: &[(&str, &str)] = &[
        ("name", "name"),
        ("property", "property"),
        ("httpEquiv", "http-equiv"),
        ("http-equiv", "http-equiv"),
        ("charSet", "charset"),
        ("charset", "charset"),
    ];
    names.iter().find_map(|name| {
        let value = prop_string(host, name)?;
        let attribute = CANONICAL
            .iter()
            .find(|(prop, _)| prop == name)
            .map(|(_, attribute)| *attribute)?;
        Some((attribute, value))
    })
}

/// An unclaimed element in `document.head` that `host` can adopt.
pub(crate) fn find_existing(cx: &RootContext, host: &HostNode) -> Option<DomNode> {
    let tag = host.tag.to_ascii_lowercase();
    let claims = cx.head_claims.borrow();
    let mut candidates = cx
        .document
        .head()
        .children()
        .into_iter()
        .filter(|node| node.tag_name().as_deref() == Some(tag.as_str()) && !claims.contains(node));

    match tag.as_str() {
        "title" => candidates.next(),
        "meta" => {
            let (attribute, value) =
                first_prop(host, &["name", "property", "httpEquiv", "http-equiv", "charSet", "charset"])?;
            candidates.find(|node| node.get_attribute(attribute).as_deref() == Some(value.as_str()))
        }
        "link" => {
            let rel = prop_string(host, "rel")?;
            let href = prop_string(host, "href")?;
            candidates.find(|node| {
                node.get_attribute("rel").as_deref() == Some(rel.as_str())
                    && node.get_attribute("href").as_deref() == Some(href.as_str())
            })
        }
        _ => None,
    }
}
