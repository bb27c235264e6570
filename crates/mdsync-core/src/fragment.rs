//! Parsing and serializing standalone HTML fragments.

use html5ever::{local_name, namespace_url, ns, QualName};
use kuchikiki::traits::*;
use kuchikiki::NodeRef;

use crate::reconcile::ReconcileError;

/// Parse `html` the way a `<body>` parses assigned inner HTML.
///
/// Returns the root element holding the fragment's nodes. Head-level
/// elements such as `<style>` or `<link>` stay where they appear.
pub fn parse_fragment(html: &str) -> Result<NodeRef, ReconcileError> {
    let context = QualName::new(None, ns!(html), local_name!("body"));
    let document = kuchikiki::parse_fragment(context, Vec::new()).one(html);
    let root = document
        .select_first("html")
        .map_err(|_| ReconcileError::Selector("html"))?;
    Ok(root.as_node().clone())
}

/// Serialize the children of `container`, excluding the container itself.
pub fn serialize_children(container: &NodeRef) -> Result<String, ReconcileError> {
    let mut output = Vec::new();
    for child in container.children() {
        child
            .serialize(&mut output)
            .map_err(|err| ReconcileError::Serialize(err.to_string()))?;
    }
    String::from_utf8(output).map_err(|err| ReconcileError::Serialize(err.to_string()))
}

/// Whitespace-separated class tokens of `node`, if it is an element.
pub fn class_tokens(node: &NodeRef) -> Vec<String> {
    node.as_element()
        .and_then(|element| {
            element
                .attributes
                .borrow()
                .get("class")
                .map(|value| value.split_whitespace().map(str::to_string).collect())
        })
        .unwrap_or_default()
}

/// Add `class` to `node` unless it already carries it.
pub fn add_class(node: &NodeRef, class: &str) {
    let Some(element) = node.as_element() else {
        return;
    };
    let mut attributes = element.attributes.borrow_mut();
    let current = attributes.get("class").unwrap_or_default().to_string();
    if current.split_whitespace().any(|token| token == class) {
        return;
    }
    let merged = if current.trim().is_empty() {
        class.to_string()
    } else {
        format!("{} {class}", current.trim())
    };
    attributes.insert("class", merged);
}
