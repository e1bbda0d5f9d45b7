//! Selector matching for redaction policy.

use crate::document::Document;
use crate::types::NodeRef;
use cssom::{Selector, SelectorList};

/// Check if an element matches a single selector.
pub fn matches_selector(doc: &Document, node: NodeRef, selector: &Selector) -> bool {
    let Some(tag) = doc.tag(node) else {
        return false;
    };
    match selector {
        Selector::Universal => true,
        Selector::Type(t) => tag.eq_ignore_ascii_case(t),
        Selector::Id(want) => doc.attr(node, "id") == Some(want.as_str()),
        Selector::Class(want) => doc.has_class(node, want),
    }
}

/// An element matches a list if it matches any member.
pub fn matches_list(doc: &Document, node: NodeRef, list: &SelectorList) -> bool {
    list.0.iter().any(|s| matches_selector(doc, node, s))
}
