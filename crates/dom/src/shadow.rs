//! Shadow-tree resolution predicates.
//!
//! Pure reads over the arena; no mutation.

use crate::document::Document;
use crate::types::{HostSlot, NodeKind, NodeRef};

fn tree_root(doc: &Document, node: NodeRef) -> NodeRef {
    let mut current = node;
    while let Some(parent) = doc.parent(current) {
        current = parent;
    }
    current
}

/// The host owning the shadow tree that directly contains `node`, or `None`
/// when `node` is not inside any shadow tree.
///
/// A host slot carrying a detached-fragment label, or one that resolves to
/// the queried node itself or to a non-element, is a phantom host and is
/// rejected rather than followed.
pub fn shadow_host(doc: &Document, node: NodeRef) -> Option<NodeRef> {
    let root = tree_root(doc, node);
    let NodeKind::ShadowRoot { host } = doc.kind(root) else {
        return None;
    };
    match host {
        HostSlot::Element(host) if !is_phantom_host(doc, node, *host) => Some(*host),
        HostSlot::Element(_) | HostSlot::Detached(_) => {
            log::debug!(target: "dom.shadow", "ignoring phantom shadow host for {node:?}");
            None
        }
    }
}

fn is_phantom_host(doc: &Document, node: NodeRef, host: NodeRef) -> bool {
    host == node || !doc.is_element(host)
}

/// Walk `shadow_host` to the outermost host; `node` itself when it is not
/// inside shadow DOM.
pub fn root_shadow_host(doc: &Document, node: NodeRef) -> NodeRef {
    let mut current = node;
    while let Some(host) = shadow_host(doc, current) {
        current = host;
    }
    current
}

fn connected(doc: &Document, node: NodeRef) -> bool {
    tree_root(doc, node) == doc.root()
}

/// True iff the root shadow host (or `node` itself, when not shadowed) is
/// connected to the main document.
pub fn shadow_host_in_dom(doc: &Document, node: NodeRef) -> bool {
    connected(doc, root_shadow_host(doc, node))
}

/// True iff `node` is connected to the document directly or transitively
/// through shadow boundaries.
pub fn in_dom(doc: &Document, node: NodeRef) -> bool {
    if shadow_host(doc, node).is_some() {
        shadow_host_in_dom(doc, node)
    } else {
        connected(doc, node)
    }
}
