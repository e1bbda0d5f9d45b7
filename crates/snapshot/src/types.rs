//! Serialized node graph.
//!
//! This is the on-the-wire shape the transport layer persists and the player
//! consumes. The synthetic attribute names and the split marker below are
//! part of that contract and must be reproduced exactly.

use crate::mirror::MirrorId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const RR_SCROLL_TOP: &str = "rr_scrollTop";
pub const RR_SCROLL_LEFT: &str = "rr_scrollLeft";
pub const RR_WIDTH: &str = "rr_width";
pub const RR_HEIGHT: &str = "rr_height";
pub const RR_DISPLAY: &str = "rr_display";

/// Attribute carrying reconstructed stylesheet text.
pub const CSS_TEXT_ATTR: &str = "_cssText";

/// Separator between the CSSOM-derived and literal-text segments of a
/// reconstructed stylesheet.
pub const CSS_SPLIT_MARKER: &str = "/* rr_split */";

pub type Attributes = BTreeMap<String, String>;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SerializedNode {
    #[serde(rename_all = "camelCase")]
    Document {
        compat_mode: String,
        children: Vec<SerializedNodeWithId>,
    },
    #[serde(rename_all = "camelCase")]
    DocumentType {
        name: String,
        public_id: String,
        system_id: String,
    },
    Element {
        tag: String,
        attributes: Attributes,
        children: Vec<SerializedNodeWithId>,
    },
    Text {
        text: String,
    },
    Comment {
        text: String,
    },
    Cdata {
        text: String,
    },
}

impl SerializedNode {
    pub fn children(&self) -> &[SerializedNodeWithId] {
        match self {
            SerializedNode::Document { children, .. }
            | SerializedNode::Element { children, .. } => children,
            _ => &[],
        }
    }
}

/// A serialized node bound to its mirror id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SerializedNodeWithId {
    pub id: MirrorId,
    #[serde(flatten)]
    pub node: SerializedNode,
}
