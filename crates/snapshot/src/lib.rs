pub mod meta;
pub mod mirror;
pub mod serialize;
pub mod types;

// Re-exports so consumers can just use `snapshot::...` nicely.
pub use meta::is_node_meta_equal;
pub use mirror::{ABSENT, MirrorId, NodeMirror, StyleSheetMirror};
pub use serialize::{
    MaskInputFn, MaskTextFn, SlimDomOptions, SnapshotOptions, SnapshotResult,
    serialize_node_with_id, snapshot_document,
};
pub use types::{
    Attributes, CSS_SPLIT_MARKER, CSS_TEXT_ATTR, RR_DISPLAY, RR_HEIGHT, RR_SCROLL_LEFT,
    RR_SCROLL_TOP, RR_WIDTH, SerializedNode, SerializedNodeWithId,
};
