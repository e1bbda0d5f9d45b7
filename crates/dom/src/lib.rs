pub mod document;
pub mod select;
pub mod shadow;
pub mod types;

// Re-exports so other crates can just use `dom::...` nicely.
pub use document::Document;
pub use select::{matches_list, matches_selector};
pub use shadow::{in_dom, root_shadow_host, shadow_host, shadow_host_in_dom};
pub use types::{CompatMode, HostSlot, LiveState, NodeKind, NodeRef, SheetRef};
