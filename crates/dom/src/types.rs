pub type NodeIndex = u32;

/// Arena handle for a node. Handles stay valid for the lifetime of the
/// document; removal detaches a subtree but never invalidates handles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeRef(pub NodeIndex);

/// Arena handle for a captured stylesheet owned by the document.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SheetRef(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompatMode {
    NoQuirks,
    Quirks,
}

impl CompatMode {
    /// The string the document reports on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            CompatMode::NoQuirks => "CSS1Compat",
            CompatMode::Quirks => "BackCompat",
        }
    }
}

/// Element state the engine holds outside the markup: current control
/// values, scroll offsets, and the layout box.
#[derive(Clone, Debug, Default)]
pub struct LiveState {
    /// Current control value, when it diverged from the markup default.
    pub value: Option<String>,
    pub checked: Option<bool>,
    pub scroll_top: f64,
    pub scroll_left: f64,
    /// Layout width/height in px, when measured.
    pub box_size: Option<(f64, f64)>,
}

/// What a shadow root reports as its host.
///
/// Some engines, asked for the root of a detached fragment, answer with the
/// queried node itself carrying a string-typed host-like value (observed for
/// unattached anchor text). `Detached` models that answer verbatim so the
/// shadow resolver can reject it by name instead of trusting it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HostSlot {
    Element(NodeRef),
    Detached(String),
}

#[derive(Debug)]
pub enum NodeKind {
    Document {
        compat_mode: CompatMode,
    },
    DocumentType {
        name: String,
        public_id: String,
        system_id: String,
    },
    Element {
        tag: String,
        attributes: Vec<(String, Option<String>)>,
        sheet: Option<SheetRef>,
        shadow_root: Option<NodeRef>,
        live: LiveState,
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
    ShadowRoot {
        host: HostSlot,
    },
}

#[derive(Debug)]
pub(crate) struct NodeData {
    pub(crate) parent: Option<NodeRef>,
    pub(crate) children: Vec<NodeRef>,
    pub(crate) kind: NodeKind,
}
