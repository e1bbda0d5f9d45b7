//! Recursive document serialization.
//!
//! Contract:
//! - Every visited node gets its id from the node mirror, so a re-snapshot
//!   reuses ids instead of churning identity.
//! - Redaction runs before descent: hide-and-block emits a zero-visibility
//!   placeholder, block-only a dimension placeholder, neither serializes
//!   normally. Hide without block is not redaction.
//! - Live state (control values, scroll offsets, stylesheet text) is
//!   captured from the document, not from the markup.
//! - The serializer itself is stateless; everything long-lived sits in the
//!   mirrors, which one `serialize` call holds exclusively.

use crate::mirror::{MirrorId, NodeMirror, StyleSheetMirror};
use crate::types::{
    Attributes, CSS_SPLIT_MARKER, CSS_TEXT_ATTR, RR_DISPLAY, RR_HEIGHT, RR_SCROLL_LEFT,
    RR_SCROLL_TOP, RR_WIDTH, SerializedNode, SerializedNodeWithId,
};
use cssom::{SelectorList, absolutize_css_urls, resolve_url, sheet_inserted_rules_text, sheet_rules_text};
use dom::{Document, NodeKind, NodeRef};
use std::collections::BTreeMap;

pub type MaskTextFn = dyn Fn(&str) -> String;
pub type MaskInputFn = dyn Fn(&str) -> String;

/// Categories of document noise elided entirely from snapshots.
#[derive(Clone, Copy, Debug, Default)]
pub struct SlimDomOptions {
    pub script: bool,
    pub comment: bool,
    pub head_whitespace: bool,
    pub head_meta: bool,
}

/// Redaction policy plus serializer toggles for one snapshot pass.
pub struct SnapshotOptions {
    /// Elements carrying this class have their subtree blocked.
    pub block_class: String,
    pub block_selector: Option<SelectorList>,
    /// Blocked elements also matching this serialize as a zero-visibility
    /// placeholder instead of a dimension placeholder.
    pub hide_selector: Option<SelectorList>,
    pub mask_text_class: String,
    pub mask_text_selector: Option<SelectorList>,
    pub mask_text_fn: Option<Box<MaskTextFn>>,
    pub mask_input_fn: Option<Box<MaskInputFn>>,
    /// Inline `<link rel="stylesheet">` sheets as `_cssText`.
    pub inline_stylesheet: bool,
    /// Do not descend into element children.
    pub skip_child: bool,
    /// Serialize shadow roots as synthetic children; independent of
    /// `skip_child`.
    pub serialize_shadow: bool,
    pub slim_dom: SlimDomOptions,
    pub base_url: Option<String>,
}

impl Default for SnapshotOptions {
    fn default() -> Self {
        Self {
            block_class: "rr-block".to_string(),
            block_selector: None,
            hide_selector: None,
            mask_text_class: "rr-mask".to_string(),
            mask_text_selector: None,
            mask_text_fn: None,
            mask_input_fn: None,
            inline_stylesheet: true,
            skip_child: false,
            serialize_shadow: true,
            slim_dom: SlimDomOptions::default(),
            base_url: None,
        }
    }
}

/// A full-document snapshot plus the stylesheet table the transport layer
/// persists alongside it.
#[derive(Clone, Debug, PartialEq)]
pub struct SnapshotResult {
    pub root: SerializedNodeWithId,
    /// stylesheet mirror id → reconstructed CSS text.
    pub stylesheet_texts: BTreeMap<MirrorId, String>,
}

/// Serialize one node (and its subtree, per options). `None` means the node
/// was elided by slim-DOM policy and does not appear in its parent's child
/// list.
pub fn serialize_node_with_id(
    doc: &Document,
    node: NodeRef,
    mirror: &mut NodeMirror,
    sheet_mirror: &mut StyleSheetMirror,
    options: &SnapshotOptions,
) -> Option<SerializedNodeWithId> {
    Serializer::new(doc, mirror, sheet_mirror, options).serialize(node)
}

/// Snapshot the whole document, collecting the stylesheet text table as a
/// side product.
pub fn snapshot_document(
    doc: &Document,
    mirror: &mut NodeMirror,
    sheet_mirror: &mut StyleSheetMirror,
    options: &SnapshotOptions,
) -> Option<SnapshotResult> {
    let mut serializer = Serializer::new(doc, mirror, sheet_mirror, options);
    let root = serializer.serialize(doc.root())?;
    Some(SnapshotResult {
        root,
        stylesheet_texts: serializer.stylesheet_texts,
    })
}

struct Serializer<'a> {
    doc: &'a Document,
    mirror: &'a mut NodeMirror,
    sheet_mirror: &'a mut StyleSheetMirror,
    options: &'a SnapshotOptions,
    stylesheet_texts: BTreeMap<MirrorId, String>,
}

impl<'a> Serializer<'a> {
    fn new(
        doc: &'a Document,
        mirror: &'a mut NodeMirror,
        sheet_mirror: &'a mut StyleSheetMirror,
        options: &'a SnapshotOptions,
    ) -> Self {
        Self {
            doc,
            mirror,
            sheet_mirror,
            options,
            stylesheet_texts: BTreeMap::new(),
        }
    }

    fn serialize(&mut self, node: NodeRef) -> Option<SerializedNodeWithId> {
        match self.doc.kind(node) {
            NodeKind::Document { compat_mode } => {
                let id = self.mirror.add(node);
                let children = self.serialize_children(node);
                Some(with_id(
                    id,
                    SerializedNode::Document {
                        compat_mode: compat_mode.as_str().to_string(),
                        children,
                    },
                ))
            }
            // A shadow root serializes as a document-variant child of its
            // host; a document node under an element is unambiguous to the
            // player.
            NodeKind::ShadowRoot { .. } => {
                let id = self.mirror.add(node);
                let children = self.serialize_children(node);
                Some(with_id(
                    id,
                    SerializedNode::Document {
                        compat_mode: self.doc.compat_mode().as_str().to_string(),
                        children,
                    },
                ))
            }
            NodeKind::DocumentType {
                name,
                public_id,
                system_id,
            } => {
                let id = self.mirror.add(node);
                Some(with_id(
                    id,
                    SerializedNode::DocumentType {
                        name: name.clone(),
                        public_id: public_id.clone(),
                        system_id: system_id.clone(),
                    },
                ))
            }
            NodeKind::Text { text } => self.serialize_text(node, text),
            NodeKind::Comment { text } => {
                if self.options.slim_dom.comment {
                    log::trace!(target: "snapshot.serialize", "slim-dom elided comment");
                    return None;
                }
                let id = self.mirror.add(node);
                Some(with_id(id, SerializedNode::Comment { text: text.clone() }))
            }
            NodeKind::Cdata { text } => {
                let id = self.mirror.add(node);
                Some(with_id(id, SerializedNode::Cdata { text: text.clone() }))
            }
            NodeKind::Element { tag, .. } => self.serialize_element(node, tag),
        }
    }

    fn serialize_children(&mut self, node: NodeRef) -> Vec<SerializedNodeWithId> {
        let mut out = Vec::new();
        for &child in self.doc.children(node) {
            if let Some(serialized) = self.serialize(child) {
                out.push(serialized);
            }
        }
        out
    }

    fn serialize_text(&mut self, node: NodeRef, text: &str) -> Option<SerializedNodeWithId> {
        let parent = self.doc.parent(node);
        let parent_tag = parent.and_then(|p| self.doc.tag(p));
        if self.options.slim_dom.head_whitespace
            && parent_tag == Some("head")
            && text.trim().is_empty()
        {
            log::trace!(target: "snapshot.serialize", "slim-dom elided head whitespace");
            return None;
        }
        let id = self.mirror.add(node);
        let text = if parent_tag == Some("style") {
            match &self.options.base_url {
                Some(base) => absolutize_css_urls(text, base),
                None => text.to_string(),
            }
        } else if self.needs_masking(parent) {
            self.mask_text(text)
        } else {
            text.to_string()
        };
        Some(with_id(id, SerializedNode::Text { text }))
    }

    /// Text is masked when any ancestor element carries the mask class or
    /// matches the mask selector.
    fn needs_masking(&self, start: Option<NodeRef>) -> bool {
        let mut current = start;
        while let Some(node) = current {
            if self.doc.is_element(node) {
                if self.doc.has_class(node, &self.options.mask_text_class) {
                    return true;
                }
                if let Some(selector) = &self.options.mask_text_selector
                    && dom::matches_list(self.doc, node, selector)
                {
                    return true;
                }
            }
            current = self.doc.parent(node);
        }
        false
    }

    fn mask_text(&self, text: &str) -> String {
        match &self.options.mask_text_fn {
            Some(mask) => mask(text),
            None => text
                .chars()
                .map(|c| if c.is_whitespace() { c } else { '*' })
                .collect(),
        }
    }

    fn serialize_element(&mut self, node: NodeRef, tag: &str) -> Option<SerializedNodeWithId> {
        if self.slim_elided(node, tag) {
            log::trace!(target: "snapshot.serialize", "slim-dom elided <{tag}>");
            return None;
        }
        let id = self.mirror.add(node);
        let blocked = self.doc.has_class(node, &self.options.block_class)
            || self
                .options
                .block_selector
                .as_ref()
                .is_some_and(|s| dom::matches_list(self.doc, node, s));
        let hidden = self
            .options
            .hide_selector
            .as_ref()
            .is_some_and(|s| dom::matches_list(self.doc, node, s));

        let mut attributes = self.base_attributes(node, tag);

        if blocked && hidden {
            attributes.insert(RR_DISPLAY.to_string(), "none".to_string());
            return Some(element_with_id(id, tag, attributes, Vec::new()));
        }
        if blocked {
            if let Some((width, height)) = self.doc.live(node).and_then(|l| l.box_size) {
                attributes.insert(RR_WIDTH.to_string(), format_px(width));
                attributes.insert(RR_HEIGHT.to_string(), format_px(height));
            }
            return Some(element_with_id(id, tag, attributes, Vec::new()));
        }

        if let Some(live) = self.doc.live(node) {
            if live.scroll_top != 0.0 {
                attributes.insert(RR_SCROLL_TOP.to_string(), format_number(live.scroll_top));
            }
            if live.scroll_left != 0.0 {
                attributes.insert(RR_SCROLL_LEFT.to_string(), format_number(live.scroll_left));
            }
        }

        let form_control = matches!(tag, "input" | "textarea" | "select" | "option");
        if form_control {
            self.capture_form_state(node, tag, &mut attributes);
        }

        self.inline_sheet(node, tag, &mut attributes);

        // Form controls never serialize children: their textual content is
        // redundant with the captured value.
        let mut children = if form_control || self.options.skip_child {
            Vec::new()
        } else {
            self.serialize_children(node)
        };
        if self.options.serialize_shadow
            && let Some(shadow_root) = self.doc.shadow_root(node)
            && let Some(serialized) = self.serialize(shadow_root)
        {
            children.push(serialized);
        }
        Some(element_with_id(id, tag, attributes, children))
    }

    fn slim_elided(&self, node: NodeRef, tag: &str) -> bool {
        let slim = &self.options.slim_dom;
        match tag {
            "script" | "noscript" => slim.script,
            "meta" => slim.head_meta && self.is_head_meta_noise(node),
            _ => false,
        }
    }

    fn is_head_meta_noise(&self, node: NodeRef) -> bool {
        if let Some(name) = self.doc.attr(node, "name") {
            let name = name.to_ascii_lowercase();
            if matches!(
                name.as_str(),
                "viewport" | "robots" | "keywords" | "description" | "generator" | "theme-color"
            ) {
                return true;
            }
        }
        if let Some(property) = self.doc.attr(node, "property") {
            let property = property.to_ascii_lowercase();
            if property.starts_with("og:")
                || property.starts_with("twitter:")
                || property.starts_with("fb:")
            {
                return true;
            }
        }
        false
    }

    fn base_attributes(&self, node: NodeRef, tag: &str) -> Attributes {
        let mut out = Attributes::new();
        for (name, value) in self.doc.attributes(node) {
            let value = value.as_deref().unwrap_or("");
            out.insert(name.clone(), self.transform_attribute(tag, name, value));
        }
        out
    }

    fn transform_attribute(&self, tag: &str, name: &str, value: &str) -> String {
        let Some(base) = &self.options.base_url else {
            return value.to_string();
        };
        let is_url_attr = match name {
            "src" | "href" | "background" => !value.is_empty() && !value.starts_with('#'),
            "data" => tag == "object" && !value.is_empty(),
            _ => false,
        };
        if is_url_attr {
            resolve_url(base, value).unwrap_or_else(|| value.to_string())
        } else if name == "style" {
            absolutize_css_urls(value, base)
        } else {
            value.to_string()
        }
    }

    fn capture_form_state(&self, node: NodeRef, tag: &str, attributes: &mut Attributes) {
        let live = self.doc.live(node);
        let input_type = self.doc.attr(node, "type").map(str::to_ascii_lowercase);

        let value = live.and_then(|l| l.value.clone()).or_else(|| match tag {
            "textarea" => {
                let text = self.doc.text_content(node);
                (!text.is_empty()).then_some(text)
            }
            _ => self.doc.attr(node, "value").map(str::to_string),
        });
        if let Some(value) = value {
            let masked = if input_type.as_deref() == Some("password") {
                "*".repeat(value.chars().count())
            } else if let Some(mask) = &self.options.mask_input_fn {
                mask(&value)
            } else {
                value
            };
            attributes.insert("value".to_string(), masked);
        }

        if tag == "input" && matches!(input_type.as_deref(), Some("checkbox" | "radio")) {
            let checked = live
                .and_then(|l| l.checked)
                .unwrap_or_else(|| self.doc.has_attr(node, "checked"));
            if checked {
                attributes.insert("checked".to_string(), "true".to_string());
            }
        }
    }

    /// Reconstruct the effective stylesheet text from the live rule list and
    /// register the sheet in the stylesheet mirror.
    fn inline_sheet(&mut self, node: NodeRef, tag: &str, attributes: &mut Attributes) {
        let Some(sheet_ref) = self.doc.element_sheet(node) else {
            return;
        };
        let is_style = tag == "style";
        let is_stylesheet_link = tag == "link"
            && self.doc.attr(node, "rel").is_some_and(|rel| {
                rel.split_whitespace()
                    .any(|t| t.eq_ignore_ascii_case("stylesheet"))
            });
        if !is_style && !(is_stylesheet_link && self.options.inline_stylesheet) {
            return;
        }
        let sheet_id = self.sheet_mirror.add(sheet_ref);
        let sheet = self.doc.sheet(sheet_ref);
        let base = sheet.href.as_deref().or(self.options.base_url.as_deref());
        let text = if is_style && sheet.is_text_divergent() {
            // The rule list stopped accounting for the element's literal
            // text; keep the two provenances apart for the player.
            let literal = self.doc.text_content(node);
            let literal = match base {
                Some(base) => absolutize_css_urls(&literal, base),
                None => literal,
            };
            format!(
                "{}{CSS_SPLIT_MARKER}{literal}",
                sheet_inserted_rules_text(sheet, base)
            )
        } else {
            sheet_rules_text(sheet, base)
        };
        if is_stylesheet_link {
            attributes.remove("rel");
            attributes.remove("href");
        }
        attributes.insert(CSS_TEXT_ATTR.to_string(), text.clone());
        self.stylesheet_texts.insert(sheet_id, text);
    }
}

fn with_id(id: MirrorId, node: SerializedNode) -> SerializedNodeWithId {
    SerializedNodeWithId { id, node }
}

fn element_with_id(
    id: MirrorId,
    tag: &str,
    attributes: Attributes,
    children: Vec<SerializedNodeWithId>,
) -> SerializedNodeWithId {
    with_id(
        id,
        SerializedNode::Element {
            tag: tag.to_string(),
            attributes,
            children,
        },
    )
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

fn format_px(value: f64) -> String {
    format!("{}px", format_number(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{RR_SCROLL_LEFT, RR_SCROLL_TOP};
    use dom::CompatMode;

    fn serialize(
        doc: &Document,
        node: NodeRef,
        options: &SnapshotOptions,
    ) -> Option<SerializedNodeWithId> {
        let mut mirror = NodeMirror::new();
        let mut sheet_mirror = StyleSheetMirror::new();
        serialize_node_with_id(doc, node, &mut mirror, &mut sheet_mirror, options)
    }

    fn attrs(node: &SerializedNodeWithId) -> &Attributes {
        match &node.node {
            SerializedNode::Element { attributes, .. } => attributes,
            other => panic!("expected element, got {other:?}"),
        }
    }

    #[test]
    fn scroll_offsets_synthesize_rr_attributes() {
        let mut doc = Document::new(CompatMode::NoQuirks);
        let div = doc.create_element("div");
        doc.append_child(doc.root(), div);
        doc.set_scroll(div, 120.0, 0.0);

        let serialized = serialize(&doc, div, &SnapshotOptions::default()).unwrap();
        assert_eq!(attrs(&serialized).get(RR_SCROLL_TOP).map(String::as_str), Some("120"));
        assert!(!attrs(&serialized).contains_key(RR_SCROLL_LEFT));
    }

    #[test]
    fn form_controls_capture_live_value_and_drop_children() {
        let mut doc = Document::new(CompatMode::NoQuirks);
        let area = doc.create_element("textarea");
        let default_text = doc.create_text("default");
        doc.append_child(area, default_text);
        doc.set_value(area, "edited");

        let serialized = serialize(&doc, area, &SnapshotOptions::default()).unwrap();
        assert_eq!(attrs(&serialized).get("value").map(String::as_str), Some("edited"));
        assert!(serialized.node.children().is_empty());
    }

    #[test]
    fn markup_value_is_the_fallback_and_passwords_are_masked() {
        let mut doc = Document::new(CompatMode::NoQuirks);
        let input = doc.create_element("input");
        doc.set_attribute(input, "type", Some("password"));
        doc.set_attribute(input, "value", Some("hunter2"));

        let serialized = serialize(&doc, input, &SnapshotOptions::default()).unwrap();
        assert_eq!(attrs(&serialized).get("value").map(String::as_str), Some("*******"));
    }

    #[test]
    fn checkbox_checked_state_prefers_live_over_markup() {
        let mut doc = Document::new(CompatMode::NoQuirks);
        let input = doc.create_element("input");
        doc.set_attribute(input, "type", Some("checkbox"));
        doc.set_attribute(input, "checked", None);
        doc.set_checked(input, false);

        let serialized = serialize(&doc, input, &SnapshotOptions::default()).unwrap();
        assert!(!attrs(&serialized).contains_key("checked"));
    }

    #[test]
    fn slim_dom_elides_scripts_and_meta_noise() {
        let mut doc = Document::new(CompatMode::NoQuirks);
        let head = doc.create_element("head");
        doc.append_child(doc.root(), head);
        let script = doc.create_element("script");
        doc.append_child(head, script);
        let meta = doc.create_element("meta");
        doc.set_attribute(meta, "name", Some("viewport"));
        doc.append_child(head, meta);
        let charset = doc.create_element("meta");
        doc.set_attribute(charset, "charset", Some("utf-8"));
        doc.append_child(head, charset);

        let options = SnapshotOptions {
            slim_dom: SlimDomOptions {
                script: true,
                head_meta: true,
                ..SlimDomOptions::default()
            },
            ..SnapshotOptions::default()
        };
        let serialized = serialize(&doc, head, &options).unwrap();
        let children = serialized.node.children();
        assert_eq!(children.len(), 1);
        assert_eq!(attrs(&children[0]).get("charset").map(String::as_str), Some("utf-8"));
    }

    #[test]
    fn masked_text_respects_ancestor_selectors() {
        let mut doc = Document::new(CompatMode::NoQuirks);
        let outer = doc.create_element("div");
        doc.set_attribute(outer, "class", Some("rr-mask"));
        doc.append_child(doc.root(), outer);
        let inner = doc.create_element("span");
        doc.append_child(outer, inner);
        let text = doc.create_text("secret words");
        doc.append_child(inner, text);

        let serialized = serialize(&doc, outer, &SnapshotOptions::default()).unwrap();
        let span = &serialized.node.children()[0];
        let SerializedNode::Text { text } = &span.node.children()[0].node else {
            panic!("expected text child");
        };
        assert_eq!(text, "****** *****");
    }

    #[test]
    fn attribute_urls_resolve_against_base() {
        let mut doc = Document::new(CompatMode::NoQuirks);
        let img = doc.create_element("img");
        doc.set_attribute(img, "src", Some("../a.jpg"));
        doc.set_attribute(img, "alt", Some("a"));

        let options = SnapshotOptions {
            base_url: Some("http://localhost/css/style.css".to_string()),
            ..SnapshotOptions::default()
        };
        let serialized = serialize(&doc, img, &options).unwrap();
        assert_eq!(
            attrs(&serialized).get("src").map(String::as_str),
            Some("http://localhost/a.jpg")
        );
        assert_eq!(attrs(&serialized).get("alt").map(String::as_str), Some("a"));
    }
}
