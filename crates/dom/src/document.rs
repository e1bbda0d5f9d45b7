//! Arena-backed captured document.
//!
//! The ingestion layer populates a `Document` from instrumentation output;
//! the serializer reads it back out. Node handles are arena indices: removal
//! detaches a subtree but keeps its entries, so later queries against stale
//! handles still resolve (the mutation layer, not the arena, tracks
//! liveness).
//!
//! Invariants:
//! - Node 0 is the document root and is never detached.
//! - A node has at most one parent; shadow roots have none (their link to
//!   the tree is the host's `shadow_root` field).
//! - Element tags and attribute names are stored ASCII-lowercase.

use crate::types::{CompatMode, HostSlot, LiveState, NodeData, NodeKind, NodeRef, SheetRef};
use cssom::{CssRule, StyleSheet};

#[derive(Debug)]
pub struct Document {
    nodes: Vec<NodeData>,
    sheets: Vec<StyleSheet>,
}

impl Document {
    pub fn new(compat_mode: CompatMode) -> Self {
        let root = NodeData {
            parent: None,
            children: Vec::new(),
            kind: NodeKind::Document { compat_mode },
        };
        Self {
            nodes: vec![root],
            sheets: Vec::new(),
        }
    }

    pub fn root(&self) -> NodeRef {
        NodeRef(0)
    }

    pub fn compat_mode(&self) -> CompatMode {
        match self.nodes[0].kind {
            NodeKind::Document { compat_mode } => compat_mode,
            _ => unreachable!("node 0 is always the document root"),
        }
    }

    fn push(&mut self, kind: NodeKind) -> NodeRef {
        let index = self.nodes.len() as u32;
        self.nodes.push(NodeData {
            parent: None,
            children: Vec::new(),
            kind,
        });
        NodeRef(index)
    }

    fn data(&self, node: NodeRef) -> &NodeData {
        &self.nodes[node.0 as usize]
    }

    fn data_mut(&mut self, node: NodeRef) -> &mut NodeData {
        &mut self.nodes[node.0 as usize]
    }

    pub fn create_element(&mut self, tag: &str) -> NodeRef {
        self.push(NodeKind::Element {
            tag: tag.to_ascii_lowercase(),
            attributes: Vec::new(),
            sheet: None,
            shadow_root: None,
            live: LiveState::default(),
        })
    }

    pub fn create_text(&mut self, text: &str) -> NodeRef {
        self.push(NodeKind::Text {
            text: text.to_string(),
        })
    }

    pub fn create_comment(&mut self, text: &str) -> NodeRef {
        self.push(NodeKind::Comment {
            text: text.to_string(),
        })
    }

    pub fn create_cdata(&mut self, text: &str) -> NodeRef {
        self.push(NodeKind::Cdata {
            text: text.to_string(),
        })
    }

    pub fn create_doctype(&mut self, name: &str, public_id: &str, system_id: &str) -> NodeRef {
        self.push(NodeKind::DocumentType {
            name: name.to_string(),
            public_id: public_id.to_string(),
            system_id: system_id.to_string(),
        })
    }

    /// Append `child` to `parent`'s child list.
    ///
    /// Panics when `parent` cannot hold children or `child` is already
    /// attached; both are caller bookkeeping errors.
    pub fn append_child(&mut self, parent: NodeRef, child: NodeRef) {
        assert!(
            self.data(child).parent.is_none(),
            "append_child: child is already attached"
        );
        match self.data(parent).kind {
            NodeKind::Document { .. } | NodeKind::Element { .. } | NodeKind::ShadowRoot { .. } => {}
            _ => panic!("append_child: parent cannot have children"),
        }
        self.data_mut(parent).children.push(child);
        self.data_mut(child).parent = Some(parent);
    }

    /// Detach `node` from its parent. The subtree stays in the arena.
    pub fn remove_node(&mut self, node: NodeRef) {
        let Some(parent) = self.data(node).parent else {
            return;
        };
        self.data_mut(parent).children.retain(|c| *c != node);
        self.data_mut(node).parent = None;
    }

    pub fn kind(&self, node: NodeRef) -> &NodeKind {
        &self.data(node).kind
    }

    pub fn parent(&self, node: NodeRef) -> Option<NodeRef> {
        self.data(node).parent
    }

    pub fn children(&self, node: NodeRef) -> &[NodeRef] {
        &self.data(node).children
    }

    pub fn is_element(&self, node: NodeRef) -> bool {
        matches!(self.data(node).kind, NodeKind::Element { .. })
    }

    pub fn tag(&self, node: NodeRef) -> Option<&str> {
        match &self.data(node).kind {
            NodeKind::Element { tag, .. } => Some(tag),
            _ => None,
        }
    }

    pub fn attributes(&self, node: NodeRef) -> &[(String, Option<String>)] {
        match &self.data(node).kind {
            NodeKind::Element { attributes, .. } => attributes,
            _ => &[],
        }
    }

    pub fn attr(&self, node: NodeRef, name: &str) -> Option<&str> {
        self.attributes(node)
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .and_then(|(_, v)| v.as_deref())
    }

    pub fn has_attr(&self, node: NodeRef, name: &str) -> bool {
        self.attributes(node)
            .iter()
            .any(|(k, _)| k.eq_ignore_ascii_case(name))
    }

    pub fn has_class(&self, node: NodeRef, class: &str) -> bool {
        self.attr(node, "class")
            .is_some_and(|list| list.split_whitespace().any(|c| c == class))
    }

    pub fn set_attribute(&mut self, node: NodeRef, name: &str, value: Option<&str>) {
        let NodeKind::Element { attributes, .. } = &mut self.data_mut(node).kind else {
            panic!("set_attribute: node is not an element");
        };
        let name = name.to_ascii_lowercase();
        let value = value.map(str::to_string);
        match attributes.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value,
            None => attributes.push((name, value)),
        }
    }

    fn element_live_mut(&mut self, node: NodeRef) -> &mut LiveState {
        let NodeKind::Element { live, .. } = &mut self.data_mut(node).kind else {
            panic!("live state: node is not an element");
        };
        live
    }

    pub fn live(&self, node: NodeRef) -> Option<&LiveState> {
        match &self.data(node).kind {
            NodeKind::Element { live, .. } => Some(live),
            _ => None,
        }
    }

    pub fn set_scroll(&mut self, node: NodeRef, top: f64, left: f64) {
        let live = self.element_live_mut(node);
        live.scroll_top = top;
        live.scroll_left = left;
    }

    pub fn set_layout_box(&mut self, node: NodeRef, width: f64, height: f64) {
        self.element_live_mut(node).box_size = Some((width, height));
    }

    pub fn set_value(&mut self, node: NodeRef, value: &str) {
        self.element_live_mut(node).value = Some(value.to_string());
    }

    pub fn set_checked(&mut self, node: NodeRef, checked: bool) {
        self.element_live_mut(node).checked = Some(checked);
    }

    /// Attach a shadow root to `host`. Panics if `host` is not an element or
    /// already hosts one.
    pub fn attach_shadow(&mut self, host: NodeRef) -> NodeRef {
        let root = self.push(NodeKind::ShadowRoot {
            host: HostSlot::Element(host),
        });
        let NodeKind::Element { shadow_root, .. } = &mut self.data_mut(host).kind else {
            panic!("attach_shadow: host is not an element");
        };
        assert!(shadow_root.is_none(), "attach_shadow: host already has a shadow root");
        *shadow_root = Some(root);
        root
    }

    /// A shadow root as some engines report it for a detached fragment: no
    /// live host, just a string-typed host-like value.
    pub fn create_detached_shadow(&mut self, label: &str) -> NodeRef {
        self.push(NodeKind::ShadowRoot {
            host: HostSlot::Detached(label.to_string()),
        })
    }

    pub fn shadow_root(&self, node: NodeRef) -> Option<NodeRef> {
        match &self.data(node).kind {
            NodeKind::Element { shadow_root, .. } => *shadow_root,
            _ => None,
        }
    }

    /// Store a captured sheet and attach it to `element` (a `<style>` or
    /// stylesheet `<link>`).
    pub fn attach_sheet(&mut self, element: NodeRef, sheet: StyleSheet) -> SheetRef {
        let index = SheetRef(self.sheets.len() as u32);
        self.sheets.push(sheet);
        let NodeKind::Element { sheet, .. } = &mut self.data_mut(element).kind else {
            panic!("attach_sheet: node is not an element");
        };
        *sheet = Some(index);
        index
    }

    pub fn element_sheet(&self, node: NodeRef) -> Option<SheetRef> {
        match &self.data(node).kind {
            NodeKind::Element { sheet, .. } => *sheet,
            _ => None,
        }
    }

    pub fn sheet(&self, sheet: SheetRef) -> &StyleSheet {
        &self.sheets[sheet.0 as usize]
    }

    pub fn sheet_mut(&mut self, sheet: SheetRef) -> &mut StyleSheet {
        &mut self.sheets[sheet.0 as usize]
    }

    /// Append a rule to a sheet through the CSSOM path.
    pub fn insert_rule(&mut self, sheet: SheetRef, rule: CssRule) {
        self.sheet_mut(sheet).insert_rule(rule);
    }

    /// Append a literal text child to a `<style>` element. When the element
    /// already carries CSSOM-inserted rules the sheet stops accounting for
    /// its text and is marked divergent.
    pub fn append_style_text(&mut self, element: NodeRef, text: &str) -> NodeRef {
        let child = self.create_text(text);
        self.append_child(element, child);
        if let Some(sheet) = self.element_sheet(element)
            && self.sheet(sheet).has_inserted_rules()
        {
            self.sheet_mut(sheet).mark_text_divergent();
        }
        child
    }

    /// Concatenated text children of an element, in tree order.
    pub fn text_content(&self, element: NodeRef) -> String {
        let mut out = String::new();
        for &child in self.children(element) {
            if let NodeKind::Text { text } = &self.data(child).kind {
                out.push_str(text);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cssom::{StyleRule, parse_declarations};

    fn style_rule(selector: &str, body: &str) -> CssRule {
        CssRule::Style(StyleRule {
            selector_text: selector.to_string(),
            declarations: parse_declarations(body),
            css_text: format!("{selector} {{ {body}; }}"),
        })
    }

    #[test]
    fn append_and_remove_detach_but_keep_arena_entries() {
        let mut doc = Document::new(CompatMode::NoQuirks);
        let div = doc.create_element("DIV");
        let text = doc.create_text("hi");
        doc.append_child(doc.root(), div);
        doc.append_child(div, text);

        assert_eq!(doc.tag(div), Some("div"));
        assert_eq!(doc.children(div), &[text]);
        assert_eq!(doc.parent(text), Some(div));

        doc.remove_node(div);
        assert!(doc.children(doc.root()).is_empty());
        assert_eq!(doc.parent(div), None);
        // the subtree is still addressable
        assert_eq!(doc.children(div), &[text]);
    }

    #[test]
    fn attributes_are_case_insensitive_and_replace_in_place() {
        let mut doc = Document::new(CompatMode::NoQuirks);
        let div = doc.create_element("div");
        doc.set_attribute(div, "Class", Some("a b"));
        doc.set_attribute(div, "disabled", None);

        assert_eq!(doc.attr(div, "CLASS"), Some("a b"));
        assert!(doc.has_class(div, "b"));
        assert!(!doc.has_class(div, "c"));
        assert!(doc.has_attr(div, "disabled"));
        assert_eq!(doc.attr(div, "disabled"), None);

        doc.set_attribute(div, "class", Some("c"));
        assert_eq!(doc.attributes(div).len(), 2);
        assert!(doc.has_class(div, "c"));
    }

    #[test]
    fn style_text_append_after_insert_marks_divergence() {
        let mut doc = Document::new(CompatMode::NoQuirks);
        let style = doc.create_element("style");
        doc.append_child(doc.root(), style);

        let mut sheet = StyleSheet::new(None);
        sheet.push_source_rule(style_rule("a", "color: red"));
        let sheet = doc.attach_sheet(style, sheet);

        doc.append_style_text(style, "b { color: blue; }");
        assert!(!doc.sheet(sheet).is_text_divergent());

        doc.insert_rule(sheet, style_rule("c", "color: green"));
        doc.append_style_text(style, "d { color: gold; }");
        assert!(doc.sheet(sheet).is_text_divergent());
    }

    #[test]
    fn text_content_concatenates_text_children() {
        let mut doc = Document::new(CompatMode::NoQuirks);
        let style = doc.create_element("style");
        let a = doc.create_text("a { color: red; }");
        let b = doc.create_text("b { color: blue; }");
        doc.append_child(style, a);
        doc.append_child(style, b);
        assert_eq!(doc.text_content(style), "a { color: red; }b { color: blue; }");
    }
}
