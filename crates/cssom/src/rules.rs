//! Captured CSSOM rule model.
//!
//! This is the cross-subsystem shape the capture layer fills in and the
//! serializer reads back out.
//!
//! Invariants:
//! - Rule order inside a sheet or grouping rule mirrors the live rule list.
//! - `StyleRule::declarations` holds the authoritative live property values;
//!   `css_text` is the engine's own serialization and may disagree with them
//!   (see `normalize`).
//! - A sheet's per-rule origins stay parallel to its rule list.

/// A single CSS property: "color: red"
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Declaration {
    pub name: String,
    pub value: String,
}

/// Where a top-level sheet rule came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RuleOrigin {
    /// Parsed from the owner element's literal text content.
    StyleText,
    /// Inserted through the CSSOM rule API after parsing.
    CssomInsert,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StyleRule {
    pub selector_text: String,
    /// Live property values in the order the engine reports them.
    pub declarations: Vec<Declaration>,
    /// The engine-serialized rule text.
    pub css_text: String,
}

/// Layer clause of an `@import` rule.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ImportLayer {
    /// A bare `layer` keyword.
    Anonymous,
    Named(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportRule {
    pub href: String,
    pub media: Vec<String>,
    pub layer: Option<ImportLayer>,
    pub supports: Option<String>,
    /// Captured text; not trusted for re-emission (see `rebuild_import`).
    pub css_text: String,
}

/// Captured CSS rule, one variant per CSSOM rule kind we replay.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CssRule {
    Style(StyleRule),
    Media {
        condition: String,
        rules: Vec<CssRule>,
    },
    Supports {
        condition: String,
        rules: Vec<CssRule>,
    },
    /// An `@layer` block. `name: None` is an anonymous layer.
    Layer {
        name: Option<String>,
        rules: Vec<CssRule>,
    },
    /// An `@layer a, b;` statement without a block.
    LayerStatement { names: Vec<String> },
    Import(ImportRule),
    FontFace { css_text: String },
    Keyframes { css_text: String },
}

impl CssRule {
    /// The ordered sub-rule list for grouping rules, `None` for leaf rules.
    pub fn nested_rules(&self) -> Option<&[CssRule]> {
        match self {
            CssRule::Media { rules, .. }
            | CssRule::Supports { rules, .. }
            | CssRule::Layer { rules, .. } => Some(rules),
            CssRule::Style(_)
            | CssRule::LayerStatement { .. }
            | CssRule::Import(_)
            | CssRule::FontFace { .. }
            | CssRule::Keyframes { .. } => None,
        }
    }
}

/// A captured stylesheet: the live rule list plus enough provenance to
/// reconstruct the effective text of its owner element.
#[derive(Clone, Debug, Default)]
pub struct StyleSheet {
    pub href: Option<String>,
    rules: Vec<CssRule>,
    origins: Vec<RuleOrigin>,
    text_divergent: bool,
}

impl StyleSheet {
    pub fn new(href: Option<String>) -> Self {
        Self {
            href,
            rules: Vec::new(),
            origins: Vec::new(),
            text_divergent: false,
        }
    }

    pub fn rules(&self) -> &[CssRule] {
        &self.rules
    }

    pub fn origin(&self, index: usize) -> Option<RuleOrigin> {
        self.origins.get(index).copied()
    }

    /// Append a rule parsed from the owner element's literal text.
    pub fn push_source_rule(&mut self, rule: CssRule) {
        self.rules.push(rule);
        self.origins.push(RuleOrigin::StyleText);
    }

    /// Append a rule inserted through the CSSOM API.
    pub fn insert_rule(&mut self, rule: CssRule) {
        self.rules.push(rule);
        self.origins.push(RuleOrigin::CssomInsert);
    }

    pub fn has_inserted_rules(&self) -> bool {
        self.origins.contains(&RuleOrigin::CssomInsert)
    }

    /// True once literal text children stopped being reflected in the rule
    /// list (text appended after CSSOM insertions).
    pub fn is_text_divergent(&self) -> bool {
        self.text_divergent
    }

    pub fn mark_text_divergent(&mut self) {
        self.text_divergent = true;
    }

    /// CSSOM-inserted rules in rule-list order.
    pub fn inserted_rules(&self) -> impl Iterator<Item = &CssRule> {
        self.rules
            .iter()
            .zip(self.origins.iter())
            .filter(|(_, origin)| **origin == RuleOrigin::CssomInsert)
            .map(|(rule, _)| rule)
    }
}

/// input: "color: red; font-size: 12px;"
/// output: vec![Declaration { name: "color", value: "red" }, ...]
pub fn parse_declarations(input: &str) -> Vec<Declaration> {
    input
        .split(';')
        .filter_map(|pair| {
            let (n, v) = pair.split_once(':')?;
            let name = n.trim().to_ascii_lowercase();
            if name.is_empty() {
                return None;
            }
            let value = v.trim().to_string();
            Some(Declaration { name, value })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn style(selector: &str, body: &str) -> CssRule {
        CssRule::Style(StyleRule {
            selector_text: selector.to_string(),
            declarations: parse_declarations(body),
            css_text: format!("{selector} {{ {body} }}"),
        })
    }

    #[test]
    fn parse_declarations_trims_and_lowercases_names() {
        let decls = parse_declarations(" Color : red ; font-size: 12px;");
        assert_eq!(decls.len(), 2);
        assert_eq!(decls[0].name, "color");
        assert_eq!(decls[0].value, "red");
        assert_eq!(decls[1].name, "font-size");
    }

    #[test]
    fn parse_declarations_skips_nameless_pairs() {
        assert!(parse_declarations(" : red; ;").is_empty());
    }

    #[test]
    fn nested_rules_only_on_grouping_kinds() {
        let leaf = style("a", "color: red");
        assert!(leaf.nested_rules().is_none());

        let media = CssRule::Media {
            condition: "(min-width: 100px)".to_string(),
            rules: vec![style("a", "color: red")],
        };
        assert_eq!(media.nested_rules().map(<[CssRule]>::len), Some(1));

        let statement = CssRule::LayerStatement {
            names: vec!["base".to_string()],
        };
        assert!(statement.nested_rules().is_none());
    }

    #[test]
    fn sheet_tracks_rule_origins() {
        let mut sheet = StyleSheet::new(None);
        sheet.push_source_rule(style("a", "color: red"));
        sheet.insert_rule(style("b", "color: blue"));
        sheet.push_source_rule(style("c", "color: green"));

        assert_eq!(sheet.origin(0), Some(RuleOrigin::StyleText));
        assert_eq!(sheet.origin(1), Some(RuleOrigin::CssomInsert));
        assert!(sheet.has_inserted_rules());
        assert_eq!(sheet.inserted_rules().count(), 1);
        assert!(!sheet.is_text_divergent());
    }
}
