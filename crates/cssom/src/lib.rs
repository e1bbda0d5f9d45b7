pub mod normalize;
pub mod path;
pub mod rules;
pub mod selector;

// Re-exports so other crates can just use `cssom::...` nicely.
pub use normalize::{
    absolutize_css_urls, escape_selector_colons, normalize_style_rule, rebuild_import,
    resolve_url, rule_text, sheet_inserted_rules_text, sheet_rules_text,
};
pub use path::{RulePathError, nested_rule};
pub use rules::{CssRule, Declaration, ImportLayer, ImportRule, RuleOrigin, StyleRule, StyleSheet, parse_declarations};
pub use selector::{Selector, SelectorList};
