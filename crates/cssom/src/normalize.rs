//! Text repairs for captured CSS.
//!
//! Engine-serialized rule text is not replay-safe as-is: relative `url(...)`
//! targets break once the snapshot is rendered from another origin, and a few
//! engines emit outright invalid text for specific rule shapes. Each repair
//! here is a pure text transform with the quirk it covers named at the
//! function, so the list stays auditable as engines evolve.

use crate::rules::{CssRule, Declaration, ImportLayer, ImportRule, StyleRule, StyleSheet, parse_declarations};
use memchr::{memchr, memchr2_iter};
use url::Url;

/// Resolve `target` against `base`, returning `None` when either side does
/// not parse as a URL.
pub fn resolve_url(base: &str, target: &str) -> Option<String> {
    let base = Url::parse(base).ok()?;
    base.join(target).ok().map(|u| u.to_string())
}

/// Rewrite relative `url(...)` targets in `css` to fully-qualified URLs
/// resolved against `base`. Data URLs, fragment-only targets,
/// protocol-relative targets, and already-absolute targets pass through
/// byte-for-byte; quoting style is preserved.
pub fn absolutize_css_urls(css: &str, base: &str) -> String {
    let bytes = css.as_bytes();
    let mut out = String::with_capacity(css.len());
    let mut last = 0usize;
    for pos in memchr2_iter(b'u', b'U', bytes) {
        if pos < last {
            continue;
        }
        if pos + 4 > bytes.len() || !bytes[pos..pos + 4].eq_ignore_ascii_case(b"url(") {
            continue;
        }
        if pos > 0 {
            let prev = bytes[pos - 1];
            // part of a longer identifier, e.g. a hypothetical `-x-url(`
            if prev.is_ascii_alphanumeric() || prev == b'-' || prev == b'_' {
                continue;
            }
        }
        let Some(token) = parse_url_token(css, pos + 4) else {
            continue;
        };
        out.push_str(&css[last..pos]);
        out.push_str("url(");
        if let Some(q) = token.quote {
            out.push(q);
        }
        if should_rewrite(token.target) {
            match resolve_url(base, token.target) {
                Some(resolved) => out.push_str(&resolved),
                None => {
                    log::debug!(
                        target: "css.normalize",
                        "unresolvable url target {:?} against base {:?}",
                        token.target,
                        base
                    );
                    out.push_str(token.target);
                }
            }
        } else {
            out.push_str(token.target);
        }
        if let Some(q) = token.quote {
            out.push(q);
        }
        out.push(')');
        last = token.end;
    }
    if last == 0 {
        return css.to_string();
    }
    out.push_str(&css[last..]);
    out
}

struct UrlToken<'a> {
    /// Byte offset just past the closing `)`.
    end: usize,
    quote: Option<char>,
    target: &'a str,
}

fn parse_url_token(css: &str, start: usize) -> Option<UrlToken<'_>> {
    let bytes = css.as_bytes();
    let (quote, target_start) = match bytes.get(start) {
        Some(&b'\'') => (Some('\''), start + 1),
        Some(&b'"') => (Some('"'), start + 1),
        Some(_) => (None, start),
        None => return None,
    };
    match quote {
        Some(q) => {
            let rel = memchr(q as u8, &bytes[target_start..])?;
            let target_end = target_start + rel;
            let close = target_end + 1;
            if bytes.get(close) != Some(&b')') {
                return None;
            }
            Some(UrlToken {
                end: close + 1,
                quote,
                target: &css[target_start..target_end],
            })
        }
        None => {
            let rel = memchr(b')', &bytes[target_start..])?;
            let target_end = target_start + rel;
            Some(UrlToken {
                end: target_end + 1,
                quote: None,
                target: &css[target_start..target_end],
            })
        }
    }
}

fn should_rewrite(target: &str) -> bool {
    if target.is_empty() || target.starts_with('#') || target.starts_with("//") {
        return false;
    }
    if target.len() >= 5 && target[..5].eq_ignore_ascii_case("data:") {
        return false;
    }
    // already absolute
    Url::parse(target).is_err()
}

/// Reconstruct an `@import` statement from its structured fields.
///
/// The captured text is never trusted here: one engine leaves a literal `"`
/// inside the href unescaped, which breaks re-parsing. Clause order is
/// layer, then supports, then the media list.
pub fn rebuild_import(rule: &ImportRule) -> String {
    let mut out = String::from("@import url(\"");
    for ch in rule.href.chars() {
        if ch == '"' || ch == '\\' {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push_str("\")");
    match &rule.layer {
        Some(ImportLayer::Anonymous) => out.push_str(" layer"),
        Some(ImportLayer::Named(name)) => {
            out.push_str(" layer(");
            out.push_str(name);
            out.push(')');
        }
        None => {}
    }
    if let Some(supports) = &rule.supports {
        out.push_str(" supports(");
        out.push_str(supports);
        out.push(')');
    }
    if !rule.media.is_empty() {
        out.push(' ');
        out.push_str(&rule.media.join(", "));
    }
    out.push(';');
    out
}

/// Escape a bare `:` between `[` and `]`.
///
/// One engine serializes attribute selectors like `[data-foo:other]` without
/// escaping the colon, which is invalid when replayed. Colons that are
/// already escaped, inside quoted strings, or outside brackets (pseudo
/// classes) are untouched.
pub fn escape_selector_colons(css: &str) -> String {
    let mut out = String::with_capacity(css.len());
    let mut in_brackets = false;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for ch in css.chars() {
        if escaped {
            out.push(ch);
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            '\'' | '"' => match quote {
                Some(open) if open == ch => quote = None,
                None => quote = Some(ch),
                Some(_) => {}
            },
            '[' if quote.is_none() => in_brackets = true,
            ']' if quote.is_none() => in_brackets = false,
            ':' if in_brackets && quote.is_none() => out.push('\\'),
            _ => {}
        }
        out.push(ch);
    }
    out
}

const GRID_TEMPLATE_PROPS: [&str; 3] = [
    "grid-template-areas",
    "grid-template-rows",
    "grid-template-columns",
];

fn is_grid_template_prop(name: &str) -> bool {
    GRID_TEMPLATE_PROPS.contains(&name)
}

/// Repair the grid-template longhand interleaving bug.
///
/// One engine serializes the `grid-template-areas`/`-rows`/`-columns`
/// longhands in the wrong positions (with wrong values) when the
/// `grid-template` shorthand was used. Detection compares the serialized
/// declaration block against the live declaration list; affected rules are
/// re-emitted with the three longhands removed from their serialized
/// positions and appended last, in areas/rows/columns order, with the live
/// values. Unaffected rules come back unchanged.
pub fn normalize_style_rule(rule: &StyleRule) -> String {
    let Some((selector, body)) = split_rule_body(&rule.css_text) else {
        return rule.css_text.clone();
    };
    let parsed = parse_declarations(body);
    if !grid_template_misordered(&parsed, &rule.declarations) {
        return rule.css_text.clone();
    }
    log::debug!(
        target: "css.normalize",
        "reordering grid-template longhands for {}",
        rule.selector_text
    );
    let mut decls: Vec<Declaration> = parsed
        .into_iter()
        .filter(|d| !is_grid_template_prop(&d.name))
        .collect();
    for prop in GRID_TEMPLATE_PROPS {
        if let Some(live) = rule.declarations.iter().find(|d| d.name == prop) {
            decls.push(live.clone());
        }
    }
    let body = decls
        .iter()
        .map(|d| format!("{}: {};", d.name, d.value))
        .collect::<Vec<_>>()
        .join(" ");
    format!("{} {{ {} }}", selector.trim(), body)
}

fn split_rule_body(css_text: &str) -> Option<(&str, &str)> {
    let open = css_text.find('{')?;
    let close = css_text.rfind('}')?;
    (close > open).then(|| (&css_text[..open], &css_text[open + 1..close]))
}

fn grid_template_misordered(parsed: &[Declaration], live: &[Declaration]) -> bool {
    let mut last_rank = None;
    for d in parsed {
        let Some(rank) = GRID_TEMPLATE_PROPS.iter().position(|p| *p == d.name) else {
            continue;
        };
        if let Some(prev) = last_rank
            && rank < prev
        {
            return true;
        }
        last_rank = Some(rank);
        match live.iter().find(|l| l.name == d.name) {
            Some(l) if l.value == d.value => {}
            _ => return true,
        }
    }
    // the serialization dropped a longhand the live style still holds
    live.iter()
        .any(|l| is_grid_template_prop(&l.name) && !parsed.iter().any(|d| d.name == l.name))
}

/// Normalized, replay-safe text for one rule. Imports are rebuilt from
/// structured fields, style rules get the grid repair, grouping rules
/// recurse and re-wrap; the result is colon-escaped and, when `base` is
/// given, URL-absolutized.
pub fn rule_text(rule: &CssRule, base: Option<&str>) -> String {
    let raw = raw_rule_text(rule);
    let escaped = escape_selector_colons(&raw);
    match base {
        Some(base) => absolutize_css_urls(&escaped, base),
        None => escaped,
    }
}

fn raw_rule_text(rule: &CssRule) -> String {
    match rule {
        CssRule::Style(r) => normalize_style_rule(r),
        CssRule::Import(r) => rebuild_import(r),
        CssRule::Media { condition, rules } => group_text("@media", condition, rules),
        CssRule::Supports { condition, rules } => group_text("@supports", condition, rules),
        CssRule::Layer { name, rules } => {
            let children = children_text(rules);
            match name {
                Some(name) => format!("@layer {name} {{ {children} }}"),
                None => format!("@layer {{ {children} }}"),
            }
        }
        CssRule::LayerStatement { names } => format!("@layer {};", names.join(", ")),
        CssRule::FontFace { css_text } | CssRule::Keyframes { css_text } => css_text.clone(),
    }
}

fn children_text(rules: &[CssRule]) -> String {
    rules.iter().map(raw_rule_text).collect::<Vec<_>>().join(" ")
}

fn group_text(at_keyword: &str, condition: &str, rules: &[CssRule]) -> String {
    format!("{at_keyword} {condition} {{ {} }}", children_text(rules))
}

/// Every live rule's normalized text, concatenated in rule order.
pub fn sheet_rules_text(sheet: &StyleSheet, base: Option<&str>) -> String {
    sheet.rules().iter().map(|r| rule_text(r, base)).collect()
}

/// Only the CSSOM-inserted rules, concatenated in rule-list order.
pub fn sheet_inserted_rules_text(sheet: &StyleSheet, base: Option<&str>) -> String {
    sheet.inserted_rules().map(|r| rule_text(r, base)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "http://localhost/css/style.css";

    #[test]
    fn absolutize_resolves_relative_targets() {
        assert_eq!(
            absolutize_css_urls("a { background: url(a.jpg); }", BASE),
            "a { background: url(http://localhost/css/a.jpg); }"
        );
        assert_eq!(
            absolutize_css_urls("a { background: url(./a.jpg); }", BASE),
            "a { background: url(http://localhost/css/a.jpg); }"
        );
        assert_eq!(
            absolutize_css_urls("a { background: url(../a.jpg); }", BASE),
            "a { background: url(http://localhost/a.jpg); }"
        );
        assert_eq!(
            absolutize_css_urls("a { background: url(/a.jpg); }", BASE),
            "a { background: url(http://localhost/a.jpg); }"
        );
    }

    #[test]
    fn absolutize_preserves_quote_style() {
        assert_eq!(
            absolutize_css_urls("a { background: url('a.jpg'); }", BASE),
            "a { background: url('http://localhost/css/a.jpg'); }"
        );
        assert_eq!(
            absolutize_css_urls(r#"a { background: url("a.jpg"); }"#, BASE),
            r#"a { background: url("http://localhost/css/a.jpg"); }"#
        );
    }

    #[test]
    fn absolutize_is_noop_on_absolute_and_special_targets() {
        for css in [
            "a { background: url(https://example.com/a.jpg); }",
            "a { background: url(data:image/png;base64,AAAA); }",
            "a { background: url(#gradient); }",
            "a { background: url(//cdn.example.com/a.jpg); }",
            "a { background: url(); }",
        ] {
            assert_eq!(absolutize_css_urls(css, BASE), css);
        }
    }

    #[test]
    fn absolutize_round_trips_svg_data_uris() {
        let css = r#"a { background: url("data:image/svg+xml;utf8,<svg width='10' height='(10)'><path d='M 0 0 L 1 1'/></svg>"); }"#;
        assert_eq!(absolutize_css_urls(css, BASE), css);
    }

    #[test]
    fn absolutize_handles_multiple_tokens() {
        let css = "a { background: url(a.jpg), url('https://example.com/b.jpg'); }";
        assert_eq!(
            absolutize_css_urls(css, BASE),
            "a { background: url(http://localhost/css/a.jpg), url('https://example.com/b.jpg'); }"
        );
    }

    fn import(href: &str) -> ImportRule {
        ImportRule {
            href: href.to_string(),
            media: Vec::new(),
            layer: None,
            supports: None,
            css_text: String::new(),
        }
    }

    #[test]
    fn rebuild_import_escapes_href_quotes() {
        let rule = import(r#"a"b.css"#);
        assert_eq!(rebuild_import(&rule), r#"@import url("a\"b.css");"#);
    }

    #[test]
    fn rebuild_import_orders_clauses() {
        let rule = ImportRule {
            href: "theme.css".to_string(),
            media: vec!["screen".to_string(), "print".to_string()],
            layer: Some(ImportLayer::Named("base".to_string())),
            supports: Some("display: grid".to_string()),
            css_text: String::new(),
        };
        assert_eq!(
            rebuild_import(&rule),
            r#"@import url("theme.css") layer(base) supports(display: grid) screen, print;"#
        );
    }

    #[test]
    fn rebuild_import_anonymous_layer_is_bare_keyword() {
        let rule = ImportRule {
            layer: Some(ImportLayer::Anonymous),
            ..import("theme.css")
        };
        assert_eq!(rebuild_import(&rule), r#"@import url("theme.css") layer;"#);
    }

    #[test]
    fn colon_escape_targets_bare_bracket_colons() {
        assert_eq!(
            escape_selector_colons("[data-foo:other] { color: red; }"),
            r"[data-foo\:other] { color: red; }"
        );
    }

    #[test]
    fn colon_escape_leaves_escaped_quoted_and_pseudo_colons() {
        for css in [
            r"[data-foo\:other] { color: red; }",
            r#"[data-foo="a:b"] { color: red; }"#,
            "a:hover { color: red; }",
        ] {
            assert_eq!(escape_selector_colons(css), css);
        }
    }

    fn grid_rule(css_text: &str, live: &str) -> StyleRule {
        StyleRule {
            selector_text: ".grid".to_string(),
            declarations: parse_declarations(live),
            css_text: css_text.to_string(),
        }
    }

    #[test]
    fn grid_repair_leaves_consistent_rules_unchanged() {
        let rule = grid_rule(
            ".grid { display: grid; grid-template-areas: \"a b\"; grid-template-rows: 1fr; grid-template-columns: 1fr 1fr; }",
            "display: grid; grid-template-areas: \"a b\"; grid-template-rows: 1fr; grid-template-columns: 1fr 1fr",
        );
        assert_eq!(normalize_style_rule(&rule), rule.css_text);
    }

    #[test]
    fn grid_repair_reorders_and_takes_live_values() {
        let rule = grid_rule(
            ".grid { grid-template-rows: none; display: grid; grid-template-areas: \"a b\"; }",
            "display: grid; grid-template-areas: \"a b\"; grid-template-rows: 1fr; grid-template-columns: 1fr 1fr",
        );
        assert_eq!(
            normalize_style_rule(&rule),
            ".grid { display: grid; grid-template-areas: \"a b\"; grid-template-rows: 1fr; grid-template-columns: 1fr 1fr; }"
        );
    }

    #[test]
    fn grid_repair_ignores_rules_without_grid_longhands() {
        let rule = grid_rule(
            ".grid { color: red; }",
            "color: red",
        );
        assert_eq!(normalize_style_rule(&rule), rule.css_text);
    }

    #[test]
    fn rule_text_rewraps_grouping_rules() {
        let rule = CssRule::Media {
            condition: "(min-width: 100px)".to_string(),
            rules: vec![CssRule::Style(StyleRule {
                selector_text: "a".to_string(),
                declarations: parse_declarations("background: url(a.jpg)"),
                css_text: "a { background: url(a.jpg); }".to_string(),
            })],
        };
        assert_eq!(
            rule_text(&rule, Some(BASE)),
            "@media (min-width: 100px) { a { background: url(http://localhost/css/a.jpg); } }"
        );
    }
}
