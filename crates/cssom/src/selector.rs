//! Selector subset used by redaction policy (block/hide/mask selectors).

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Selector {
    Universal,
    Type(String),  // element/tag selector
    Id(String),    // #id selector
    Class(String), // .class selector
}

/// A comma-separated selector list; an element matches if any member does.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct SelectorList(pub Vec<Selector>);

impl SelectorList {
    /// input: "div, #id, .warn"
    pub fn parse(input: &str) -> Self {
        SelectorList(input.split(',').filter_map(parse_selector_one).collect())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn parse_selector_one(s: &str) -> Option<Selector> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if s == "*" {
        return Some(Selector::Universal);
    }
    if let Some(id) = s.strip_prefix('#') {
        return Some(Selector::Id(id.trim().to_string()));
    }
    if let Some(class) = s.strip_prefix('.') {
        return Some(Selector::Class(class.trim().to_string()));
    }
    if s.chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Some(Selector::Type(s.to_ascii_lowercase()));
    }
    None
}
