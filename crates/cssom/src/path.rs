//! Path-based addressing into nested rule containers.
//!
//! A rule path is the index sequence locating a rule through grouping rules:
//! `[i]` is top-level rule `i`, `[i, j]` is rule `j` inside the grouping rule
//! at top-level index `i`, and so on for arbitrary depth.

use crate::rules::CssRule;
use std::fmt;

/// A rule path that does not resolve against the live rule tree.
///
/// This is a caller bookkeeping error, not an expected runtime condition:
/// the mutation layer's paths must stay consistent with the rule tree it
/// observed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RulePathError {
    EmptyPath,
    OutOfRange {
        depth: usize,
        index: usize,
        len: usize,
    },
    /// The path continues past a rule with no nested rule list.
    NotAGroup { depth: usize },
}

impl fmt::Display for RulePathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RulePathError::EmptyPath => write!(f, "rule path is empty"),
            RulePathError::OutOfRange { depth, index, len } => write!(
                f,
                "rule path index {index} at depth {depth} is out of range for {len} rules"
            ),
            RulePathError::NotAGroup { depth } => {
                write!(f, "rule path descends into a non-grouping rule at depth {depth}")
            }
        }
    }
}

impl std::error::Error for RulePathError {}

/// Resolve `path` against `rules`, descending through grouping rules.
pub fn nested_rule<'a>(
    rules: &'a [CssRule],
    path: &[usize],
) -> Result<&'a CssRule, RulePathError> {
    let (&first, rest) = path.split_first().ok_or(RulePathError::EmptyPath)?;
    let mut rule = rules.get(first).ok_or(RulePathError::OutOfRange {
        depth: 0,
        index: first,
        len: rules.len(),
    })?;
    for (i, &index) in rest.iter().enumerate() {
        let depth = i + 1;
        let nested = rule
            .nested_rules()
            .ok_or(RulePathError::NotAGroup { depth })?;
        rule = nested.get(index).ok_or(RulePathError::OutOfRange {
            depth,
            index,
            len: nested.len(),
        })?;
    }
    Ok(rule)
}
