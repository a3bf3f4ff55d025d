//! Line-level classification of pahole member records.
//!
//! Matching is regex based and tuned to the shape of `pahole -E` output.
//! It is a heuristic over that format, not a C declarator parser.

use once_cell::sync::Lazy;
use regex::Regex;

/// Which primary pattern made a member interesting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberTrait {
    FunctionPointer,
    ListAnchor,
    OpsPointer,
}

impl MemberTrait {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberTrait::FunctionPointer => "function pointer",
            MemberTrait::ListAnchor => "list_head",
            MemberTrait::OpsPointer => "ops pointer",
        }
    }
}

static RE_FUNCTION_POINTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(\s*\*.*\)\s*\(").expect("valid function pointer regex"));
static RE_LIST_ANCHOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"struct\s+list_head\b").expect("valid list_head regex"));
static RE_OPS_POINTER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"struct\s+\w*(?:ops|operations)\s*\*").expect("valid ops pointer regex")
});

static RE_ELASTIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bchar\s+\w+\s*\[\s*\]").expect("valid elastic array regex"));

static RE_COMMENT_OPEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*/\*").expect("valid comment regex"));
static RE_CLOSING_BRACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\}\s*;?\s*$").expect("valid closing brace regex"));
static RE_BLANK: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*$").expect("valid blank regex"));

/// Priority order is fixed; the first pattern that matches wins.
static PRIMARY_PATTERNS: Lazy<[(MemberTrait, &'static Regex); 3]> = Lazy::new(|| {
    [
        (MemberTrait::FunctionPointer, &*RE_FUNCTION_POINTER),
        (MemberTrait::ListAnchor, &*RE_LIST_ANCHOR),
        (MemberTrait::OpsPointer, &*RE_OPS_POINTER),
    ]
});

pub fn classify_member(line: &str) -> Option<MemberTrait> {
    PRIMARY_PATTERNS
        .iter()
        .find(|(_, re)| re.is_match(line))
        .map(|(t, _)| *t)
}

pub fn is_interesting(line: &str) -> bool {
    classify_member(line).is_some()
}

/// Flexible trailing `char` array (`char data[];`).
pub fn classify_elastic(line: &str) -> bool {
    RE_ELASTIC.is_match(line)
}

pub fn is_delimiter(line: &str) -> bool {
    RE_COMMENT_OPEN.is_match(line) || RE_CLOSING_BRACE.is_match(line) || RE_BLANK.is_match(line)
}
