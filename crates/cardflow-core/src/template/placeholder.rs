//! `{#identifier}` placeholder scanning and resolution accounting.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

/// Any placeholder: `{#` followed by at least one non-`}` character and `}`.
pub static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{#([^}]+)\}").expect("invalid placeholder regex"));

/// `{#promptBlock<N>}` or `{#card<N>.promptBlock<N>}`.
pub static BLOCK_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{#(?:(card\d+)\.)?(promptBlock\d+)\}").expect("invalid block reference regex")
});

/// `{#card<N>.input<rest>}`.
pub static CARD_INPUT_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{#(card\d+)\.input([^}]*)\}").expect("invalid card input regex")
});

/// The user-input token.
pub const INPUT_TOKEN: &str = "{#input}";

/// Every placeholder occurrence in `text`, in order, duplicates included.
pub fn placeholders(text: &str) -> Vec<&str> {
    PLACEHOLDER.find_iter(text).map(|m| m.as_str()).collect()
}

/// Diagnostics comparing a template with its resolved text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tally {
    pub replaced_count: usize,
    pub unreplaced_count: usize,
    pub unreplaced_list: Vec<String>,
}

/// Count placeholders eliminated between `original` and `processed`.
///
/// `unreplaced_count` is every placeholder occurrence left in `processed`,
/// including tokens introduced by expanding a reference.
/// `replaced_count` is the number of `original` occurrences minus the
/// occurrences of those same tokens still present, so one reference that
/// expands into new unresolved tokens still counts as one replacement.
pub fn tally(original: &str, processed: &str) -> Tally {
    let before = placeholders(original);
    let after = placeholders(processed);

    let original_tokens: HashSet<&str> = before.iter().copied().collect();
    let survivors = after
        .iter()
        .filter(|token| original_tokens.contains(*token))
        .count();

    let mut seen = HashSet::new();
    let unreplaced_list = after
        .iter()
        .filter(|token| seen.insert(**token))
        .map(|token| token.to_string())
        .collect();

    Tally {
        replaced_count: before.len().saturating_sub(survivors),
        unreplaced_count: after.len(),
        unreplaced_list,
    }
}

/// A piece of resolved text, for previews that highlight unresolved tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    Text(&'a str),
    Unresolved(&'a str),
}

/// Split `text` into plain runs and unresolved placeholders.
pub fn segments(text: &str) -> Vec<Segment<'_>> {
    let mut out = Vec::new();
    let mut last = 0;
    for m in PLACEHOLDER.find_iter(text) {
        if m.start() > last {
            out.push(Segment::Text(&text[last..m.start()]));
        }
        out.push(Segment::Unresolved(m.as_str()));
        last = m.end();
    }
    if last < text.len() {
        out.push(Segment::Text(&text[last..]));
    }
    out
}

/// Render `text` with every unresolved placeholder passed through `mark`.
pub fn highlight_unreplaced(text: &str, mark: impl Fn(&str) -> String) -> String {
    segments(text)
        .into_iter()
        .map(|segment| match segment {
            Segment::Text(t) => t.to_string(),
            Segment::Unresolved(token) => mark(token),
        })
        .collect()
}
