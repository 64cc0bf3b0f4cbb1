//! Deterministic prompt-block ordering.

use std::sync::LazyLock;

use regex::Regex;

static BLOCK_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"promptBlock(\d+)").expect("invalid block number regex"));

/// The `N` of `promptBlock<N>`, or 0 when the id has no such number.
///
/// A number too large for `u64` saturates to `u64::MAX`.
pub fn block_number(block_id: &str) -> u64 {
    BLOCK_NUMBER
        .captures(block_id)
        .map(|caps| caps[1].parse().unwrap_or(u64::MAX))
        .unwrap_or(0)
}

/// Order `(block_id, text)` pairs by block number, ascending.
///
/// The sort is stable: equal numbers keep their input order.
pub fn sort_blocks<'a, I>(blocks: I) -> Vec<(&'a str, &'a str)>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut sorted: Vec<(&str, &str)> = blocks.into_iter().collect();
    sorted.sort_by_key(|(id, _)| block_number(id));
    sorted
}
