//! Recursive placeholder resolution.
//!
//! Placeholders are `{#identifier}` tokens. Each call resolves four
//! identifier classes in a fixed order:
//!
//! 1. `{#input}` -- the user's input, or the agent label when the input is empty
//! 2. scalar control references -- any control key, spelled with or without
//!    its `input` prefix
//! 3. cross-card scalar references -- `{#card<N>.input<rest>}`, read from the
//!    referenced card's admin-input default
//! 4. prompt-block references -- `{#promptBlock<N>}` or
//!    `{#card<N>.promptBlock<N>}`, replaced by the referenced block's
//!    template, itself fully resolved
//!
//! A top-level block reference that already has an entry in a
//! [`ProcessedBlockIndex`] (see [`Resolver::resolve_cached`]) is spliced
//! verbatim; the cached text is final and is never resolved again.
//!
//! Block references carry a `visited` set down the recursion. A reference
//! already in the set is left in place, and recursion stops past
//! [`MAX_DEPTH`]. Neither case is an error: the token simply shows up in
//! the outcome's unreplaced list.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use cardflow_types::agent::Card;

use super::batch::ProcessedBlockIndex;
use super::controls::{ControlValues, render_value};
use super::defaults::card_defaults;
use super::placeholder::{BLOCK_REFERENCE, CARD_INPUT_REFERENCE, INPUT_TOKEN, tally};

/// Deepest nesting of block references that is still expanded.
pub const MAX_DEPTH: usize = 10;

const INPUT_PREFIX: &str = "input";

/// Resolved text plus diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveOutcome {
    pub processed: String,
    pub replaced_count: usize,
    pub unreplaced_count: usize,
    pub unreplaced_list: Vec<String>,
}

/// Everything a resolution reads. Immutable once built, so a single
/// resolver can serve any number of `resolve` calls.
#[derive(Debug)]
pub struct Resolver<'a> {
    controls: &'a ControlValues,
    agent_label: &'a str,
    cards: &'a [Card],
    user_input: &'a str,
    /// `"<cardId>.input<field>" -> default value` for every admin input.
    card_inputs: HashMap<String, String>,
}

impl<'a> Resolver<'a> {
    /// `controls` must already be layered for the card being resolved.
    pub fn new(
        controls: &'a ControlValues,
        agent_label: &'a str,
        cards: &'a [Card],
        user_input: &'a str,
    ) -> Self {
        Self {
            controls,
            agent_label,
            cards,
            user_input,
            card_inputs: index_card_inputs(cards),
        }
    }

    /// Resolve `text` at recursion `depth` with the references already
    /// expanded by ancestor calls in `visited`.
    pub fn resolve(&self, text: &str, depth: usize, visited: &HashSet<String>) -> ResolveOutcome {
        let processed = self.expand(text, depth, visited, None);
        Self::outcome(text, processed)
    }

    /// Resolve a block template, splicing block references found in `text`
    /// itself from `cache` before falling back to recursive expansion.
    pub fn resolve_cached(&self, text: &str, cache: &ProcessedBlockIndex) -> ResolveOutcome {
        let processed = self.expand(text, 0, &HashSet::new(), Some(cache));
        Self::outcome(text, processed)
    }

    fn outcome(text: &str, processed: String) -> ResolveOutcome {
        let tally = tally(text, &processed);
        ResolveOutcome {
            processed,
            replaced_count: tally.replaced_count,
            unreplaced_count: tally.unreplaced_count,
            unreplaced_list: tally.unreplaced_list,
        }
    }

    fn expand(
        &self,
        text: &str,
        depth: usize,
        visited: &HashSet<String>,
        cache: Option<&ProcessedBlockIndex>,
    ) -> String {
        if depth > MAX_DEPTH {
            debug!(depth, "block reference depth limit reached");
            return text.to_string();
        }

        let mut result = self.substitute_user_input(text);
        result = self.substitute_controls(result);
        result = self.substitute_card_inputs(&result);
        self.substitute_block_references(&result, depth, visited, cache)
    }

    fn substitute_user_input(&self, text: &str) -> String {
        if !text.contains(INPUT_TOKEN) {
            return text.to_string();
        }
        let replacement = if self.user_input.is_empty() {
            self.agent_label
        } else {
            self.user_input
        };
        text.replace(INPUT_TOKEN, replacement)
    }

    fn substitute_controls(&self, mut text: String) -> String {
        for (key, value) in self.controls.iter() {
            let Some(rendered) = render_value(value) else {
                continue;
            };
            for spelling in control_spellings(key) {
                if text.contains(&spelling) {
                    text = text.replace(&spelling, &rendered);
                }
            }
        }
        text
    }

    fn substitute_card_inputs(&self, text: &str) -> String {
        CARD_INPUT_REFERENCE
            .replace_all(text, |caps: &regex::Captures<'_>| {
                let card_id = &caps[1];
                let rest = &caps[2];
                let key = format!("{card_id}.{INPUT_PREFIX}{rest}");
                if let Some(value) = self.card_inputs.get(&key) {
                    return value.clone();
                }
                // Fall back to the field as a plain control key.
                self.controls
                    .rendered(&format!("{INPUT_PREFIX}{rest}"))
                    .or_else(|| (!rest.is_empty()).then(|| self.controls.rendered(rest)).flatten())
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }

    /// Replace every block reference in one pass, so text spliced in for
    /// one reference is never rescanned for another.
    fn substitute_block_references(
        &self,
        text: &str,
        depth: usize,
        visited: &HashSet<String>,
        cache: Option<&ProcessedBlockIndex>,
    ) -> String {
        let mut expansions: HashMap<String, String> = HashMap::new();
        BLOCK_REFERENCE
            .replace_all(text, |caps: &regex::Captures<'_>| {
                let token = &caps[0];
                if let Some(done) = expansions.get(token) {
                    return done.clone();
                }
                let card_id = caps.get(1).map(|m| m.as_str());
                let expanded =
                    self.expand_reference(token, card_id, &caps[2], depth, visited, cache);
                expansions.insert(token.to_string(), expanded.clone());
                expanded
            })
            .into_owned()
    }

    fn expand_reference(
        &self,
        token: &str,
        card_id: Option<&str>,
        block_id: &str,
        depth: usize,
        visited: &HashSet<String>,
        cache: Option<&ProcessedBlockIndex>,
    ) -> String {
        if let Some(cached) = cache.and_then(|index| index.lookup(card_id, block_id)) {
            return cached.to_string();
        }
        if visited.contains(token) {
            debug!(reference = %token, depth, "reference cycle, leaving unresolved");
            return token.to_string();
        }
        let Some(template) = self.find_block(card_id, block_id) else {
            return token.to_string();
        };

        let mut branch = visited.clone();
        branch.insert(token.to_string());
        self.expand(template, depth + 1, &branch, None)
    }

    /// Template text of a referenced block. Unqualified references take the
    /// first card that has the block.
    fn find_block(&self, card_id: Option<&str>, block_id: &str) -> Option<&'a str> {
        match card_id {
            Some(card_id) => self
                .cards
                .iter()
                .find(|c| c.id == card_id)
                .and_then(|c| c.prompt_block(block_id)),
            None => self.cards.iter().find_map(|c| c.prompt_block(block_id)),
        }
    }
}

/// Resolve `text` against the given entities.
///
/// Convenience wrapper building a one-off [`Resolver`].
pub fn resolve(
    text: &str,
    controls: &ControlValues,
    agent_label: &str,
    cards: &[Card],
    user_input: &str,
    depth: usize,
    visited: &HashSet<String>,
) -> ResolveOutcome {
    Resolver::new(controls, agent_label, cards, user_input).resolve(text, depth, visited)
}

/// The placeholder spellings a control key answers to.
fn control_spellings(key: &str) -> Vec<String> {
    let bare = key.strip_prefix(INPUT_PREFIX).unwrap_or(key);
    let mut spellings = Vec::with_capacity(3);
    for ident in [key.to_string(), format!("{INPUT_PREFIX}{bare}"), bare.to_string()] {
        if ident.is_empty() {
            continue;
        }
        let spelling = format!("{{#{ident}}}");
        if !spellings.contains(&spelling) {
            spellings.push(spelling);
        }
    }
    spellings
}

fn index_card_inputs(cards: &[Card]) -> HashMap<String, String> {
    let mut index = HashMap::new();
    for card in cards {
        for (field_id, default) in card_defaults(card) {
            let field = if field_id.starts_with(INPUT_PREFIX) {
                field_id.to_string()
            } else {
                format!("{INPUT_PREFIX}{field_id}")
            };
            index
                .entry(format!("{}.{}", card.id, field))
                .or_insert(default.default_value);
        }
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardflow_types::agent::FieldMap;
    use serde_json::json;

    fn card(id: &str, inputs: &[(&str, &str)], blocks: &[(&str, &str)]) -> Card {
        Card {
            id: id.to_string(),
            title: format!("Title {id}"),
            admin_inputs: inputs.iter().copied().collect(),
            prompt_blocks: blocks.iter().copied().collect(),
        }
    }

    fn run(text: &str, controls: &ControlValues, cards: &[Card], user_input: &str) -> ResolveOutcome {
        resolve(text, controls, "Helper", cards, user_input, 0, &HashSet::new())
    }

    #[test]
    fn test_resolve_cached_splices_top_level_references_verbatim() {
        let cards = vec![card(
            "card1",
            &[],
            &[("promptBlock1", "fresh {#inputB1}"), ("promptBlock2", "two")],
        )];
        let controls: ControlValues = [("inputB1", "x")].into_iter().collect();
        let mut cache = ProcessedBlockIndex::default();
        cache.insert("card1.promptBlock1".into(), "cached {#inputB1}".into());

        let resolver = Resolver::new(&controls, "Helper", &cards, "");
        let outcome = resolver.resolve_cached("{#promptBlock1} / {#promptBlock2} / {#inputB1}", &cache);
        assert_eq!(outcome.processed, "cached {#inputB1} / two / x");
        // `{#inputB1}` is still present, so it does not count as replaced.
        assert_eq!(outcome.replaced_count, 2);
        assert_eq!(outcome.unreplaced_list, vec!["{#inputB1}"]);
    }

    #[test]
    fn test_spliced_text_is_not_rescanned_for_later_references() {
        let cards = vec![card(
            "card1",
            &[],
            &[("promptBlock1", "one {#promptBlock2}"), ("promptBlock2", "two")],
        )];
        let mut cache = ProcessedBlockIndex::default();
        cache.insert("card1.promptBlock1".into(), "kept {#promptBlock2}".into());

        let controls = ControlValues::new();
        let resolver = Resolver::new(&controls, "Helper", &cards, "");
        let outcome = resolver.resolve_cached("{#promptBlock1} then {#promptBlock2}", &cache);
        assert_eq!(outcome.processed, "kept {#promptBlock2} then two");
    }

    #[test]
    fn test_text_without_placeholders_is_unchanged() {
        let outcome = run("nothing to see", &ControlValues::new(), &[], "");
        assert_eq!(outcome.processed, "nothing to see");
        assert_eq!(outcome.replaced_count, 0);
        assert_eq!(outcome.unreplaced_count, 0);
        assert!(outcome.unreplaced_list.is_empty());
    }

    #[test]
    fn test_resolving_resolved_text_is_idempotent() {
        let controls: ControlValues = [("inputB1", "Alice")].into_iter().collect();
        let first = run("Hello {#inputB1}", &controls, &[], "");
        let second = run(&first.processed, &controls, &[], "");
        assert_eq!(second.processed, first.processed);
        assert_eq!(second.replaced_count, 0);
        assert_eq!(second.unreplaced_count, 0);
    }

    #[test]
    fn test_input_token_uses_user_input() {
        let outcome = run("Q: {#input} / {#input}", &ControlValues::new(), &[], "why?");
        assert_eq!(outcome.processed, "Q: why? / why?");
        assert_eq!(outcome.replaced_count, 2);
    }

    #[test]
    fn test_input_token_falls_back_to_agent_label() {
        let outcome = run("About {#input}", &ControlValues::new(), &[], "");
        assert_eq!(outcome.processed, "About Helper");
    }

    #[test]
    fn test_control_key_matches_all_spellings() {
        let controls: ControlValues = [("inputB1", "Alice")].into_iter().collect();
        let outcome = run("{#inputB1} {#B1}", &controls, &[], "");
        assert_eq!(outcome.processed, "Alice Alice");

        let bare: ControlValues = [("B1", "Bob")].into_iter().collect();
        let outcome = run("{#inputB1} {#B1}", &bare, &[], "");
        assert_eq!(outcome.processed, "Bob Bob");
        assert!(outcome.unreplaced_list.is_empty());
    }

    #[test]
    fn test_empty_control_value_is_substituted_and_null_is_not() {
        let controls: ControlValues = [("inputB1", json!("")), ("inputB2", json!(null))]
            .into_iter()
            .collect();
        let outcome = run("[{#inputB1}] [{#inputB2}]", &controls, &[], "");
        assert_eq!(outcome.processed, "[] [{#inputB2}]");
        assert_eq!(outcome.unreplaced_list, vec!["{#inputB2}"]);
    }

    #[test]
    fn test_non_string_control_values_render_as_text() {
        let controls: ControlValues = [("inputCount", json!(3))].into_iter().collect();
        assert_eq!(run("n={#inputCount}", &controls, &[], "").processed, "n=3");
    }

    #[test]
    fn test_resolves_own_card_default() {
        let cards = vec![card(
            "card1",
            &[("inputB1", "Name <def>Alice</def>")],
            &[("promptBlock1", "Hello {#inputB1}")],
        )];
        let controls = ControlValues::layered(&cards, Some("card1"), &ControlValues::new());
        let outcome = run("Hello {#inputB1}", &controls, &cards, "");
        assert_eq!(outcome.processed, "Hello Alice");
        assert_eq!(outcome.replaced_count, 1);
        assert_eq!(outcome.unreplaced_count, 0);
    }

    #[test]
    fn test_resolves_cross_card_default() {
        let cards = vec![
            card("card1", &[("inputB1", "X <def>Bob</def>")], &[]),
            card("card2", &[], &[("promptBlock1", "See {#card1.inputB1}")]),
        ];
        let outcome = run("See {#card1.inputB1}", &ControlValues::new(), &cards, "");
        assert_eq!(outcome.processed, "See Bob");
        assert_eq!(outcome.replaced_count, 1);
    }

    #[test]
    fn test_cross_card_reference_normalizes_field_ids() {
        let cards = vec![card("card1", &[("B7", "<def>seven</def>")], &[])];
        let outcome = run("{#card1.inputB7}", &ControlValues::new(), &cards, "");
        assert_eq!(outcome.processed, "seven");
    }

    #[test]
    fn test_cross_card_reference_falls_back_to_controls() {
        let controls: ControlValues = [("inputB9", "nine")].into_iter().collect();
        let outcome = run("{#card4.inputB9}", &controls, &[], "");
        assert_eq!(outcome.processed, "nine");

        let outcome = run("{#card4.inputZ}", &ControlValues::new(), &[], "");
        assert_eq!(outcome.processed, "{#card4.inputZ}");
        assert_eq!(outcome.unreplaced_list, vec!["{#card4.inputZ}"]);
    }

    #[test]
    fn test_missing_field_is_reported_unreplaced() {
        let outcome = run("Use {#missingField}", &ControlValues::new(), &[], "");
        assert_eq!(outcome.processed, "Use {#missingField}");
        assert_eq!(outcome.unreplaced_list, vec!["{#missingField}"]);
        assert_eq!(outcome.unreplaced_count, 1);
        assert_eq!(outcome.replaced_count, 0);
    }

    #[test]
    fn test_block_reference_expands_recursively() {
        let cards = vec![card(
            "card1",
            &[("inputB1", "Name <def>Alice</def>")],
            &[
                ("promptBlock1", "Greet {#inputB1}"),
                ("promptBlock2", "[{#promptBlock1}] then [{#card1.promptBlock1}]"),
            ],
        )];
        let controls = ControlValues::layered(&cards, Some("card1"), &ControlValues::new());
        let outcome = run("{#promptBlock2}", &controls, &cards, "");
        assert_eq!(outcome.processed, "[Greet Alice] then [Greet Alice]");
        assert_eq!(outcome.replaced_count, 1);
        assert_eq!(outcome.unreplaced_count, 0);
    }

    #[test]
    fn test_unqualified_reference_takes_first_card_with_block() {
        let cards = vec![
            card("card1", &[], &[]),
            card("card2", &[], &[("promptBlock3", "from two")]),
            card("card3", &[], &[("promptBlock3", "from three")]),
        ];
        let outcome = run("{#promptBlock3} {#card3.promptBlock3}", &ControlValues::new(), &cards, "");
        assert_eq!(outcome.processed, "from two from three");
    }

    #[test]
    fn test_unknown_block_reference_is_unreplaced() {
        let cards = vec![card("card1", &[], &[("promptBlock1", "x")])];
        let outcome = run("{#card2.promptBlock1} {#promptBlock9}", &ControlValues::new(), &cards, "");
        assert_eq!(outcome.unreplaced_count, 2);
        assert_eq!(
            outcome.unreplaced_list,
            vec!["{#card2.promptBlock1}", "{#promptBlock9}"]
        );
    }

    #[test]
    fn test_mutual_references_terminate() {
        let cards = vec![card(
            "card1",
            &[],
            &[
                ("promptBlock1", "A {#promptBlock2}"),
                ("promptBlock2", "B {#promptBlock1}"),
            ],
        )];
        let outcome = run("A {#promptBlock2}", &ControlValues::new(), &cards, "");
        assert_eq!(outcome.processed, "A B A {#promptBlock2}");
        assert_eq!(outcome.unreplaced_list, vec!["{#promptBlock2}"]);
        assert_eq!(outcome.unreplaced_count, 1);
    }

    #[test]
    fn test_self_reference_terminates() {
        let cards = vec![card("card1", &[], &[("promptBlock1", "loop {#promptBlock1}")])];
        let outcome = run("{#promptBlock1}", &ControlValues::new(), &cards, "");
        assert_eq!(outcome.processed, "loop {#promptBlock1}");
        assert_eq!(outcome.unreplaced_list, vec!["{#promptBlock1}"]);
    }

    #[test]
    fn test_deep_chain_is_truncated_without_panicking() {
        // promptBlock1 -> promptBlock2 -> ... -> promptBlock12 -> "end"
        let mut blocks: Vec<(String, String)> = (1..12)
            .map(|n| (format!("promptBlock{n}"), format!("{n} {{#promptBlock{}}}", n + 1)))
            .collect();
        blocks.push(("promptBlock12".to_string(), "end".to_string()));
        let cards = vec![Card {
            id: "card1".into(),
            title: String::new(),
            admin_inputs: FieldMap::new(),
            prompt_blocks: blocks.into_iter().collect(),
        }];

        let outcome = run("{#promptBlock1}", &ControlValues::new(), &cards, "");
        assert!(outcome.processed.starts_with("1 2 3"));
        assert!(!outcome.processed.contains("end"));
        assert_eq!(outcome.unreplaced_count, 1);
    }

    #[test]
    fn test_depth_beyond_limit_returns_text_unchanged() {
        let controls: ControlValues = [("inputB1", "Alice")].into_iter().collect();
        let outcome = resolve(
            "Hello {#inputB1}",
            &controls,
            "Helper",
            &[],
            "",
            MAX_DEPTH + 1,
            &HashSet::new(),
        );
        assert_eq!(outcome.processed, "Hello {#inputB1}");
        assert_eq!(outcome.replaced_count, 0);
    }

    #[test]
    fn test_visited_reference_from_caller_is_not_expanded() {
        let cards = vec![card("card1", &[], &[("promptBlock1", "body")])];
        let visited: HashSet<String> = ["{#promptBlock1}".to_string()].into_iter().collect();
        let outcome = resolve(
            "{#promptBlock1}",
            &ControlValues::new(),
            "Helper",
            &cards,
            "",
            0,
            &visited,
        );
        assert_eq!(outcome.processed, "{#promptBlock1}");
    }

    #[test]
    fn test_control_spellings_are_deduplicated() {
        assert_eq!(control_spellings("inputB1"), vec!["{#inputB1}", "{#B1}"]);
        assert_eq!(control_spellings("B1"), vec!["{#B1}", "{#inputB1}"]);
        assert_eq!(control_spellings("input"), vec!["{#input}"]);
    }
}
