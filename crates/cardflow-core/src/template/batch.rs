//! Batch resolution of every prompt block of an agent.
//!
//! Cards are processed in order, each card's blocks in sorted order, then the
//! global blocks. Every resolved block is recorded in a
//! [`ProcessedBlockIndex`] before the next one is processed, and block
//! references that already have an entry there are spliced in verbatim
//! instead of being re-derived by the recursive resolver.

use tracing::debug;

use cardflow_types::agent::{Card, FieldMap};
use cardflow_types::block::{GLOBAL_CARD_ID, GLOBAL_CARD_TITLE, ProcessedPromptBlock};

use super::controls::ControlValues;
use super::resolver::Resolver;
use super::sorter::sort_blocks;

/// Insertion-ordered cache of resolved block text keyed `"<cardId>.<blockId>"`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessedBlockIndex {
    entries: Vec<(String, String)>,
}

impl ProcessedBlockIndex {
    /// Record `processed` under `key`, replacing an earlier entry in place.
    pub fn insert(&mut self, key: String, processed: String) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = processed,
            None => self.entries.push((key, processed)),
        }
    }

    /// Exact lookup by `"<cardId>.<blockId>"`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// First entry, in insertion order, whose block id is `block_id`.
    pub fn find_by_block(&self, block_id: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| {
                k.rsplit_once('.')
                    .is_some_and(|(_, block)| block == block_id)
            })
            .map(|(_, v)| v.as_str())
    }

    /// Entry for a block reference: exact when card-qualified, otherwise
    /// the first entry for `block_id`.
    pub fn lookup(&self, card_id: Option<&str>, block_id: &str) -> Option<&str> {
        match card_id {
            Some(card_id) => self.get(&format!("{card_id}.{block_id}")),
            None => self.find_by_block(block_id),
        }
    }

    /// Number of processed card blocks recorded.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True before any card block has been processed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Result of [`process_all`].
#[derive(Debug, Clone, Default)]
pub struct BatchOutput {
    /// Card by card, each card's blocks ordered by number.
    pub card_blocks: Vec<ProcessedPromptBlock>,
    /// Global blocks ordered by number, after every card block.
    pub global_blocks: Vec<ProcessedPromptBlock>,
    pub processed_blocks: ProcessedBlockIndex,
}

impl BatchOutput {
    /// Number of blocks a run will execute.
    pub fn total(&self) -> usize {
        self.card_blocks.len() + self.global_blocks.len()
    }

    /// Card blocks, then global blocks: the execution order.
    pub fn iter_all(&self) -> impl Iterator<Item = &ProcessedPromptBlock> {
        self.card_blocks.iter().chain(self.global_blocks.iter())
    }

    /// Sum of unresolved placeholders across all blocks.
    pub fn unreplaced_total(&self) -> usize {
        self.iter_all().map(|b| b.unreplaced_count).sum()
    }
}

/// Resolve every card block and global block.
///
/// `overrides` are operator-supplied control values; admin-input defaults
/// are always layered underneath them (see [`ControlValues::layered`]).
pub fn process_all(
    cards: &[Card],
    global_prompt_blocks: &FieldMap,
    overrides: &ControlValues,
    agent_label: &str,
    user_input: &str,
) -> BatchOutput {
    let mut output = BatchOutput::default();

    for card in cards {
        let controls = ControlValues::layered(cards, Some(&card.id), overrides);
        let resolver = Resolver::new(&controls, agent_label, cards, user_input);

        for (block_id, template) in sort_blocks(card.prompt_blocks.iter()) {
            let block = resolve_block(
                &resolver,
                &output.processed_blocks,
                &card.id,
                &card.title,
                block_id,
                template,
                false,
            );
            output
                .processed_blocks
                .insert(block.dict_key(), block.processed.clone());
            output.card_blocks.push(block);
        }
    }

    let controls = ControlValues::layered(cards, None, overrides);
    let resolver = Resolver::new(&controls, agent_label, cards, user_input);
    for (block_id, template) in sort_blocks(global_prompt_blocks.iter()) {
        let block = resolve_block(
            &resolver,
            &output.processed_blocks,
            GLOBAL_CARD_ID,
            GLOBAL_CARD_TITLE,
            block_id,
            template,
            true,
        );
        output
            .processed_blocks
            .insert(block.dict_key(), block.processed.clone());
        output.global_blocks.push(block);
    }

    debug!(
        card_blocks = output.card_blocks.len(),
        global_blocks = output.global_blocks.len(),
        unreplaced = output.unreplaced_total(),
        "processed prompt blocks"
    );

    output
}

fn resolve_block(
    resolver: &Resolver<'_>,
    index: &ProcessedBlockIndex,
    card_id: &str,
    card_title: &str,
    block_id: &str,
    template: &str,
    is_global: bool,
) -> ProcessedPromptBlock {
    let outcome = resolver.resolve_cached(template, index);

    debug!(
        card_id,
        block_id,
        replaced = outcome.replaced_count,
        unreplaced = outcome.unreplaced_count,
        "resolved prompt block"
    );

    ProcessedPromptBlock {
        card_id: card_id.to_string(),
        card_title: card_title.to_string(),
        block_id: block_id.to_string(),
        original: template.to_string(),
        processed: outcome.processed,
        replaced_count: outcome.replaced_count,
        unreplaced_count: outcome.unreplaced_count,
        unreplaced_list: outcome.unreplaced_list,
        is_global,
    }
}
