//! Prompt-block resolution results and run progress.

use serde::{Deserialize, Serialize};

/// Card id used for blocks from `globalPromptBlocks`.
pub const GLOBAL_CARD_ID: &str = "global";

/// Card title used for blocks from `globalPromptBlocks`.
pub const GLOBAL_CARD_TITLE: &str = "Global";

/// The resolution result for one prompt block.
///
/// `replaced_count + unreplaced_count` placeholders existed in `original`
/// when no reference expanded into further unresolved tokens.
/// `unreplaced_list` holds each remaining literal `{#...}` token once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedPromptBlock {
    pub card_id: String,
    pub card_title: String,
    pub block_id: String,
    pub original: String,
    pub processed: String,
    pub replaced_count: usize,
    pub unreplaced_count: usize,
    pub unreplaced_list: Vec<String>,
    pub is_global: bool,
}

impl ProcessedPromptBlock {
    /// Key under which this block is cached: `"<cardId>.<blockId>"`.
    pub fn dict_key(&self) -> String {
        format!("{}.{}", self.card_id, self.block_id)
    }

    pub fn is_fully_resolved(&self) -> bool {
        self.unreplaced_count == 0
    }

    pub fn block_ref(&self) -> BlockRef {
        BlockRef {
            card_id: self.card_id.clone(),
            block_id: self.block_id.clone(),
            is_global: self.is_global,
        }
    }
}

/// Identifies the block a conversation message was produced for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockRef {
    pub card_id: String,
    pub block_id: String,
    pub is_global: bool,
}

/// Progress of a run, stored on the run's "process" message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressInfo {
    /// 1-based index of the block currently executing (0 before the first).
    pub current: usize,
    pub total: usize,
    pub completed: bool,
    /// Number of card blocks in the run.
    pub card_blocks: usize,
    /// Number of global blocks in the run.
    pub global_blocks: usize,
}

impl ProgressInfo {
    pub fn new(card_blocks: usize, global_blocks: usize) -> Self {
        Self {
            current: 0,
            total: card_blocks + global_blocks,
            completed: false,
            card_blocks,
            global_blocks,
        }
    }

    /// Mark block `current` (1-based) as executing.
    pub fn advance(&mut self, current: usize) {
        self.current = current;
    }

    /// Mark the run finished; `current` jumps to `total`.
    pub fn complete(&mut self) {
        self.current = self.total;
        self.completed = true;
    }
}
