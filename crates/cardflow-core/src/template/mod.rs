//! Template resolution engine.
//!
//! - `defaults`: `<def>` default-value extraction from admin inputs
//! - `placeholder`: `{#...}` token scanning and resolution accounting
//! - `controls`: layered control values per card
//! - `resolver`: recursive, cycle-safe placeholder resolution
//! - `sorter`: numeric ordering of prompt blocks
//! - `batch`: resolves every card block and global block of an agent

pub mod batch;
pub mod controls;
pub mod defaults;
pub mod placeholder;
pub mod resolver;
pub mod sorter;

pub use batch::{BatchOutput, ProcessedBlockIndex, process_all};
pub use controls::ControlValues;
pub use defaults::{DefaultValue, extract_default};
pub use resolver::{MAX_DEPTH, ResolveOutcome, Resolver, resolve};
pub use sorter::sort_blocks;
