//! Sequential block execution.
//!
//! `RunOrchestrator` resolves an agent with the batch processor, then sends
//! each resolved block to the model in order, threading every successful
//! prompt/response pair into the context of the blocks that follow.

pub mod orchestrator;
pub mod state;

pub use orchestrator::{BlockOutcome, RunError, RunOptions, RunOrchestrator, RunRequest, RunSummary};
pub use state::RunState;
