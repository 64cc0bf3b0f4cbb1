//! Orchestrator lifecycle state.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Where an orchestrator is in its run.
///
/// `Idle -> Announced -> Running(1..=N) -> Completed`. `Failed` is only
/// reached when a run is abandoned mid-flight (its future dropped);
/// per-block model errors do not fail the run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RunState {
    #[default]
    Idle,
    Announced,
    Running { block_index: usize },
    Completed,
    Failed { block_index: usize },
}

impl RunState {
    /// A run is in progress and a new one would be rejected.
    pub fn is_busy(&self) -> bool {
        matches!(self, RunState::Announced | RunState::Running { .. })
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Idle => write!(f, "idle"),
            RunState::Announced => write!(f, "announced"),
            RunState::Running { block_index } => write!(f, "running({block_index})"),
            RunState::Completed => write!(f, "completed"),
            RunState::Failed { block_index } => write!(f, "failed({block_index})"),
        }
    }
}
