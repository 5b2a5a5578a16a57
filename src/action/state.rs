// ============================================================================
// Action State
// ============================================================================
//
// An action is described while it runs and finalized exactly once when the
// lock guarding it is released.
//
// ============================================================================

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of one guarded action.
///
/// State transitions:
/// ```text
/// Running ──success──> Done
///   │
///   └──failure──> Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionState {
    /// Built and about to run, or running under the shard lock
    Running,

    /// Finished without error
    Done,

    /// Finished with the error recorded next to the state
    Failed,
}

impl ActionState {
    pub fn is_running(&self) -> bool {
        matches!(self, ActionState::Running)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ActionState::Done | ActionState::Failed)
    }
}

impl fmt::Display for ActionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionState::Running => write!(f, "Running"),
            ActionState::Done => write!(f, "Done"),
            ActionState::Failed => write!(f, "Failed"),
        }
    }
}
