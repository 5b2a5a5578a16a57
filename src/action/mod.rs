// ============================================================================
// Action Module
// ============================================================================
//
// Describes the actions taken under a shard lock. An ActionNode is written to
// the store as the lock payload when the lock is taken and again, finalized,
// when the lock is released.
//
// ============================================================================

pub mod node;
pub mod state;

pub use node::{ActionKind, ActionNode};
pub use state::ActionState;
