// ============================================================================
// topowrangler Library
// ============================================================================
//
// Lock-guarded, audited changes to shard metadata held in a topology store
// shared by many processes.
//
// ============================================================================

pub mod action;
pub mod core;
pub mod interrupt;
pub mod topo;
pub mod wrangler;

pub use action::{ActionKind, ActionNode, ActionState};
pub use crate::core::{KeyRange, Result, ShardKey, TabletAlias, TabletType, TopoError};
pub use interrupt::InterruptSignal;
pub use topo::{FileTopo, FileTopoConfig, LockHandle, MemoryTopo, Shard, ShardInfo, TopoServer};
pub use wrangler::{Wrangler, WranglerConfig};
