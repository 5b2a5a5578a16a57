// ============================================================================
// Topology Store
// ============================================================================
//
// The store holding shard records and the per-shard action locks. Anything
// that provides mutual exclusion per key and linearizable record reads and
// writes can implement TopoServer; two implementations ship with the crate:
//
// - MemoryTopo: in-process, for tests and embedding
// - FileTopo:   a directory shared by processes on one host
//
// ============================================================================

pub mod file;
pub mod memory;
pub mod shard;

pub use file::{FileTopo, FileTopoConfig};
pub use memory::MemoryTopo;
pub use shard::{Shard, ShardInfo};

use crate::core::{Result, ShardKey};
use crate::interrupt::InterruptSignal;
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use tokio::time::{Instant, sleep_until};
use uuid::Uuid;

/// Proof of holding a shard's action lock.
///
/// Only the acquisition that produced a handle can release it, and only once;
/// the store rejects anything else.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LockHandle {
    key: ShardKey,
    lock_path: String,
    lock_id: Uuid,
}

impl LockHandle {
    pub fn new(key: ShardKey, lock_path: impl Into<String>) -> Self {
        Self {
            key,
            lock_path: lock_path.into(),
            lock_id: Uuid::new_v4(),
        }
    }

    pub fn key(&self) -> &ShardKey {
        &self.key
    }

    pub fn lock_path(&self) -> &str {
        &self.lock_path
    }

    pub fn lock_id(&self) -> Uuid {
        self.lock_id
    }
}

impl fmt::Display for LockHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.lock_path, self.lock_id)
    }
}

#[async_trait]
pub trait TopoServer: Send + Sync {
    /// Takes the action lock of a shard, storing `contents` as the pending
    /// action.
    ///
    /// Waits while another holder has the lock. Fails with `LockTimeout` once
    /// `timeout` has elapsed and with `LockInterrupted` if `interrupt` fires
    /// first.
    async fn lock_shard_for_action(
        &self,
        key: &ShardKey,
        contents: String,
        timeout: Duration,
        interrupt: &InterruptSignal,
    ) -> Result<LockHandle>;

    /// Releases a lock taken by `lock_shard_for_action`, recording `results`
    /// as the final state of the action.
    async fn unlock_shard_for_action(
        &self,
        key: &ShardKey,
        lock: &LockHandle,
        results: String,
    ) -> Result<()>;

    async fn create_shard(&self, key: &ShardKey, shard: Shard) -> Result<()>;

    async fn get_shard(&self, key: &ShardKey) -> Result<ShardInfo>;

    /// Replaces the whole record; fails if it changed since `info` was read.
    /// Returns the record at its new version.
    async fn update_shard(&self, info: &ShardInfo) -> Result<ShardInfo>;

    /// Payload of the action currently holding the shard lock, if any.
    async fn shard_lock_contents(&self, key: &ShardKey) -> Result<Option<String>>;

    /// Finalized payloads of past actions on the shard, oldest first.
    async fn shard_action_log(&self, key: &ShardKey) -> Result<Vec<String>>;
}

/// Deadline of a lock wait starting now. `None` when `timeout` is too large
/// to represent, which means waiting without a deadline.
pub(crate) fn lock_deadline(timeout: Duration) -> Option<Instant> {
    Instant::now().checked_add(timeout)
}

/// Resolves at `deadline`, or never.
pub(crate) async fn wait_for_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
