use super::{LockHandle, Shard, ShardInfo, TopoServer, lock_deadline, wait_for_deadline};
use crate::core::{Result, ShardKey, TopoError};
use crate::interrupt::InterruptSignal;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};
use uuid::Uuid;

struct HeldLock {
    lock_id: Uuid,
    contents: String,
}

#[derive(Default)]
struct ShardEntry {
    record: Option<(u64, Shard)>,
    lock: Option<HeldLock>,
    action_log: Vec<String>,
}

/// Topology store living in process memory.
///
/// Every shard's record, lock and action log sit behind one async mutex.
/// Waiters for a busy lock park on a `Notify` that is pulsed on each release.
#[derive(Default)]
pub struct MemoryTopo {
    shards: Mutex<HashMap<ShardKey, ShardEntry>>,
    released: Notify,
}

impl MemoryTopo {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_path(key: &ShardKey) -> String {
        format!("/keyspaces/{}/shards/{}/action", key.keyspace, key.shard)
    }
}

#[async_trait]
impl TopoServer for MemoryTopo {
    async fn lock_shard_for_action(
        &self,
        key: &ShardKey,
        contents: String,
        timeout: Duration,
        interrupt: &InterruptSignal,
    ) -> Result<LockHandle> {
        key.validate()?;
        let deadline = lock_deadline(timeout);

        loop {
            if interrupt.is_interrupted() {
                return Err(TopoError::LockInterrupted(key.to_string()));
            }

            // Register for the wakeup before looking, so a release between the
            // check and the wait is not lost.
            let released = self.released.notified();
            tokio::pin!(released);
            released.as_mut().enable();

            {
                let mut shards = self.shards.lock().await;
                let entry = shards.entry(key.clone()).or_default();
                if entry.lock.is_none() {
                    let handle = LockHandle::new(key.clone(), Self::lock_path(key));
                    entry.lock = Some(HeldLock {
                        lock_id: handle.lock_id(),
                        contents,
                    });
                    return Ok(handle);
                }
            }

            tokio::select! {
                _ = &mut released => {}
                _ = wait_for_deadline(deadline) => {
                    return Err(TopoError::LockTimeout(key.to_string()));
                }
                _ = interrupt.interrupted() => {
                    return Err(TopoError::LockInterrupted(key.to_string()));
                }
            }
        }
    }

    async fn unlock_shard_for_action(
        &self,
        key: &ShardKey,
        lock: &LockHandle,
        results: String,
    ) -> Result<()> {
        {
            let mut shards = self.shards.lock().await;
            let entry = shards
                .get_mut(key)
                .filter(|entry| {
                    lock.key() == key
                        && entry
                            .lock
                            .as_ref()
                            .is_some_and(|held| held.lock_id == lock.lock_id())
                })
                .ok_or_else(|| {
                    TopoError::Store(format!("lock {} is not held on {}", lock, key))
                })?;
            entry.lock = None;
            entry.action_log.push(results);
        }
        self.released.notify_waiters();
        Ok(())
    }

    async fn create_shard(&self, key: &ShardKey, shard: Shard) -> Result<()> {
        key.validate()?;
        let mut shards = self.shards.lock().await;
        let entry = shards.entry(key.clone()).or_default();
        if entry.record.is_some() {
            return Err(TopoError::NodeExists(key.to_string()));
        }
        entry.record = Some((1, shard));
        Ok(())
    }

    async fn get_shard(&self, key: &ShardKey) -> Result<ShardInfo> {
        let shards = self.shards.lock().await;
        shards
            .get(key)
            .and_then(|entry| entry.record.as_ref())
            .map(|(version, shard)| ShardInfo::new(key.clone(), *version, shard.clone()))
            .ok_or_else(|| TopoError::RecordNotFound(key.to_string()))
    }

    async fn update_shard(&self, info: &ShardInfo) -> Result<ShardInfo> {
        let mut shards = self.shards.lock().await;
        let (version, shard) = shards
            .get_mut(info.key())
            .and_then(|entry| entry.record.as_mut())
            .ok_or_else(|| TopoError::RecordNotFound(info.key().to_string()))?;

        if *version != info.version() {
            return Err(TopoError::Store(format!(
                "bad version updating {}: stored {}, given {}",
                info.key(),
                version,
                info.version()
            )));
        }

        *version += 1;
        *shard = info.shard.clone();
        Ok(ShardInfo::new(info.key().clone(), *version, shard.clone()))
    }

    async fn shard_lock_contents(&self, key: &ShardKey) -> Result<Option<String>> {
        let shards = self.shards.lock().await;
        Ok(shards
            .get(key)
            .and_then(|entry| entry.lock.as_ref())
            .map(|held| held.contents.clone()))
    }

    async fn shard_action_log(&self, key: &ShardKey) -> Result<Vec<String>> {
        let shards = self.shards.lock().await;
        Ok(shards
            .get(key)
            .map(|entry| entry.action_log.clone())
            .unwrap_or_default())
    }
}
