#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;
use topowrangler::{
    InterruptSignal, LockHandle, MemoryTopo, Result, Shard, ShardInfo, ShardKey, TopoError,
    TopoServer,
};

/// Calls seen by a [`RecordingTopo`], in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopoCall {
    Lock(ShardKey),
    Unlock(ShardKey),
    Create(ShardKey),
    Get(ShardKey),
    Update(ShardKey),
}

/// Wraps a [`MemoryTopo`], recording every call and optionally failing
/// releases and record reads.
#[derive(Default)]
pub struct RecordingTopo {
    inner: MemoryTopo,
    calls: Mutex<Vec<TopoCall>>,
    unlock_failure: Mutex<Option<String>>,
    get_failure: Mutex<Option<String>>,
    unlock_payloads: Mutex<Vec<String>>,
}

impl RecordingTopo {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Every following unlock fails with `Store(message)` and leaves the lock held.
    pub fn fail_unlocks_with(&self, message: &str) {
        *self.unlock_failure.lock().unwrap() = Some(message.to_string());
    }

    pub fn fail_gets_with(&self, message: &str) {
        *self.get_failure.lock().unwrap() = Some(message.to_string());
    }

    pub fn calls(&self) -> Vec<TopoCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Payloads handed to unlock calls, whether the store accepted them or not.
    pub fn unlock_payloads(&self) -> Vec<String> {
        self.unlock_payloads.lock().unwrap().clone()
    }

    pub fn inner(&self) -> &MemoryTopo {
        &self.inner
    }

    fn record(&self, call: TopoCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl TopoServer for RecordingTopo {
    async fn lock_shard_for_action(
        &self,
        key: &ShardKey,
        contents: String,
        timeout: Duration,
        interrupt: &InterruptSignal,
    ) -> Result<LockHandle> {
        self.record(TopoCall::Lock(key.clone()));
        self.inner
            .lock_shard_for_action(key, contents, timeout, interrupt)
            .await
    }

    async fn unlock_shard_for_action(
        &self,
        key: &ShardKey,
        lock: &LockHandle,
        results: String,
    ) -> Result<()> {
        self.record(TopoCall::Unlock(key.clone()));
        self.unlock_payloads.lock().unwrap().push(results.clone());
        let failure = self.unlock_failure.lock().unwrap().clone();
        if let Some(message) = failure {
            return Err(TopoError::Store(message));
        }
        self.inner.unlock_shard_for_action(key, lock, results).await
    }

    async fn create_shard(&self, key: &ShardKey, shard: Shard) -> Result<()> {
        self.record(TopoCall::Create(key.clone()));
        self.inner.create_shard(key, shard).await
    }

    async fn get_shard(&self, key: &ShardKey) -> Result<ShardInfo> {
        self.record(TopoCall::Get(key.clone()));
        let failure = self.get_failure.lock().unwrap().clone();
        if let Some(message) = failure {
            return Err(TopoError::Store(message));
        }
        self.inner.get_shard(key).await
    }

    async fn update_shard(&self, info: &ShardInfo) -> Result<ShardInfo> {
        self.record(TopoCall::Update(info.key().clone()));
        self.inner.update_shard(info).await
    }

    async fn shard_lock_contents(&self, key: &ShardKey) -> Result<Option<String>> {
        self.inner.shard_lock_contents(key).await
    }

    async fn shard_action_log(&self, key: &ShardKey) -> Result<Vec<String>> {
        self.inner.shard_action_log(key).await
    }
}
