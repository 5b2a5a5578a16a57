use super::Wrangler;
use crate::action::ActionNode;
use crate::core::{Result, ShardKey, TopoError};
use crate::topo::LockHandle;
use log::{info, warn};
use std::fmt::Display;
use std::future::Future;
use tracing::{Instrument, info_span};

impl Wrangler {
    /// Takes the action lock of `keyspace/shard`, publishing `node` as the
    /// action in progress.
    pub async fn lock_shard(
        &self,
        keyspace: &str,
        shard: &str,
        node: &ActionNode,
    ) -> Result<LockHandle> {
        let key = ShardKey::checked(keyspace, shard)?;
        if !node.state().is_running() {
            return Err(TopoError::InvalidTransition(format!(
                "cannot lock {} for action {} ({}): it is already {}",
                key,
                node.action(),
                node.action_guid(),
                node.state()
            )));
        }
        info!("Locking shard {} for action {}", key, node.action());
        let contents = node.to_json()?;
        self.ts
            .lock_shard_for_action(&key, contents, self.config.lock_timeout, &self.interrupt)
            .await
    }

    /// Finalizes `node` from `result` and releases the lock.
    ///
    /// The release is attempted exactly once. If `node` was already
    /// finalized, it is written back unchanged and `InvalidTransition` counts
    /// as the release failure.
    ///
    /// When `result` is an error it is returned as is, whatever happens to the
    /// release; a failed release is only logged in that case. When `result`
    /// is a success, a failed release becomes the returned error.
    pub async fn unlock_shard<T, E>(
        &self,
        keyspace: &str,
        shard: &str,
        node: &mut ActionNode,
        lock: &LockHandle,
        result: std::result::Result<T, E>,
    ) -> std::result::Result<T, E>
    where
        E: From<TopoError> + Display,
    {
        let finalized = match &result {
            Err(err) => {
                info!(
                    "Unlocking shard {}/{} for action {} with error {}",
                    keyspace,
                    shard,
                    node.action(),
                    err
                );
                node.fail(err.to_string())
            }
            Ok(_) => {
                info!(
                    "Unlocking shard {}/{} for successful action {}",
                    keyspace,
                    shard,
                    node.action()
                );
                node.complete()
            }
        };

        // The lock is released even when the node refuses to finalize.
        let released = self.release_shard(keyspace, shard, node, lock).await;
        let released = finalized.and(released);

        match result {
            Err(action_error) => {
                if let Err(err) = released {
                    warn!(
                        "Unlocking shard {}/{} failed, reporting the action error instead: {}",
                        keyspace, shard, err
                    );
                }
                Err(action_error)
            }
            Ok(value) => released.map(|()| value).map_err(E::from),
        }
    }

    async fn release_shard(
        &self,
        keyspace: &str,
        shard: &str,
        node: &ActionNode,
        lock: &LockHandle,
    ) -> Result<()> {
        let key = ShardKey::checked(keyspace, shard)?;
        let results = node.to_json()?;
        self.ts.unlock_shard_for_action(&key, lock, results).await
    }

    /// Runs `mutation` while holding the action lock of `keyspace/shard`.
    ///
    /// If the lock cannot be taken the mutation never runs. Otherwise the lock
    /// is always released, with `node` finalized from the mutation's outcome.
    pub async fn run_guarded<T, E, F, Fut>(
        &self,
        keyspace: &str,
        shard: &str,
        node: &mut ActionNode,
        mutation: F,
    ) -> std::result::Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: From<TopoError> + Display,
    {
        let span = info_span!(
            "guarded_action",
            keyspace,
            shard,
            action = node.action().name(),
            guid = node.action_guid()
        );

        async move {
            let lock = self.lock_shard(keyspace, shard, node).await?;
            let result = mutation().await;
            self.unlock_shard(keyspace, shard, node, &lock, result).await
        }
        .instrument(span)
        .await
    }
}
