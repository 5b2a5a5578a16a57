//! Directory-backed topology store.
//!
//! Layout under the configured root:
//!
//! ```text
//! keyspaces/<keyspace>/shards/<shard>/Shard.json          versioned shard record
//! keyspaces/<keyspace>/shards/<shard>/Shard.json.update   present while a record update runs
//! keyspaces/<keyspace>/shards/<shard>/action.lock         held lock + pending action
//! keyspaces/<keyspace>/shards/<shard>/actionlog/          finalized actions
//! ```
//!
//! Files that must appear atomically are written to a temporary name and then
//! hard-linked (create-if-absent) or renamed (replace) into place, so several
//! processes on one host can share a root.

use super::{LockHandle, Shard, ShardInfo, TopoServer, lock_deadline, wait_for_deadline};
use crate::core::{Result, ShardKey, TopoError};
use crate::interrupt::InterruptSignal;
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tokio::time::sleep;
use uuid::Uuid;

const SHARD_FILE: &str = "Shard.json";
const LOCK_FILE: &str = "action.lock";
const UPDATE_MARKER: &str = "Shard.json.update";
const ACTION_LOG_DIR: &str = "actionlog";

/// Configuration of a [`FileTopo`].
#[derive(Debug, Clone)]
pub struct FileTopoConfig {
    /// Directory holding the whole topology
    pub root: PathBuf,

    /// How often a waiter re-checks a busy lock
    pub poll_interval: Duration,
}

impl FileTopoConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            poll_interval: Duration::from_millis(50),
        }
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.root.as_os_str().is_empty() {
            return Err(TopoError::InvalidArgument(
                "topology root must not be empty".to_string(),
            ));
        }
        if self.poll_interval.is_zero() {
            return Err(TopoError::InvalidArgument(
                "poll interval must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
struct LockFile {
    lock_id: Uuid,
    contents: String,
}

#[derive(Serialize, Deserialize)]
struct ShardFile {
    version: u64,
    shard: Shard,
}

pub struct FileTopo {
    config: FileTopoConfig,
}

impl FileTopo {
    pub fn new(config: FileTopoConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn root(&self) -> &Path {
        &self.config.root
    }

    fn shard_dir(&self, key: &ShardKey) -> PathBuf {
        self.config
            .root
            .join("keyspaces")
            .join(&key.keyspace)
            .join("shards")
            .join(&key.shard)
    }

    async fn read_lock_file(&self, key: &ShardKey) -> Result<Option<LockFile>> {
        let path = self.shard_dir(key).join(LOCK_FILE);
        match fs::read_to_string(&path).await {
            Ok(data) => Ok(Some(serde_json::from_str(&data)?)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(io_error("read", &path, err)),
        }
    }

    async fn read_shard_file(&self, key: &ShardKey) -> Result<ShardFile> {
        key.validate()?;
        let path = self.shard_dir(key).join(SHARD_FILE);
        match fs::read_to_string(&path).await {
            Ok(data) => Ok(serde_json::from_str(&data)?),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                Err(TopoError::RecordNotFound(key.to_string()))
            }
            Err(err) => Err(io_error("read", &path, err)),
        }
    }

    /// Version check and replace of `Shard.json`; the caller holds the
    /// update marker.
    async fn write_next_version(&self, info: &ShardInfo) -> Result<ShardInfo> {
        let stored = self.read_shard_file(info.key()).await?;
        if stored.version != info.version() {
            return Err(TopoError::Store(format!(
                "bad version updating {}: stored {}, given {}",
                info.key(),
                stored.version,
                info.version()
            )));
        }

        let next = ShardFile {
            version: stored.version + 1,
            shard: info.shard.clone(),
        };
        let path = self.shard_dir(info.key()).join(SHARD_FILE);
        atomic_write(&path, &serde_json::to_vec_pretty(&next)?).await?;
        Ok(ShardInfo::new(info.key().clone(), next.version, next.shard))
    }
}

#[async_trait]
impl TopoServer for FileTopo {
    async fn lock_shard_for_action(
        &self,
        key: &ShardKey,
        contents: String,
        timeout: Duration,
        interrupt: &InterruptSignal,
    ) -> Result<LockHandle> {
        key.validate()?;
        let deadline = lock_deadline(timeout);
        let dir = self.shard_dir(key);
        let lock_path = dir.join(LOCK_FILE);
        create_dir_all(&dir).await?;

        let handle = LockHandle::new(key.clone(), lock_path.display().to_string());
        let payload = serde_json::to_vec(&LockFile {
            lock_id: handle.lock_id(),
            contents,
        })?;

        loop {
            if interrupt.is_interrupted() {
                return Err(TopoError::LockInterrupted(key.to_string()));
            }
            if create_exclusive(&lock_path, &payload).await? {
                return Ok(handle);
            }

            tokio::select! {
                _ = sleep(self.config.poll_interval) => {}
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
        key.validate()?;
        let held = self.read_lock_file(key).await?;
        if lock.key() != key || !held.is_some_and(|held| held.lock_id == lock.lock_id()) {
            return Err(TopoError::Store(format!(
                "lock {} is not held on {}",
                lock, key
            )));
        }

        let dir = self.shard_dir(key);
        let entry = dir.join(ACTION_LOG_DIR).join(format!(
            "{}-{}.json",
            Utc::now().format("%Y%m%dT%H%M%S%.6fZ"),
            lock.lock_id()
        ));
        atomic_write(&entry, results.as_bytes()).await?;

        let lock_path = dir.join(LOCK_FILE);
        fs::remove_file(&lock_path)
            .await
            .map_err(|err| io_error("remove", &lock_path, err))
    }

    async fn create_shard(&self, key: &ShardKey, shard: Shard) -> Result<()> {
        key.validate()?;
        let dir = self.shard_dir(key);
        create_dir_all(&dir).await?;
        let payload = serde_json::to_vec_pretty(&ShardFile { version: 1, shard })?;
        if create_exclusive(&dir.join(SHARD_FILE), &payload).await? {
            Ok(())
        } else {
            Err(TopoError::NodeExists(key.to_string()))
        }
    }

    async fn get_shard(&self, key: &ShardKey) -> Result<ShardInfo> {
        let stored = self.read_shard_file(key).await?;
        Ok(ShardInfo::new(key.clone(), stored.version, stored.shard))
    }

    async fn update_shard(&self, info: &ShardInfo) -> Result<ShardInfo> {
        let key = info.key();
        key.validate()?;
        let dir = self.shard_dir(key);
        create_dir_all(&dir).await?;

        // Writers serialize on the marker so the version check and the write
        // happen as one step. Losing the race is a conflict like a stale version.
        let marker = dir.join(UPDATE_MARKER);
        if !create_exclusive(&marker, info.version().to_string().as_bytes()).await? {
            return Err(TopoError::Store(format!(
                "concurrent update of {} at version {}",
                key,
                info.version()
            )));
        }

        let updated = self.write_next_version(info).await;
        let removed = fs::remove_file(&marker)
            .await
            .map_err(|err| io_error("remove", &marker, err));
        let updated = updated?;
        removed?;
        Ok(updated)
    }

    async fn shard_lock_contents(&self, key: &ShardKey) -> Result<Option<String>> {
        key.validate()?;
        Ok(self.read_lock_file(key).await?.map(|held| held.contents))
    }

    async fn shard_action_log(&self, key: &ShardKey) -> Result<Vec<String>> {
        key.validate()?;
        let dir = self.shard_dir(key).join(ACTION_LOG_DIR);
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(io_error("list", &dir, err)),
        };

        let mut paths = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|err| io_error("list", &dir, err))?
        {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut log = Vec::with_capacity(paths.len());
        for path in paths {
            log.push(
                fs::read_to_string(&path)
                    .await
                    .map_err(|err| io_error("read", &path, err))?,
            );
        }
        Ok(log)
    }
}

fn io_error(op: &str, path: &Path, err: std::io::Error) -> TopoError {
    TopoError::Store(format!("Failed to {} '{}': {}", op, path.display(), err))
}

fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.{}.tmp", name, Uuid::new_v4()))
}

async fn create_dir_all(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)
        .await
        .map_err(|err| io_error("create directory", dir, err))
}

/// Replaces `path` with `bytes` in one step.
async fn atomic_write(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        create_dir_all(parent).await?;
    }

    let tmp = temp_path(path);
    fs::write(&tmp, bytes)
        .await
        .map_err(|err| io_error("write temp file", &tmp, err))?;

    if let Err(err) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(io_error("rename temp file onto", path, err));
    }
    Ok(())
}

/// Creates `path` holding `bytes` unless it already exists.
/// Returns false when it does.
async fn create_exclusive(path: &Path, bytes: &[u8]) -> Result<bool> {
    let tmp = temp_path(path);
    fs::write(&tmp, bytes)
        .await
        .map_err(|err| io_error("write temp file", &tmp, err))?;

    let linked = fs::hard_link(&tmp, path).await;
    let _ = fs::remove_file(&tmp).await;
    match linked {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == ErrorKind::AlreadyExists => Ok(false),
        Err(err) => Err(io_error("link", path, err)),
    }
}
