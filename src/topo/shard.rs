use crate::core::{KeyRange, ShardKey, TabletAlias, TabletType};
use serde::{Deserialize, Serialize};

/// Shard record as stored in the topology store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shard {
    /// Tablet currently acting as master, if one was elected
    pub master_alias: Option<TabletAlias>,

    /// Tablet types this shard serves queries through
    pub served_types: Vec<TabletType>,

    pub key_range: KeyRange,

    /// Shards this one is being filled from during a resharding
    pub source_shards: Vec<ShardKey>,
}

impl Shard {
    pub fn with_served_types(served_types: Vec<TabletType>) -> Self {
        Self {
            served_types,
            ..Self::default()
        }
    }
}

/// A shard record together with the store version it was read at.
///
/// The store refuses an update whose version no longer matches, so a record
/// read before someone else's write cannot silently overwrite it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardInfo {
    key: ShardKey,
    version: u64,
    pub shard: Shard,
}

impl ShardInfo {
    pub fn new(key: ShardKey, version: u64, shard: Shard) -> Self {
        Self {
            key,
            version,
            shard,
        }
    }

    pub fn key(&self) -> &ShardKey {
        &self.key
    }

    pub fn version(&self) -> u64 {
        self.version
    }
}
