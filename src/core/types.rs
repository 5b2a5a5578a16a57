use super::{Result, TopoError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifies one shard of one keyspace.
///
/// Displayed and parsed as `keyspace/shard`, which is also the name of the
/// lock guarding the shard record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ShardKey {
    pub keyspace: String,
    pub shard: String,
}

impl ShardKey {
    pub fn new(keyspace: impl Into<String>, shard: impl Into<String>) -> Self {
        Self {
            keyspace: keyspace.into(),
            shard: shard.into(),
        }
    }

    /// Rejects empty identifiers and identifiers that would break the
    /// `keyspace/shard` naming.
    pub fn validate(&self) -> Result<()> {
        for (what, value) in [("keyspace", &self.keyspace), ("shard", &self.shard)] {
            if value.trim().is_empty() {
                return Err(TopoError::InvalidArgument(format!(
                    "{} must not be empty",
                    what
                )));
            }
            if value.contains('/') || value == "." || value == ".." {
                return Err(TopoError::InvalidArgument(format!(
                    "{} '{}' is not a valid name",
                    what, value
                )));
            }
        }
        Ok(())
    }

    /// Builds and validates a key in one step.
    pub fn checked(keyspace: &str, shard: &str) -> Result<Self> {
        let key = Self::new(keyspace, shard);
        key.validate()?;
        Ok(key)
    }
}

impl fmt::Display for ShardKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.keyspace, self.shard)
    }
}

impl FromStr for ShardKey {
    type Err = TopoError;

    fn from_str(s: &str) -> Result<Self> {
        let (keyspace, shard) = s.split_once('/').ok_or_else(|| {
            TopoError::InvalidArgument(format!("'{}' is not of the form keyspace/shard", s))
        })?;
        Self::checked(keyspace, shard)
    }
}

/// The role a tablet plays, and therefore the kind of queries a shard serves
/// through it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TabletType {
    Idle,
    Master,
    Replica,
    Rdonly,
    Batch,
    Spare,
    Experimental,
    SchemaUpgrade,
    Backup,
    Restore,
    Checker,
    Lag,
    LagOrphan,
    Scrap,
}

impl TabletType {
    pub const ALL: [TabletType; 14] = [
        TabletType::Idle,
        TabletType::Master,
        TabletType::Replica,
        TabletType::Rdonly,
        TabletType::Batch,
        TabletType::Spare,
        TabletType::Experimental,
        TabletType::SchemaUpgrade,
        TabletType::Backup,
        TabletType::Restore,
        TabletType::Checker,
        TabletType::Lag,
        TabletType::LagOrphan,
        TabletType::Scrap,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TabletType::Idle => "IDLE",
            TabletType::Master => "MASTER",
            TabletType::Replica => "REPLICA",
            TabletType::Rdonly => "RDONLY",
            TabletType::Batch => "BATCH",
            TabletType::Spare => "SPARE",
            TabletType::Experimental => "EXPERIMENTAL",
            TabletType::SchemaUpgrade => "SCHEMA_UPGRADE",
            TabletType::Backup => "BACKUP",
            TabletType::Restore => "RESTORE",
            TabletType::Checker => "CHECKER",
            TabletType::Lag => "LAG",
            TabletType::LagOrphan => "LAG_ORPHAN",
            TabletType::Scrap => "SCRAP",
        }
    }
}

impl fmt::Display for TabletType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TabletType {
    type Err = TopoError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_uppercase();
        TabletType::ALL
            .into_iter()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| TopoError::InvalidArgument(format!("unknown tablet type '{}'", s)))
    }
}

/// Globally unique tablet name: the cell it lives in plus a numeric id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TabletAlias {
    pub cell: String,
    pub uid: u32,
}

impl TabletAlias {
    pub fn new(cell: impl Into<String>, uid: u32) -> Self {
        Self {
            cell: cell.into(),
            uid,
        }
    }
}

impl fmt::Display for TabletAlias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:010}", self.cell, self.uid)
    }
}

/// Hex-encoded half-open range of keyspace ids covered by a shard.
/// Empty bounds mean unbounded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyRange {
    pub start: String,
    pub end: String,
}

impl KeyRange {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }
}

impl fmt::Display for KeyRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}
