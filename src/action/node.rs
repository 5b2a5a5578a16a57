use super::ActionState;
use crate::core::{Result, TabletType, TopoError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// What a guarded action does, with its parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", content = "args")]
pub enum ActionKind {
    /// Replace the tablet types a shard serves.
    SetShardServedTypes { served_types: Vec<TabletType> },
}

impl ActionKind {
    pub fn name(&self) -> &'static str {
        match self {
            ActionKind::SetShardServedTypes { .. } => "SetShardServedTypes",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Audit record of one action taken on a shard.
///
/// The node is attached to the shard lock when the lock is taken, and the
/// finalized node replaces it when the lock is released, so anyone reading
/// the store can tell what is running and how past actions ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionNode {
    action: ActionKind,
    action_guid: String,
    state: ActionState,
    error: String,
    host_name: String,
    user_name: String,
    pid: u32,
    time: DateTime<Utc>,
}

impl ActionNode {
    /// Creates a node in the `Running` state, stamped with who runs it and when.
    pub fn new(action: ActionKind) -> Self {
        Self {
            action,
            action_guid: Uuid::new_v4().to_string(),
            state: ActionState::Running,
            error: String::new(),
            host_name: env_or_unknown(&["HOSTNAME", "COMPUTERNAME"]),
            user_name: env_or_unknown(&["USER", "USERNAME"]),
            pid: std::process::id(),
            time: Utc::now(),
        }
    }

    pub fn set_shard_served_types(served_types: Vec<TabletType>) -> Self {
        Self::new(ActionKind::SetShardServedTypes { served_types })
    }

    pub fn action(&self) -> &ActionKind {
        &self.action
    }

    pub fn action_guid(&self) -> &str {
        &self.action_guid
    }

    pub fn state(&self) -> ActionState {
        self.state
    }

    /// Empty unless the action failed.
    pub fn error(&self) -> &str {
        &self.error
    }

    pub fn host_name(&self) -> &str {
        &self.host_name
    }

    pub fn user_name(&self) -> &str {
        &self.user_name
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn time(&self) -> DateTime<Utc> {
        self.time
    }

    /// Marks the action as finished without error.
    ///
    /// # Errors
    /// Returns `InvalidTransition` if the action was already finalized
    pub fn complete(&mut self) -> Result<()> {
        self.finalize(ActionState::Done, String::new())
    }

    /// Marks the action as failed with the given error text.
    ///
    /// # Errors
    /// Returns `InvalidTransition` if the action was already finalized
    pub fn fail(&mut self, error: impl Into<String>) -> Result<()> {
        self.finalize(ActionState::Failed, error.into())
    }

    fn finalize(&mut self, state: ActionState, error: String) -> Result<()> {
        if !self.state.is_running() {
            return Err(TopoError::InvalidTransition(format!(
                "action {} ({}) is already {}",
                self.action, self.action_guid, self.state
            )));
        }
        self.state = state;
        self.error = error;
        Ok(())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(data: &str) -> Result<Self> {
        Ok(serde_json::from_str(data)?)
    }
}

fn env_or_unknown(names: &[&str]) -> String {
    names
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .find(|value| !value.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}
