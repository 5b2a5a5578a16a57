use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TopoError {
    #[error("Timed out acquiring lock on {0}")]
    LockTimeout(String),

    #[error("Interrupted while acquiring lock on {0}")]
    LockInterrupted(String),

    #[error("Topology store error: {0}")]
    Store(String),

    #[error("Record not found: {0}")]
    RecordNotFound(String),

    #[error("Record already exists: {0}")]
    NodeExists(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid action state transition: {0}")]
    InvalidTransition(String),
}

pub type Result<T> = std::result::Result<T, TopoError>;

impl From<serde_json::Error> for TopoError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for TopoError {
    fn from(err: std::io::Error) -> Self {
        Self::Store(err.to_string())
    }
}
