use thiserror::Error;

use crate::training::types::Ability;

/// Errors raised by the training engine, the registry and the record store.
#[derive(Debug, Error)]
pub enum TrainingError {
    /// An ability curve in the configuration is unusable. Fatal at startup.
    #[error("invalid {ability} curve: {reason}")]
    Configuration { ability: Ability, reason: String },

    /// Rejected input (negative effort, implausible movement). Logged and dropped.
    #[error("rejected: {0}")]
    Validation(String),

    /// Wrapper around sled's error type.
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    /// Wrapper around JSON serialization and deserialization errors.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Wrapper around IO errors (directory creation, backups).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A durable write failed even after the backup-and-retry pass.
    #[error("persistence failure: {0}")]
    Persistence(String),

    /// Returned when fetching a record that is not present.
    #[error("record not found: {0}")]
    NotFound(String),
}

impl TrainingError {
    pub fn is_validation(&self) -> bool {
        matches!(self, TrainingError::Validation(_))
    }
}
