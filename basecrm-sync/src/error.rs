//! Error types for the sync layer.

use basecrm_types::AckKey;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur in sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Caller misuse, detected before any network call.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Network error (connection, timeout, body read).
    #[error("network error: {0}")]
    Network(String),

    /// The server answered with a status the protocol does not allow here.
    #[error("unexpected HTTP status {status} from {path}")]
    UnexpectedStatus { status: u16, path: String },

    /// The server refused an acknowledgment batch.
    #[error("ack of {} key(s) was not accepted", keys.len())]
    AckRejected { keys: Vec<AckKey> },

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Identifier validation error.
    #[error(transparent)]
    Types(#[from] basecrm_types::Error),

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl SyncError {
    /// Returns true for errors caused by the caller rather than the server
    /// or the network. These are never worth retrying.
    pub fn is_programmer_error(&self) -> bool {
        matches!(
            self,
            SyncError::InvalidArgument(_) | SyncError::Types(_) | SyncError::Config(_)
        )
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(e: reqwest::Error) -> Self {
        SyncError::Network(e.to_string())
    }
}
