//! Core type definitions for the Base CRM sync protocol.
//!
//! This crate defines the plain data carried by a sync run:
//! - Device, session and acknowledgment identifiers
//! - Sessions and the queues they expose
//! - Record metadata (type tag, event type, ack key) and raw records
//! - The typed domain values records decode into
//!
//! Nothing here performs I/O; the protocol client and orchestrator live in
//! `basecrm-sync`.

pub mod entities;
mod ids;
mod record;
mod session;

pub use ids::{AckKey, DeviceId, SessionId};
pub use record::{Attributes, EventType, Meta, Record, RecordType, SyncMeta};
pub use session::{Queue, Session};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("device identifier must not be blank")]
    InvalidDeviceId,

    #[error("session identifier must not be blank")]
    InvalidSessionId,

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
