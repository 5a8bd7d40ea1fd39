//! Sync records and their metadata.
//!
//! A record is one entry from a queue page: metadata describing what changed
//! plus the raw attribute payload. The payload is only decoded into a typed
//! value when a consumer asks for it.

use crate::AckKey;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Raw record payload, keyed by attribute name.
pub type Attributes = serde_json::Map<String, serde_json::Value>;

/// The declared kind of a record.
///
/// The server may know about kinds this client does not. Those arrive as
/// [`RecordType::Unsupported`] carrying the wire tag, so they can be left
/// unacknowledged for a newer client to pick up.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RecordType {
    Account,
    AssociatedContact,
    Contact,
    Deal,
    DealSource,
    Lead,
    LeadSource,
    LossReason,
    Note,
    Pipeline,
    Source,
    Stage,
    Tag,
    Task,
    User,
    /// A tag this client does not recognize.
    Unsupported(String),
}

impl RecordType {
    /// Every kind this client can decode, in wire-tag order.
    pub const SUPPORTED: [RecordType; 15] = [
        RecordType::Account,
        RecordType::AssociatedContact,
        RecordType::Contact,
        RecordType::Deal,
        RecordType::DealSource,
        RecordType::Lead,
        RecordType::LeadSource,
        RecordType::LossReason,
        RecordType::Note,
        RecordType::Pipeline,
        RecordType::Source,
        RecordType::Stage,
        RecordType::Tag,
        RecordType::Task,
        RecordType::User,
    ];

    /// Returns the wire tag.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            RecordType::Account => "account",
            RecordType::AssociatedContact => "associated_contact",
            RecordType::Contact => "contact",
            RecordType::Deal => "deal",
            RecordType::DealSource => "deal_source",
            RecordType::Lead => "lead",
            RecordType::LeadSource => "lead_source",
            RecordType::LossReason => "loss_reason",
            RecordType::Note => "note",
            RecordType::Pipeline => "pipeline",
            RecordType::Source => "source",
            RecordType::Stage => "stage",
            RecordType::Tag => "tag",
            RecordType::Task => "task",
            RecordType::User => "user",
            RecordType::Unsupported(tag) => tag,
        }
    }

    /// Whether this client knows how to decode the kind.
    #[must_use]
    pub fn is_supported(&self) -> bool {
        !matches!(self, RecordType::Unsupported(_))
    }
}

impl From<String> for RecordType {
    fn from(tag: String) -> Self {
        RecordType::SUPPORTED
            .into_iter()
            .find(|known| known.as_str() == tag)
            .unwrap_or(RecordType::Unsupported(tag))
    }
}

impl From<RecordType> for String {
    fn from(record_type: RecordType) -> Self {
        match record_type {
            RecordType::Unsupported(tag) => tag,
            known => known.as_str().to_string(),
        }
    }
}

impl FromStr for RecordType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(RecordType::from(s.to_string()))
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened to the underlying entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Created,
    Updated,
    Deleted,
    #[default]
    #[serde(other)]
    Unknown,
}

/// Sync bookkeeping attached to every record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncMeta {
    #[serde(default)]
    pub event_type: EventType,
    pub ack_key: AckKey,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<i64>,
}

/// Per-record metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meta {
    #[serde(rename = "type")]
    pub record_type: RecordType,
    pub sync: SyncMeta,
}

impl Meta {
    /// Creates metadata for a record of the given kind.
    pub fn new(record_type: RecordType, event_type: EventType, ack_key: impl Into<String>) -> Self {
        Self {
            record_type,
            sync: SyncMeta {
                event_type,
                ack_key: AckKey::new(ack_key),
                revision: None,
            },
        }
    }

    #[must_use]
    pub fn record_type(&self) -> &RecordType {
        &self.record_type
    }

    #[must_use]
    pub fn event_type(&self) -> EventType {
        self.sync.event_type
    }

    #[must_use]
    pub fn ack_key(&self) -> &AckKey {
        &self.sync.ack_key
    }
}

/// One queue entry: metadata plus the undecoded payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub meta: Meta,
    #[serde(rename = "data", default)]
    pub attributes: Attributes,
}

impl Record {
    pub fn new(meta: Meta, attributes: Attributes) -> Self {
        Self { meta, attributes }
    }

    /// Decodes the payload into a typed value.
    pub fn decode<T: DeserializeOwned>(&self) -> crate::Result<T> {
        let value = serde_json::Value::Object(self.attributes.clone());
        Ok(serde_json::from_value(value)?)
    }
}
