//! Sync sessions and queues.

use crate::SessionId;
use serde::{Deserialize, Serialize};

/// One named stream of pending changes, as reported at session start.
///
/// The counts are a snapshot; the server may drain faster or slower than
/// they suggest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Queue {
    name: String,
    pages: u64,
    total_count: u64,
}

impl Queue {
    pub fn new(name: impl Into<String>, pages: u64, total_count: u64) -> Self {
        Self {
            name: name.into(),
            pages,
            total_count,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of fetch calls the server expects are needed to drain the queue.
    #[must_use]
    pub fn page_count(&self) -> u64 {
        self.pages
    }

    #[must_use]
    pub fn total_record_count(&self) -> u64 {
        self.total_count
    }
}

/// A negotiated sync session, valid for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    id: SessionId,
    queues: Vec<Queue>,
}

impl Session {
    pub fn new(id: SessionId, queues: Vec<Queue>) -> Self {
        Self { id, queues }
    }

    #[must_use]
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Queues in the order the server returned them.
    #[must_use]
    pub fn queues(&self) -> &[Queue] {
        &self.queues
    }

    /// Looks up a queue by name.
    pub fn queue(&self, name: &str) -> Option<&Queue> {
        self.queues.iter().find(|q| q.name == name)
    }

    /// Total records pending across all queues, saturating at `u64::MAX`.
    #[must_use]
    pub fn total_record_count(&self) -> u64 {
        self.queues
            .iter()
            .map(Queue::total_record_count)
            .fold(0, u64::saturating_add)
    }
}
