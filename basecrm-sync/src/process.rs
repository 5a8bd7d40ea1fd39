//! One sync run, from session start to the last acknowledgment.
//!
//! The run is strictly sequential: every protocol call is awaited before the
//! next one is issued. Keys are only sent back for records the handler
//! accepted, so anything skipped, and anything fetched after a failure, is
//! redelivered by the server on the next run.

use crate::dispatch::{Dispatch, RecordHandler};
use crate::error::{SyncError, SyncResult};
use crate::service::SyncService;
use crate::transport::SyncTransport;
use basecrm_types::{AckKey, DeviceId, Queue, Record, SessionId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// When accepted keys are sent back to the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AckMode {
    /// After every page. Bounds redelivery on failure to one page.
    #[default]
    PerPage,
    /// Once, after all queues are drained.
    PerRun,
}

/// Configuration for a sync run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub ack_mode: AckMode,
    /// Client-side ceiling on fetches per queue, applied on top of the
    /// page count the server declares.
    pub max_pages_per_queue: Option<u64>,
}

impl SyncConfig {
    /// Number of fetches allowed for `queue`.
    pub fn page_cap(&self, queue: &Queue) -> u64 {
        match self.max_pages_per_queue {
            Some(max) => queue.page_count().min(max),
            None => queue.page_count(),
        }
    }
}

/// Where a run is, or where it stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    #[default]
    Idle,
    SessionStarted,
    Draining,
    Acking,
    Completed,
    Failed,
}

/// Records left unacknowledged, by reason.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipCounts {
    pub declined: u64,
    pub unsupported_type: u64,
    pub unobserved: u64,
    pub decode_failed: u64,
}

impl SkipCounts {
    pub fn total(&self) -> u64 {
        self.declined + self.unsupported_type + self.unobserved + self.decode_failed
    }
}

/// Summary of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub state: SyncState,
    pub session_id: Option<SessionId>,
    pub pages_fetched: u64,
    pub records_received: u64,
    pub records_acked: u64,
    pub skipped: SkipCounts,
    /// Accepted records whose key had already been scheduled in this run.
    pub duplicates: u64,
    /// Why the run failed, if it did.
    pub error: Option<String>,
}

impl SyncReport {
    /// Whether the run reached [`SyncState::Completed`].
    pub fn is_success(&self) -> bool {
        self.state == SyncState::Completed
    }
}

pub(crate) struct SyncProcess<'a, T, H> {
    service: &'a SyncService<T>,
    device_id: &'a DeviceId,
    handler: &'a mut H,
    config: &'a SyncConfig,
    report: SyncReport,
    scheduled: HashSet<AckKey>,
    pending: Vec<AckKey>,
}

impl<'a, T, H> SyncProcess<'a, T, H>
where
    T: SyncTransport,
    H: RecordHandler,
{
    pub(crate) fn new(
        service: &'a SyncService<T>,
        device_id: &'a DeviceId,
        handler: &'a mut H,
        config: &'a SyncConfig,
    ) -> Self {
        Self {
            service,
            device_id,
            handler,
            config,
            report: SyncReport::default(),
            scheduled: HashSet::new(),
            pending: Vec::new(),
        }
    }

    pub(crate) async fn run(mut self) -> SyncReport {
        info!(device_id = %self.device_id, "Sync run starting");

        match self.drive().await {
            Ok(()) => {
                self.transition(SyncState::Completed);
                info!(
                    pages = self.report.pages_fetched,
                    received = self.report.records_received,
                    acked = self.report.records_acked,
                    skipped = self.report.skipped.total(),
                    "Sync run completed"
                );
            }
            Err(e) => {
                self.transition(SyncState::Failed);
                warn!(
                    error = %e,
                    acked = self.report.records_acked,
                    "Sync run failed"
                );
                self.report.error = Some(e.to_string());
            }
        }

        self.report
    }

    async fn drive(&mut self) -> SyncResult<()> {
        let Some(session) = self.service.start(self.device_id).await? else {
            info!("Nothing to synchronize");
            return Ok(());
        };
        self.transition(SyncState::SessionStarted);
        self.report.session_id = Some(session.id().clone());

        for queue in session.queues() {
            self.drain(session.id(), queue).await?;
        }

        if self.config.ack_mode == AckMode::PerRun {
            self.flush().await?;
        }
        Ok(())
    }

    async fn drain(&mut self, session_id: &SessionId, queue: &Queue) -> SyncResult<()> {
        let cap = self.config.page_cap(queue);
        debug!(queue = queue.name(), cap, total = queue.total_record_count(), "Draining queue");

        let mut fetched = 0;
        while fetched < cap {
            self.transition(SyncState::Draining);
            let Some(records) = self
                .service
                .fetch(self.device_id, session_id, queue.name())
                .await?
            else {
                debug!(queue = queue.name(), fetched, "Queue exhausted");
                break;
            };
            fetched += 1;
            self.report.pages_fetched += 1;

            for record in &records {
                self.consume(record);
            }

            if self.config.ack_mode == AckMode::PerPage {
                self.flush().await?;
            }
        }
        Ok(())
    }

    fn consume(&mut self, record: &Record) {
        self.report.records_received += 1;

        match self.handler.handle(record) {
            Dispatch::Accepted => {
                let key = record.meta.ack_key();
                if self.scheduled.insert(key.clone()) {
                    self.pending.push(key.clone());
                } else {
                    debug!(ack_key = %key, "Ack key already scheduled in this run");
                    self.report.duplicates += 1;
                }
            }
            Dispatch::Declined => self.report.skipped.declined += 1,
            Dispatch::UnsupportedType => self.report.skipped.unsupported_type += 1,
            Dispatch::Unobserved => self.report.skipped.unobserved += 1,
            Dispatch::DecodeFailed => self.report.skipped.decode_failed += 1,
        }
    }

    async fn flush(&mut self) -> SyncResult<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        self.transition(SyncState::Acking);

        let batch = std::mem::take(&mut self.pending);
        if !self.service.ack(self.device_id, &batch).await? {
            return Err(SyncError::AckRejected { keys: batch });
        }
        self.report.records_acked += batch.len() as u64;
        Ok(())
    }

    fn transition(&mut self, next: SyncState) {
        if self.report.state != next {
            debug!(from = ?self.report.state, to = ?next, "Sync state transition");
            self.report.state = next;
        }
    }
}
