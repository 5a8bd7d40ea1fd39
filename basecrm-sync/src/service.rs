//! Protocol client for the sync API.
//!
//! Three calls, each a pure translation between domain values and the wire:
//! start a session, fetch the next page of a queue, acknowledge a batch of
//! consumed records.

use crate::error::{SyncError, SyncResult};
use crate::transport::{Method, SyncTransport, TransportRequest, TransportResponse};
use basecrm_types::{AckKey, DeviceId, Queue, Record, Session, SessionId};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Header carrying the device identifier on every call.
pub const DEVICE_HEADER: &str = "X-Basecrm-Device-UUID";

/// The queue the API currently exposes for change records.
pub const MAIN_QUEUE: &str = "main";

const STATUS_ACCEPTED: u16 = 202;
const STATUS_NO_CONTENT: u16 = 204;

// ── Wire shapes ─────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct SessionData {
    id: Option<SessionId>,
    #[serde(default)]
    queues: Vec<Envelope<QueueData>>,
}

#[derive(Debug, Deserialize)]
struct QueueData {
    name: String,
    #[serde(default)]
    pages: u64,
    #[serde(default)]
    total_count: u64,
}

#[derive(Debug, Deserialize)]
struct QueuePage {
    items: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Serialize)]
struct AckRequest<'a> {
    ack_keys: &'a [AckKey],
}

/// Client for the `/sync` endpoints.
pub struct SyncService<T> {
    transport: T,
}

impl<T: SyncTransport> SyncService<T> {
    /// Creates a client over the given transport.
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Returns the underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Starts a sync session.
    ///
    /// Returns `None` when the server has nothing to synchronize.
    pub async fn start(&self, device_id: &DeviceId) -> SyncResult<Option<Session>> {
        let path = "/sync/start";
        let response = self
            .send(TransportRequest::new(Method::Post, path), device_id)
            .await?;

        if response.status == STATUS_NO_CONTENT {
            debug!("Nothing to synchronize");
            return Ok(None);
        }
        expect_success(&response, path)?;

        if response.body.trim().is_empty() {
            warn!(status = response.status, "Empty body returned from sync start");
            return Ok(None);
        }

        let envelope: Envelope<SessionData> = serde_json::from_str(&response.body)?;
        let Some(data) = envelope.data else {
            warn!(status = response.status, "Session data missing in sync start response");
            return Ok(None);
        };
        let Some(id) = data.id else {
            warn!(status = response.status, "Session id missing in sync start response");
            return Ok(None);
        };

        let queues = data
            .queues
            .into_iter()
            .filter_map(|q| match q.data {
                Some(q) => Some(Queue::new(q.name, q.pages, q.total_count)),
                None => {
                    warn!("Skipping queue entry without data");
                    None
                }
            })
            .collect();

        let session = Session::new(id, queues);
        debug!(
            session_id = %session.id(),
            queues = session.queues().len(),
            total = session.total_record_count(),
            "Sync session started"
        );
        Ok(Some(session))
    }

    /// Fetches the next page of `queue`.
    ///
    /// Returns `None` once the queue has nothing further for now.
    pub async fn fetch(
        &self,
        device_id: &DeviceId,
        session_id: &SessionId,
        queue: &str,
    ) -> SyncResult<Option<Vec<Record>>> {
        if queue.trim().is_empty() {
            return Err(SyncError::InvalidArgument(
                "queue name must not be empty".to_string(),
            ));
        }

        let path = format!(
            "/sync/{}/queues/{}",
            urlencoding::encode(session_id.as_str()),
            urlencoding::encode(queue)
        );
        let response = self
            .send(TransportRequest::new(Method::Get, path.as_str()), device_id)
            .await?;

        // nothing new to synchronize
        if response.status == STATUS_NO_CONTENT {
            return Ok(None);
        }
        expect_success(&response, &path)?;

        let items = if response.body.trim().is_empty() {
            None
        } else {
            serde_json::from_str::<Option<QueuePage>>(&response.body)?.and_then(|page| page.items)
        };

        let Some(items) = items else {
            warn!(
                status = response.status,
                "Items missing in response or empty body returned from sync"
            );
            return Ok(Some(Vec::new()));
        };
        if items.is_empty() {
            warn!(status = response.status, "Empty item collection returned from sync");
        }

        let records = items
            .into_iter()
            .filter_map(|item| match serde_json::from_value::<Record>(item) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(error = %e, "Dropping malformed sync item");
                    None
                }
            })
            .collect();
        Ok(Some(records))
    }

    /// Acknowledges consumed records.
    ///
    /// An empty batch succeeds without a network call. Returns `false` when
    /// the server does not accept the batch.
    pub async fn ack(&self, device_id: &DeviceId, ack_keys: &[AckKey]) -> SyncResult<bool> {
        if ack_keys.is_empty() {
            return Ok(true);
        }

        let body = serde_json::to_string(&AckRequest { ack_keys })?;
        let response = self
            .send(
                TransportRequest::new(Method::Post, "/sync/ack").with_body(body),
                device_id,
            )
            .await?;

        let acked = response.status == STATUS_ACCEPTED;
        if !acked {
            warn!(status = response.status, keys = ack_keys.len(), "Failed to ack");
        }
        Ok(acked)
    }

    async fn send(
        &self,
        request: TransportRequest,
        device_id: &DeviceId,
    ) -> SyncResult<TransportResponse> {
        self.transport
            .request(request.with_header(DEVICE_HEADER, device_id.as_str()))
            .await
    }
}

fn expect_success(response: &TransportResponse, path: &str) -> SyncResult<()> {
    if response.is_success() {
        Ok(())
    } else {
        Err(SyncError::UnexpectedStatus {
            status: response.status,
            path: path.to_string(),
        })
    }
}
