//! Entry points for running a sync.
//!
//! A [`SyncClient`] is built in exactly one of two modes, and the mode is fixed by
//! the constructor:
//! - [`SyncClient::with_observers`]: records are decoded and routed to typed
//!   consumers registered on an [`ObserverRegistry`].
//! - [`SyncClient::with_predicate`]: every record is handed, undecoded, to one
//!   predicate.

use crate::dispatch::{ObserverRegistry, RawHandler, RecordHandler};
use crate::error::{SyncError, SyncResult};
use crate::process::{SyncConfig, SyncProcess, SyncReport};
use crate::service::SyncService;
use crate::transport::SyncTransport;
use basecrm_types::{Attributes, DeviceId, Meta};

/// A configured sync client for one device.
pub struct SyncClient<T, H> {
    service: SyncService<T>,
    device_id: DeviceId,
    handler: H,
    config: SyncConfig,
}

impl<T: SyncTransport> SyncClient<T, ObserverRegistry> {
    /// Creates a sync that routes records to typed consumers.
    ///
    /// Fails if no consumer is registered: such a run could never
    /// acknowledge anything. Use [`SyncClient::with_predicate`] for raw access.
    pub fn with_observers(
        service: SyncService<T>,
        device_id: DeviceId,
        observers: ObserverRegistry,
    ) -> SyncResult<Self> {
        if observers.is_empty() {
            return Err(SyncError::InvalidArgument(
                "no observers registered; use SyncClient::with_predicate for raw record access"
                    .to_string(),
            ));
        }
        Ok(Self {
            service,
            device_id,
            handler: observers,
            config: SyncConfig::default(),
        })
    }
}

impl<T, F> SyncClient<T, RawHandler<F>>
where
    T: SyncTransport,
    F: FnMut(&Meta, &Attributes) -> bool + Send,
{
    /// Creates a sync that hands every record to `predicate` without
    /// decoding it. The predicate's result decides the acknowledgment.
    pub fn with_predicate(service: SyncService<T>, device_id: DeviceId, predicate: F) -> Self {
        Self {
            service,
            device_id,
            handler: RawHandler::new(predicate),
            config: SyncConfig::default(),
        }
    }
}

impl<T, H> SyncClient<T, H>
where
    T: SyncTransport,
    H: RecordHandler,
{
    /// Replaces the run configuration.
    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn device_id(&self) -> &DeviceId {
        &self.device_id
    }

    pub fn service(&self) -> &SyncService<T> {
        &self.service
    }

    /// Runs one sync and returns its report.
    pub async fn run(&mut self) -> SyncReport {
        SyncProcess::new(&self.service, &self.device_id, &mut self.handler, &self.config)
            .run()
            .await
    }

    /// Runs one sync. Returns true if every queue was drained and every
    /// acknowledgment accepted.
    pub async fn fetch(&mut self) -> bool {
        self.run().await.is_success()
    }
}
