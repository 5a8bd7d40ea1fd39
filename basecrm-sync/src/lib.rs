//! Incremental sync engine for the Base CRM sync API.
//!
//! Pulls changed records from the server, decodes them into typed values,
//! hands them to caller-supplied consumers and acknowledges only what the
//! consumers accepted. Delivery is at-least-once: anything not acknowledged
//! is redelivered on the next run, so consumers must be idempotent.
//!
//! ## Components
//!
//! - **Transport**: one request/response exchange ([`SyncTransport`]);
//!   [`HttpTransport`] is the bundled reqwest implementation
//! - **Service**: the three protocol calls ([`SyncService`])
//! - **Dispatch**: type-based routing to consumers ([`ObserverRegistry`],
//!   [`RawHandler`])
//! - **Process**: the run loop: start, drain queues page by page, ack
//!
//! # Example
//!
//! ```no_run
//! use basecrm_sync::{HttpConfig, HttpTransport, ObserverRegistry, SyncClient, SyncService};
//! use basecrm_types::entities::{Contact, Deal};
//! use basecrm_types::DeviceId;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = HttpTransport::new(HttpConfig {
//!     access_token: Some("<token>".to_string()),
//!     ..Default::default()
//! })?;
//! let observers = ObserverRegistry::new()
//!     .subscribe(|contact: Contact| {
//!         println!("contact {}", contact.id);
//!         true
//!     })
//!     .subscribe(|deal: Deal| {
//!         println!("deal {}", deal.id);
//!         true
//!     });
//!
//! let mut sync = SyncClient::with_observers(
//!     SyncService::new(transport),
//!     DeviceId::new("6a5f4c2e-1b2d-4c8e-9f00-123456789abc")?,
//!     observers,
//! )?;
//! let ok = sync.fetch().await;
//! # let _ = ok;
//! # Ok(())
//! # }
//! ```

mod dispatch;
mod error;
mod http;
mod process;
mod service;
mod sync;
pub mod transport;

pub use dispatch::{Consumer, Dispatch, ObserverRegistry, RawHandler, RecordHandler, SyncEntity};
pub use error::{SyncError, SyncResult};
pub use http::{HttpConfig, HttpTransport};
pub use process::{AckMode, SkipCounts, SyncConfig, SyncReport, SyncState};
pub use service::{DEVICE_HEADER, MAIN_QUEUE, SyncService};
pub use sync::SyncClient;
pub use transport::{Method, SyncTransport, TransportRequest, TransportResponse};
