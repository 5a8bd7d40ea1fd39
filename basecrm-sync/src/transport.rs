//! Transport layer abstraction.
//!
//! The protocol client only ever needs one request/response exchange at a
//! time. Anything that can perform that exchange (the bundled reqwest
//! transport, an application's own HTTP stack, a test double) can drive a
//! sync run.

use crate::error::SyncResult;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// HTTP methods used by the sync protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => f.write_str("GET"),
            Method::Post => f.write_str("POST"),
        }
    }
}

/// A single outgoing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportRequest {
    pub method: Method,
    /// Path relative to the API base, starting with `/`.
    pub path: String,
    pub headers: Vec<(String, String)>,
    /// JSON body, if any.
    pub body: Option<String>,
}

impl TransportRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Returns the first header with the given name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// The raw result of an exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// A body-less response.
    pub fn empty(status: u16) -> Self {
        Self::new(status, String::new())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Performs one request/response exchange with the sync API.
///
/// Timeouts and cancellation belong to the implementation; they should
/// surface as [`SyncError::Network`](crate::SyncError::Network).
#[async_trait]
pub trait SyncTransport: Send + Sync {
    async fn request(&self, request: TransportRequest) -> SyncResult<TransportResponse>;
}

#[async_trait]
impl<T: SyncTransport + ?Sized> SyncTransport for Arc<T> {
    async fn request(&self, request: TransportRequest) -> SyncResult<TransportResponse> {
        (**self).request(request).await
    }
}

/// A scripted transport for testing.
pub mod mock {
    use super::*;
    use crate::error::SyncError;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    enum Scripted {
        Respond(TransportResponse),
        Fail(String),
    }

    /// Replays scripted responses per `(method, path)` and records every
    /// request it receives. Clones share the same script and log.
    #[derive(Clone, Default)]
    pub struct MockTransport {
        script: Arc<Mutex<HashMap<(Method, String), VecDeque<Scripted>>>>,
        log: Arc<Mutex<Vec<TransportRequest>>>,
    }

    impl MockTransport {
        /// Creates a transport with nothing scripted.
        pub fn new() -> Self {
            Self::default()
        }

        /// Queues a response for the next request to `method path`.
        pub fn respond(&self, method: Method, path: &str, status: u16, body: impl Into<String>) -> &Self {
            self.push(method, path, Scripted::Respond(TransportResponse::new(status, body)));
            self
        }

        /// Queues a JSON response.
        pub fn respond_json(&self, method: Method, path: &str, status: u16, body: serde_json::Value) -> &Self {
            self.respond(method, path, status, body.to_string())
        }

        /// Queues a transport-level failure.
        pub fn fail(&self, method: Method, path: &str, message: impl Into<String>) -> &Self {
            self.push(method, path, Scripted::Fail(message.into()));
            self
        }

        fn push(&self, method: Method, path: &str, entry: Scripted) {
            self.script
                .lock()
                .unwrap()
                .entry((method, path.to_string()))
                .or_default()
                .push_back(entry);
        }

        /// All requests received so far, in order.
        pub fn requests(&self) -> Vec<TransportRequest> {
            self.log.lock().unwrap().clone()
        }

        /// Requests received for one path.
        pub fn requests_to(&self, path: &str) -> Vec<TransportRequest> {
            self.requests().into_iter().filter(|r| r.path == path).collect()
        }

        /// Number of requests received.
        pub fn request_count(&self) -> usize {
            self.log.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl SyncTransport for MockTransport {
        async fn request(&self, request: TransportRequest) -> SyncResult<TransportResponse> {
            let key = (request.method, request.path.clone());
            self.log.lock().unwrap().push(request);

            let next = self
                .script
                .lock()
                .unwrap()
                .get_mut(&key)
                .and_then(VecDeque::pop_front);

            match next {
                Some(Scripted::Respond(response)) => Ok(response),
                Some(Scripted::Fail(message)) => Err(SyncError::Network(message)),
                None => Err(SyncError::Network(format!(
                    "no scripted response for {} {}",
                    key.0, key.1
                ))),
            }
        }
    }
}
