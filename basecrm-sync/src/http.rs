//! reqwest-backed transport for the Base CRM API.

use crate::error::{SyncError, SyncResult};
use crate::transport::{Method, SyncTransport, TransportRequest, TransportResponse};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// HTTP transport configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// API root that protocol paths are appended to (e.g. `https://api.getbase.com/v2`).
    pub base_url: String,
    /// OAuth2 bearer token, if the surrounding application has one.
    pub access_token: Option<String>,
    pub user_agent: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.getbase.com/v2".to_string(),
            access_token: None,
            user_agent: format!("basecrm-sync/{}", env!("CARGO_PKG_VERSION")),
            timeout_secs: 30,
        }
    }
}

/// Sends protocol requests over HTTPS with reqwest.
pub struct HttpTransport {
    config: HttpConfig,
    client: Client,
}

impl HttpTransport {
    /// Creates a transport from the given configuration.
    pub fn new(config: HttpConfig) -> SyncResult<Self> {
        if config.base_url.trim().is_empty() {
            return Err(SyncError::Config("base_url must not be empty".to_string()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SyncError::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &HttpConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl SyncTransport for HttpTransport {
    async fn request(&self, request: TransportRequest) -> SyncResult<TransportResponse> {
        let url = self.url(&request.path);
        debug!(method = %request.method, %url, "Sending sync request");

        let mut builder = match request.method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
        }
        .header(ACCEPT, "application/json")
        .header(USER_AGENT, &self.config.user_agent);

        if let Some(token) = &self.config.access_token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.header(CONTENT_TYPE, "application/json").body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| SyncError::Network(format!("{} {} failed: {e}", request.method, request.path)))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| SyncError::Network(format!("failed to read response body: {e}")))?;

        debug!(status, bytes = body.len(), "Received sync response");
        Ok(TransportResponse { status, body })
    }
}
