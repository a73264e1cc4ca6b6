//! HTTP transport.
//!
//! [`Transport`] is the seam between protocol logic and the network. The
//! production implementation, [`Session`], wraps a single reqwest client
//! whose connection pool and cookie store are reused for the lifetime of
//! the process, so the session cookie obtained by the first authenticated
//! request keeps authenticating every following one.

use crate::error::TrackerError;
use crate::request::{ODataRequest, ODataResponse};
use async_trait::async_trait;
use reqwest::{Client, Url};
use std::time::Duration;

/// Executes requests and returns fully read responses.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `request` and read the complete response.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::InvalidRequest`] if the URL does not parse and
    /// [`TrackerError::Transport`] on connection-level failures.
    async fn execute(&self, request: ODataRequest) -> Result<ODataResponse, TrackerError>;
}

/// Session configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Verify server certificates. TM1 servers commonly run with
    /// self-signed certificates, so this is off by default.
    pub verify_tls: bool,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            verify_tls: false,
            timeout: Duration::from_secs(30),
        }
    }
}

/// A cookie-retaining HTTP session.
///
/// Clones share the connection pool and the cookie store.
#[derive(Debug, Clone)]
pub struct Session {
    client: Client,
}

impl Session {
    /// Create a new session.
    ///
    /// # Errors
    ///
    /// Returns error if the underlying HTTP client cannot be created.
    pub fn new(config: &SessionConfig) -> Result<Self, TrackerError> {
        let mut builder = Client::builder()
            .use_rustls_tls()
            .cookie_store(true)
            .timeout(config.timeout);

        if !config.verify_tls {
            tracing::warn!("TLS certificate verification disabled");
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder
            .build()
            .map_err(|e| TrackerError::Init(e.to_string()))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for Session {
    async fn execute(&self, request: ODataRequest) -> Result<ODataResponse, TrackerError> {
        let ODataRequest {
            method,
            url,
            headers,
            body,
        } = request;

        let target = Url::parse(&url)
            .map_err(|e| TrackerError::InvalidRequest(format!("URL {url:?}: {e}")))?;

        let mut builder = self.client.request(method, target).headers(headers);
        if let Some(body) = body {
            builder = builder.body(body);
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(source) => return Err(TrackerError::Transport { url, source }),
        };

        let status = response.status();
        let headers = response.headers().clone();

        // Reading to the end hands the connection back to the pool
        let body = match response.bytes().await {
            Ok(body) => body,
            Err(source) => return Err(TrackerError::Transport { url, source }),
        };

        tracing::trace!(url, %status, body_len = body.len(), "Response received");

        Ok(ODataResponse {
            status,
            headers,
            body,
        })
    }
}
