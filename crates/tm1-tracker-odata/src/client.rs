//! OData request execution.
//!
//! [`ODataClient`] binds a [`Transport`] to a service root URL. Every request
//! it sends carries the OData protocol headers; the `*_with` variants hand
//! the fully built request to a caller hook first, which is how the tracker
//! adds its track-changes preference and how callers add credentials.

use crate::continuation::{Continuation, ResponseProcessor};
use crate::error::TrackerError;
use crate::request::{ODataRequest, ODataResponse};
use crate::transport::{Session, Transport};
use crate::validate::validate_status;
use reqwest::StatusCode;

/// OData client for a single service root.
#[derive(Debug, Clone)]
pub struct ODataClient<T = Session> {
    transport: T,
    service_root: String,
    verbose: bool,
}

impl<T: Transport> ODataClient<T> {
    /// Create a client for the service rooted at `service_root`.
    ///
    /// Links are appended to the root verbatim, so the root normally ends
    /// with `/` (e.g. `https://tm1:8010/api/v1/`).
    pub fn new(transport: T, service_root: impl Into<String>) -> Self {
        Self {
            transport,
            service_root: service_root.into(),
            verbose: false,
        }
    }

    /// Log requests and response bodies at `info` level.
    #[must_use]
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// The service root URL.
    #[must_use]
    pub fn service_root(&self) -> &str {
        &self.service_root
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Resolve a link against the service root.
    ///
    /// Absolute links are returned unchanged; anything else is appended to
    /// the root.
    #[must_use]
    pub fn resolve(&self, link: &str) -> String {
        if link.starts_with("http://") || link.starts_with("https://") {
            link.to_string()
        } else {
            format!("{}{link}", self.service_root)
        }
    }

    /// Send a GET request.
    ///
    /// # Errors
    ///
    /// Returns error on transport failure.
    pub async fn get(&self, url: &str) -> Result<ODataResponse, TrackerError> {
        self.send(ODataRequest::get(url)).await
    }

    /// Send a GET request after letting `hook` amend it.
    ///
    /// # Errors
    ///
    /// Returns error on transport failure.
    pub async fn get_with<F>(&self, url: &str, hook: F) -> Result<ODataResponse, TrackerError>
    where
        F: FnOnce(&mut ODataRequest),
    {
        let mut request = ODataRequest::get(url);
        hook(&mut request);
        self.send(request).await
    }

    /// Send a POST request with `body` encoded as `content_type`.
    ///
    /// # Errors
    ///
    /// Returns error on an invalid content type or transport failure.
    pub async fn post(
        &self,
        url: &str,
        content_type: &str,
        body: impl Into<String>,
    ) -> Result<ODataResponse, TrackerError> {
        self.send(ODataRequest::post(url, content_type, body)?).await
    }

    /// Send a POST request after letting `hook` amend it.
    ///
    /// # Errors
    ///
    /// Returns error on an invalid content type or transport failure.
    pub async fn post_with<F>(
        &self,
        url: &str,
        content_type: &str,
        body: impl Into<String>,
        hook: F,
    ) -> Result<ODataResponse, TrackerError>
    where
        F: FnOnce(&mut ODataRequest),
    {
        let mut request = ODataRequest::post(url, content_type, body)?;
        hook(&mut request);
        self.send(request).await
    }

    async fn send(&self, request: ODataRequest) -> Result<ODataResponse, TrackerError> {
        if self.verbose {
            tracing::info!(method = %request.method, url = %request.url, "Sending request");
            if let Some(body) = &request.body {
                tracing::info!(body = %body, "Request body");
            }
        } else {
            tracing::debug!(method = %request.method, url = %request.url, "Sending request");
        }

        self.transport.execute(request).await
    }

    /// Fetch one page of a collection and hand its body to `processor`.
    pub(crate) async fn fetch_page<P>(
        &self,
        link: &str,
        track_changes: bool,
        processor: &mut P,
    ) -> Result<Continuation, TrackerError>
    where
        P: ResponseProcessor + ?Sized,
    {
        let url = self.resolve(link);
        let response = if track_changes {
            self.get_with(&url, ODataRequest::prefer_track_changes)
                .await?
        } else {
            self.get(&url).await?
        };

        validate_status(&response, StatusCode::OK, || {
            format!("Server responded with an unexpected result while retrieving {url}.")
        })?;

        if self.verbose {
            tracing::info!(body = %response.text(), "Response body");
        }

        processor.process(&response.body).map_err(TrackerError::Decode)
    }
}
