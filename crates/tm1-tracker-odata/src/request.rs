//! Request and response envelopes exchanged with the transport.
//!
//! An [`ODataRequest`] is built with the two headers every OData v4 call
//! needs and may be amended by a caller hook before it is sent. An
//! [`ODataResponse`] always holds the complete body: the transport drains
//! the connection before handing it back.

use crate::error::TrackerError;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use std::borrow::Cow;

/// Protocol version header name.
pub const ODATA_VERSION_HEADER: &str = "odata-version";
/// Protocol version sent with every request.
pub const ODATA_VERSION: &str = "4.0";
/// Media type requested from the service.
pub const JSON_MEDIA_TYPE: &str = "application/json";
/// Preference header name.
pub const PREFER_HEADER: &str = "prefer";
/// Preference asking the service to emit a delta link.
pub const TRACK_CHANGES: &str = "odata.track-changes";

/// A single request, described as plain data.
#[derive(Debug, Clone)]
pub struct ODataRequest {
    /// HTTP method
    pub method: Method,
    /// Absolute target URL
    pub url: String,
    /// Request headers
    pub headers: HeaderMap,
    /// Optional body, only set for mutating verbs
    pub body: Option<String>,
}

impl ODataRequest {
    fn new(method: Method, url: impl Into<String>) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static(ODATA_VERSION_HEADER),
            HeaderValue::from_static(ODATA_VERSION),
        );
        headers.insert(ACCEPT, HeaderValue::from_static(JSON_MEDIA_TYPE));

        Self {
            method,
            url: url.into(),
            headers,
            body: None,
        }
    }

    /// Build a GET request.
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    /// Build a POST request carrying `body` encoded as `content_type`.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::InvalidRequest`] if `content_type` is not a
    /// valid header value.
    pub fn post(
        url: impl Into<String>,
        content_type: &str,
        body: impl Into<String>,
    ) -> Result<Self, TrackerError> {
        let content_type = HeaderValue::from_str(content_type).map_err(|e| {
            TrackerError::InvalidRequest(format!("content type {content_type:?}: {e}"))
        })?;

        let mut request = Self::new(Method::POST, url);
        request.headers.insert(CONTENT_TYPE, content_type);
        request.body = Some(body.into());
        Ok(request)
    }

    /// Ask the service to track changes for the requested collection.
    pub fn prefer_track_changes(&mut self) {
        self.headers.insert(
            HeaderName::from_static(PREFER_HEADER),
            HeaderValue::from_static(TRACK_CHANGES),
        );
    }

    /// Value of a header, if present and valid UTF-8.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// A complete response: status, headers and the fully read body.
#[derive(Debug, Clone)]
pub struct ODataResponse {
    /// Response status
    pub status: StatusCode,
    /// Response headers
    pub headers: HeaderMap,
    /// Response body
    pub body: Bytes,
}

impl ODataResponse {
    /// Body decoded as UTF-8, replacing invalid sequences.
    #[must_use]
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}
