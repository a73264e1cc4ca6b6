//! Errors surfaced by the OData client and the delta tracker.
//!
//! Nothing in this crate retries: every variant ends the operation that
//! produced it and is handed back to the caller.

use crate::continuation::ProcessError;
use reqwest::StatusCode;

/// Errors that can occur while talking to an OData service.
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    /// The HTTP session could not be built
    #[error("session init error: {0}")]
    Init(String),

    /// A request could not be constructed (unparsable URL, invalid header value)
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Connection-level failure (DNS, TCP, TLS, timeout)
    #[error("request to {url} failed: {source}")]
    Transport {
        /// Target URL of the failed request
        url: String,
        /// Underlying client error
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a status other than the expected one
    #[error("{context}\nServer responded with: {status}\n{body}")]
    UnexpectedStatus {
        /// Caller supplied description of what was being attempted
        context: String,
        /// Actual status line
        status: StatusCode,
        /// Raw response body
        body: String,
    },

    /// The response processor could not interpret a response body
    #[error("failed to process response: {0}")]
    Decode(#[source] ProcessError),
}

impl TrackerError {
    /// Status code of an [`TrackerError::UnexpectedStatus`] error.
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::UnexpectedStatus { status, .. } => Some(*status),
            Self::Transport { source, .. } => source.status(),
            _ => None,
        }
    }
}
