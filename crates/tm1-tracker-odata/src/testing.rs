//! Scripted transport used by the unit tests.

use crate::error::TrackerError;
use crate::request::{ODataRequest, ODataResponse};
use crate::transport::Transport;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::time::Instant;

/// A request as seen by [`ScriptedTransport`], with the (possibly paused)
/// tokio clock reading at the time it was sent.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub request: ODataRequest,
    pub at: Instant,
}

/// Replays canned responses in order and records every request.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<ODataResponse>>,
    requests: Mutex<Vec<Recorded>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, status: u16, body: &str) -> Self {
        self.responses.lock().unwrap().push_back(ODataResponse {
            status: StatusCode::from_u16(status).unwrap(),
            headers: HeaderMap::new(),
            body: Bytes::from(body.to_string()),
        });
        self
    }

    pub fn json(self, body: &serde_json::Value) -> Self {
        self.respond(200, &body.to_string())
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    pub fn urls(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.request.url).collect()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, request: ODataRequest) -> Result<ODataResponse, TrackerError> {
        self.requests.lock().unwrap().push(Recorded {
            request: request.clone(),
            at: Instant::now(),
        });

        let response = self.responses.lock().unwrap().pop_front();
        Ok(response.unwrap_or_else(|| panic!("no scripted response left for {}", request.url)))
    }
}
