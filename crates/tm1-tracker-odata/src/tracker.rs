//! Delta tracking.
//!
//! The tracker first walks the collection like
//! [`ODataClient::iterate_collection`], but asks the service to track
//! changes. Once the collection is exhausted the service answers with a
//! delta link instead of a next link; the tracker then waits for the polling
//! interval and follows the delta link, which returns only entries added
//! since. This repeats until the service stops handing out links or the run
//! is cancelled.
//!
//! ```text
//!             next link                delta link
//!            ┌─────────┐          ┌──────────────────┐
//!            ▼         │          ▼   (sleep first)  │
//!  start ─▶ Paginating ─┴─▶ DeltaWaiting ────────────┘
//!               │  delta link      │  next link ─▶ Paginating
//!               └──── no link ─────┴─▶ Stopped
//! ```
//!
//! Pagination is never delayed; only following a delta link is.
//!
//! A failure anywhere inside the loop ends the run. Nothing is
//! checkpointed: a new run starts over with the full collection.

use crate::client::ODataClient;
use crate::continuation::{Continuation, ResponseProcessor};
use crate::error::TrackerError;
use crate::transport::Transport;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Polling interval used when none is configured.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Where the tracker goes next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackState {
    /// More of the current collection is immediately available
    Paginating(String),
    /// The collection is caught up; wait, then follow this delta link
    DeltaWaiting(String),
    /// The service no longer offers links
    Stopped,
}

impl TrackState {
    /// Decide the next state from a processed response.
    ///
    /// A next link takes precedence over a delta link: the service should
    /// never send both, but if it does the current collection is finished
    /// first.
    #[must_use]
    pub fn after(continuation: Continuation) -> Self {
        match continuation {
            Continuation {
                next_link: Some(link),
                ..
            } => Self::Paginating(link),
            Continuation {
                delta_link: Some(link),
                ..
            } => Self::DeltaWaiting(link),
            _ => Self::Stopped,
        }
    }
}

/// Why a tracking run ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// A response carried neither a next link nor a delta link
    ServerStopped,
    /// The cancellation token fired
    Cancelled,
}

/// Outcome of a tracking run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackSummary {
    /// Requests issued, pages and deltas alike
    pub requests: usize,
    /// Requests that followed a delta link
    pub delta_requests: usize,
    /// Why the run ended
    pub reason: StopReason,
}

/// Paginate-then-poll state machine over one collection.
#[derive(Debug, Clone)]
pub struct DeltaTracker {
    interval: Duration,
}

impl Default for DeltaTracker {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL)
    }
}

impl DeltaTracker {
    /// Create a tracker that waits `interval` before following a delta link.
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    /// The polling interval.
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Track the collection at `path` until the service stops offering links
    /// or `cancel` fires.
    ///
    /// Every response, initial pages and deltas alike, is handed to
    /// `processor`. Cancellation is checked before each request and
    /// interrupts the wait before a delta request; an in-flight request is
    /// allowed to finish.
    ///
    /// Relative links are requested as the service root followed by the link
    /// text; absolute `http://` or `https://` links are requested unchanged
    /// (see [`ODataClient::resolve`]).
    ///
    /// # Errors
    ///
    /// Returns error on transport failure, a status other than `200 OK`, or
    /// if the processor fails.
    pub async fn run<T, P>(
        &self,
        client: &ODataClient<T>,
        path: &str,
        processor: &mut P,
        cancel: &CancellationToken,
    ) -> Result<TrackSummary, TrackerError>
    where
        T: Transport,
        P: ResponseProcessor + ?Sized,
    {
        let mut requests = 0;
        let mut delta_requests = 0;
        let mut state = if path.is_empty() {
            TrackState::Stopped
        } else {
            TrackState::Paginating(path.to_string())
        };

        tracing::info!(
            path,
            interval_secs = self.interval.as_secs_f64(),
            "Tracking collection"
        );

        loop {
            let link = match state {
                TrackState::Stopped => {
                    tracing::info!(requests, delta_requests, "Server stopped handing out links");
                    return Ok(TrackSummary {
                        requests,
                        delta_requests,
                        reason: StopReason::ServerStopped,
                    });
                }
                TrackState::Paginating(link) => link,
                TrackState::DeltaWaiting(link) => {
                    tokio::select! {
                        biased;
                        () = cancel.cancelled() => break,
                        () = tokio::time::sleep(self.interval) => {}
                    }
                    delta_requests += 1;
                    link
                }
            };

            if cancel.is_cancelled() {
                break;
            }

            let continuation = client.fetch_page(&link, true, processor).await?;
            requests += 1;
            state = TrackState::after(continuation);

            tracing::debug!(link, next = ?state, "Tracking cycle completed");
        }

        tracing::info!(requests, delta_requests, "Tracking cancelled");
        Ok(TrackSummary {
            requests,
            delta_requests,
            reason: StopReason::Cancelled,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedTransport;
    use crate::ProcessError;
    use serde_json::json;
    use tokio_test::{assert_err, assert_ok};

    const ROOT: &str = "http://localhost:8010/api/v1/";

    fn links(body: &[u8]) -> Result<Continuation, ProcessError> {
        Ok(Continuation::from_json(body)?)
    }

    #[test]
    fn next_link_keeps_paginating() {
        assert_eq!(
            TrackState::after(Continuation::next("p2")),
            TrackState::Paginating("p2".to_string())
        );
    }

    #[test]
    fn delta_link_waits() {
        assert_eq!(
            TrackState::after(Continuation::delta("d1")),
            TrackState::DeltaWaiting("d1".to_string())
        );
    }

    #[test]
    fn no_link_stops() {
        assert_eq!(TrackState::after(Continuation::done()), TrackState::Stopped);
        assert_eq!(
            TrackState::after(Continuation::new(Some(String::new()), None)),
            TrackState::Stopped
        );
    }

    #[test]
    fn next_link_wins_over_delta_link() {
        let both = Continuation::new(Some("p2".to_string()), Some("d1".to_string()));
        assert_eq!(
            TrackState::after(both),
            TrackState::Paginating("p2".to_string())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn paginates_then_waits_then_follows_delta() {
        let interval = Duration::from_secs(7);
        let transport = ScriptedTransport::new()
            .json(&json!({"value": ["a"], "@odata.nextLink": "p2"}))
            .json(&json!({"value": ["b"], "@odata.deltaLink": "d1"}))
            .json(&json!({"value": ["c"]}));
        let client = ODataClient::new(transport, ROOT);

        let mut bodies = Vec::new();
        let mut processor = |body: &[u8]| -> Result<Continuation, ProcessError> {
            bodies.push(String::from_utf8(body.to_vec())?);
            links(body)
        };

        let summary = DeltaTracker::new(interval)
            .run(&client, "MessageLogEntries", &mut processor, &CancellationToken::new())
            .await
            .unwrap();
        drop(processor);

        assert_eq!(
            summary,
            TrackSummary {
                requests: 3,
                delta_requests: 1,
                reason: StopReason::ServerStopped,
            }
        );
        assert_eq!(bodies.len(), 3);
        assert!(bodies[0].contains("\"a\""));
        assert!(bodies[1].contains("\"b\""));
        assert!(bodies[2].contains("\"c\""));

        let sent = client.transport().requests();
        let urls: Vec<_> = sent.iter().map(|r| r.request.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "http://localhost:8010/api/v1/MessageLogEntries",
                "http://localhost:8010/api/v1/p2",
                "http://localhost:8010/api/v1/d1",
            ]
        );
        for recorded in &sent {
            assert_eq!(recorded.request.header("Prefer"), Some("odata.track-changes"));
            assert_eq!(recorded.request.header("OData-Version"), Some("4.0"));
        }

        // Pages follow each other immediately, the delta request waits exactly
        // one interval.
        assert_eq!(sent[1].at - sent[0].at, Duration::ZERO);
        assert_eq!(sent[2].at - sent[1].at, interval);
    }

    #[tokio::test(start_paused = true)]
    async fn keeps_polling_deltas() {
        let interval = Duration::from_secs(5);
        let transport = ScriptedTransport::new()
            .json(&json!({"value": [], "@odata.deltaLink": "d1"}))
            .json(&json!({"value": [], "@odata.deltaLink": "d2"}))
            .json(&json!({"value": [1], "@odata.nextLink": "d2p2"}))
            .json(&json!({"value": [2], "@odata.deltaLink": "d3"}))
            .json(&json!({"value": []}));
        let client = ODataClient::new(transport, ROOT);

        let summary = DeltaTracker::new(interval)
            .run(&client, "Entries", &mut links, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(summary.requests, 5);
        assert_eq!(summary.delta_requests, 3);

        let sent = client.transport().requests();
        let gaps: Vec<_> = sent.windows(2).map(|w| w[1].at - w[0].at).collect();
        assert_eq!(
            gaps,
            vec![interval, interval, Duration::ZERO, interval]
        );
        assert_eq!(
            client.transport().urls().last().map(String::as_str),
            Some("http://localhost:8010/api/v1/d3")
        );
    }

    #[tokio::test]
    async fn stops_when_no_links_are_returned() {
        let transport = ScriptedTransport::new().json(&json!({"value": [1, 2, 3]}));
        let client = ODataClient::new(transport, ROOT);

        let summary = assert_ok!(
            DeltaTracker::default()
                .run(&client, "Entries", &mut links, &CancellationToken::new())
                .await
        );

        assert_eq!(summary.requests, 1);
        assert_eq!(summary.delta_requests, 0);
        assert_eq!(summary.reason, StopReason::ServerStopped);
    }

    #[tokio::test(start_paused = true)]
    async fn absolute_links_are_requested_unchanged() {
        let transport = ScriptedTransport::new()
            .json(&json!({
                "value": [],
                "@odata.deltaLink": "https://tm1-replica:8010/api/v1/Entries?$deltatoken=9"
            }))
            .json(&json!({"value": []}));
        let client = ODataClient::new(transport, ROOT);

        let summary = DeltaTracker::new(Duration::from_secs(1))
            .run(&client, "Entries", &mut links, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(summary.delta_requests, 1);
        assert_eq!(
            client.transport().urls(),
            vec![
                "http://localhost:8010/api/v1/Entries".to_string(),
                "https://tm1-replica:8010/api/v1/Entries?$deltatoken=9".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn both_links_follow_next_link_first() {
        let transport = ScriptedTransport::new()
            .json(&json!({"value": [], "@odata.nextLink": "p2", "@odata.deltaLink": "d1"}))
            .json(&json!({"value": []}));
        let client = ODataClient::new(transport, ROOT);

        let summary = DeltaTracker::new(Duration::from_secs(3600))
            .run(&client, "Entries", &mut links, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(summary.requests, 2);
        assert_eq!(summary.delta_requests, 0);
        assert_eq!(
            client.transport().urls()[1],
            "http://localhost:8010/api/v1/p2"
        );
    }

    #[tokio::test]
    async fn unexpected_status_aborts_run() {
        let transport = ScriptedTransport::new()
            .json(&json!({"value": [], "@odata.nextLink": "p2"}))
            .respond(404, "No such collection");
        let client = ODataClient::new(transport, ROOT);

        let mut calls = 0;
        let mut processor = |body: &[u8]| -> Result<Continuation, ProcessError> {
            calls += 1;
            links(body)
        };

        let err = assert_err!(
            DeltaTracker::default()
                .run(&client, "Entries", &mut processor, &CancellationToken::new())
                .await
        );
        drop(processor);

        assert_eq!(calls, 1);
        let message = err.to_string();
        assert!(message.contains("404 Not Found"));
        assert!(message.contains("No such collection"));
    }

    #[tokio::test]
    async fn processor_failure_aborts_run() {
        let transport = ScriptedTransport::new().json(&json!({"value": []}));
        let client = ODataClient::new(transport, ROOT);

        let err = DeltaTracker::default()
            .run(
                &client,
                "Entries",
                &mut |_: &[u8]| -> Result<Continuation, ProcessError> {
                    Err("unexpected entity shape".into())
                },
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, TrackerError::Decode(_)));
        assert!(err.to_string().contains("unexpected entity shape"));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_delta_wait() {
        let transport =
            ScriptedTransport::new().json(&json!({"value": [], "@odata.deltaLink": "d1"}));
        let client = ODataClient::new(transport, ROOT);
        let cancel = CancellationToken::new();

        let token = cancel.clone();
        let mut processor = move |body: &[u8]| -> Result<Continuation, ProcessError> {
            token.cancel();
            links(body)
        };

        let started = tokio::time::Instant::now();
        let summary = DeltaTracker::new(Duration::from_secs(3600))
            .run(&client, "Entries", &mut processor, &cancel)
            .await
            .unwrap();

        assert_eq!(summary.reason, StopReason::Cancelled);
        assert_eq!(summary.requests, 1);
        assert_eq!(summary.delta_requests, 0);
        assert!(started.elapsed() < Duration::from_secs(3600));
    }

    #[tokio::test]
    async fn cancelled_before_start_issues_no_request() {
        let client = ODataClient::new(ScriptedTransport::new(), ROOT);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let summary = DeltaTracker::default()
            .run(&client, "Entries", &mut links, &cancel)
            .await
            .unwrap();

        assert_eq!(summary.reason, StopReason::Cancelled);
        assert_eq!(summary.requests, 0);
        assert!(client.transport().requests().is_empty());
    }
}
