//! # TM1 Tracker OData
//!
//! Client-side OData v4 protocol logic for walking paged collections and
//! tracking their changes.
//!
//! ## Protocol
//!
//! - Every request carries `OData-Version: 4.0` and `Accept: application/json`
//! - Server-driven paging: a collection may arrive as several responses, each
//!   but the last carrying an `@odata.nextLink`
//! - Change tracking: requests carry `Prefer: odata.track-changes`, and the
//!   last page of the collection carries an `@odata.deltaLink` that returns
//!   only later changes when followed
//!
//! ## Components
//!
//! - [`Session`]: reqwest transport with a cookie store for session affinity
//! - [`ODataClient`]: request construction, verbose logging and the
//!   [`ODataClient::iterate_collection`] walker
//! - [`validate_status`]: status precondition with diagnostic context
//! - [`DeltaTracker`]: the paginate / wait / follow-delta state machine
//!
//! Response bodies are interpreted by the caller through
//! [`ResponseProcessor`], which only has to hand back the [`Continuation`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod collection;
pub mod continuation;
pub mod error;
pub mod request;
pub mod tracker;
pub mod transport;
pub mod validate;

#[cfg(test)]
pub(crate) mod testing;

pub use client::ODataClient;
pub use continuation::{CollectionPage, Continuation, ProcessError, ResponseProcessor};
pub use error::TrackerError;
pub use request::{ODataRequest, ODataResponse};
pub use tracker::{DeltaTracker, StopReason, TrackState, TrackSummary, DEFAULT_POLL_INTERVAL};
pub use transport::{Session, SessionConfig, Transport};
pub use validate::validate_status;

pub use reqwest::{header, Method, StatusCode};
pub use tokio_util::sync::CancellationToken;
