//! Tracker runtime.

use crate::config::TrackerConfig;
use crate::messagelog::MdxViewTimer;
use crate::version::check_server_version;
use anyhow::{Context, Result};
use std::io::Write;
use tm1_tracker_odata::{
    CancellationToken, DeltaTracker, ODataClient, Session, SessionConfig, TrackSummary,
};

/// Authenticate, check the server and track the configured collection,
/// writing MDX view timings to `out` until the server stops handing out
/// delta links or `cancel` fires.
///
/// # Errors
///
/// Returns error if the session cannot be created, the server rejects the
/// credentials or is too old, or any tracking cycle fails.
pub async fn run<W: Write>(
    config: &TrackerConfig,
    out: W,
    cancel: &CancellationToken,
) -> Result<TrackSummary> {
    let session = Session::new(&SessionConfig {
        verify_tls: config.verify_tls,
        timeout: config.timeout,
    })
    .context("Failed to create HTTP session")?;

    let client = ODataClient::new(session, &config.service_root_url).verbose(config.verbose);

    let authorization = config.credentials.authorization_header()?;
    let version = check_server_version(&client, authorization)
        .await
        .context("Server version check failed")?;

    tracing::info!(
        version,
        service_root = %config.service_root_url,
        user = %config.credentials.user,
        "Connected to TM1 server"
    );

    let mut timer = MdxViewTimer::new(out);
    let summary = DeltaTracker::new(config.interval)
        .run(&client, &config.collection, &mut timer, cancel)
        .await
        .with_context(|| format!("Tracking {} failed", config.collection))?;

    tracing::info!(
        requests = summary.requests,
        delta_requests = summary.delta_requests,
        queries = timer.query_count(),
        open_views = timer.open_views(),
        reason = ?summary.reason,
        "Tracking stopped"
    );

    Ok(summary)
}
