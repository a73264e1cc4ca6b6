//! # TM1 Log Tracker
//!
//! Follows the message log of a TM1 server through OData delta links and
//! prints the time each MDX view took to create as CSV on stdout.
//!
//! ## Flow
//!
//! 1. **Configure**: `.env` file and `TM1_*` environment variables
//! 2. **Authenticate**: ask for the product version with credentials; the
//!    session cookie carries the rest of the run
//! 3. **Track**: read the full message log, then poll its delta link every
//!    `TM1_TRACKER_INTERVAL` seconds until Ctrl+C
//!
//! Logs go to stderr so stdout can be redirected to a file for analysis.

use anyhow::{Context, Result};
use tm1_tracker_odata::CancellationToken;
use tracing_subscriber::EnvFilter;

mod auth;
mod config;
mod messagelog;
mod runtime;
mod version;

use config::TrackerConfig;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting TM1 log tracker"
    );

    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!(path = %path.display(), "Loaded .env file"),
        Err(err) if err.not_found() => tracing::debug!("No .env file found"),
        Err(err) => return Err(err).context("Failed to load .env file"),
    }

    let config = TrackerConfig::from_env()?;

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received");
            shutdown.cancel();
        }
    });

    if let Err(err) = runtime::run(&config, std::io::stdout(), &cancel).await {
        tracing::error!(error = %format!("{err:#}"), "Tracker stopped with an error");
        return Err(err);
    }

    tracing::info!("Tracker stopped");
    Ok(())
}
