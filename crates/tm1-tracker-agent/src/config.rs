//! Tracker configuration.

use crate::auth::{AuthMode, Credentials};
use anyhow::{bail, Context, Result};
use std::time::Duration;
use tm1_tracker_odata::DEFAULT_POLL_INTERVAL;
use url::Url;

/// Collection tracked when none is configured.
pub const DEFAULT_COLLECTION: &str = "MessageLogEntries";

/// Tracker configuration.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Service root URL, always ending with `/`
    pub service_root_url: String,

    /// Credentials for the initial request
    pub credentials: Credentials,

    /// Delay before following a delta link
    pub interval: Duration,

    /// Collection to track, relative to the service root
    pub collection: String,

    /// Verify server certificates
    pub verify_tls: bool,

    /// Log every request and response body
    pub verbose: bool,

    /// Per-request timeout
    pub timeout: Duration,
}

impl TrackerConfig {
    /// Load configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `TM1_SERVICE_ROOT_URL`: Service root, e.g. `https://tm1:8010/api/v1/` (required)
    /// - `TM1_USER`, `TM1_PASSWORD`: Credentials
    /// - `TM1_AUTHENTICATION`: `TM1` or `CAM`
    /// - `TM1_CAM_NAMESPACE`: CAM namespace
    /// - `TM1_TRACKER_INTERVAL`: Polling interval in seconds (default 5)
    /// - `TM1_TRACKER_COLLECTION`: Collection to track (default `MessageLogEntries`)
    /// - `TM1_VERIFY_TLS`: Verify server certificates (default false)
    /// - `TM1_VERBOSE`: Log requests and response bodies (default false)
    /// - `TM1_TIMEOUT_SECS`: Request timeout in seconds (default 30)
    ///
    /// # Errors
    ///
    /// Returns error if the service root is missing or not an HTTP(S) URL.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns error if the service root is missing or not an HTTP(S) URL.
    pub fn from_vars<F>(var: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let root = var("TM1_SERVICE_ROOT_URL").context("TM1_SERVICE_ROOT_URL is not set")?;
        let service_root_url = normalize_root(&root)?;

        let credentials = Credentials {
            mode: AuthMode::parse(var("TM1_AUTHENTICATION").as_deref()),
            user: var("TM1_USER").unwrap_or_default(),
            password: var("TM1_PASSWORD").unwrap_or_default(),
            namespace: var("TM1_CAM_NAMESPACE").unwrap_or_default(),
        };

        let collection = var("TM1_TRACKER_COLLECTION")
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_COLLECTION.to_string());

        let timeout = var("TM1_TIMEOUT_SECS")
            .and_then(|s| s.trim().parse::<u64>().ok())
            .filter(|&secs| secs > 0)
            .map_or(Duration::from_secs(30), Duration::from_secs);

        Ok(Self {
            service_root_url,
            credentials,
            interval: parse_interval(var("TM1_TRACKER_INTERVAL").as_deref()),
            collection,
            verify_tls: parse_flag(var("TM1_VERIFY_TLS").as_deref()),
            verbose: parse_flag(var("TM1_VERBOSE").as_deref()),
            timeout,
        })
    }
}

/// Polling interval in whole seconds; absent, invalid or < 1 means 5.
fn parse_interval(value: Option<&str>) -> Duration {
    match value.and_then(|s| s.trim().parse::<i64>().ok()) {
        Some(secs) if secs >= 1 => Duration::from_secs(secs.unsigned_abs()),
        _ => DEFAULT_POLL_INTERVAL,
    }
}

fn parse_flag(value: Option<&str>) -> bool {
    matches!(
        value.map(|v| v.trim().to_ascii_lowercase()).as_deref(),
        Some("1" | "true" | "yes" | "on")
    )
}

fn normalize_root(root: &str) -> Result<String> {
    let url = Url::parse(root.trim()).with_context(|| format!("Invalid service root URL {root:?}"))?;
    if !matches!(url.scheme(), "http" | "https") {
        bail!("Service root URL must use http or https, got {}", url.scheme());
    }

    let mut root = url.to_string();
    if !root.ends_with('/') {
        root.push('/');
    }
    Ok(root)
}
