//! Server version check.
//!
//! Delta links on the message and transaction logs arrived with TM1
//! 10.2.2 FP5. Asking for the product version is also the first,
//! credential-carrying request of a run, which establishes the session.

use anyhow::{bail, Result};
use tm1_tracker_odata::header::{HeaderValue, ACCEPT, AUTHORIZATION};
use tm1_tracker_odata::{validate_status, ODataClient, StatusCode, Transport};

/// Product version resource, relative to the service root.
pub const PRODUCT_VERSION_PATH: &str = "Configuration/ProductVersion/$value";

/// Oldest version supporting delta links on the logs (10.2.2 FP5).
pub const MINIMUM_VERSION: &str = "10.2.20500";

/// True when `version` is at least [`MINIMUM_VERSION`].
///
/// Versions share a fixed-width layout, so the leading characters compare
/// lexically.
#[must_use]
pub fn supports_tracking(version: &str) -> bool {
    let version = version.trim();
    let prefix = version.get(..MINIMUM_VERSION.len()).unwrap_or(version);
    prefix >= MINIMUM_VERSION
}

/// Authenticate against the server and check its version.
///
/// Returns the reported version.
///
/// # Errors
///
/// Returns error on transport failure, a status other than `200 OK`, or a
/// server too old to track.
pub async fn check_server_version<T: Transport>(
    client: &ODataClient<T>,
    authorization: HeaderValue,
) -> Result<String> {
    let url = client.resolve(PRODUCT_VERSION_PATH);

    let response = client
        .get_with(&url, |request| {
            request.headers.insert(AUTHORIZATION, authorization);
            // Plain text is returned here, not JSON
            request.headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
        })
        .await?;

    validate_status(&response, StatusCode::OK, || {
        "Server responded with an unexpected result while asking for its version number."
            .to_string()
    })?;

    let version = response.text().trim().to_string();
    if !supports_tracking(&version) {
        bail!(
            "The TM1 Server version of your server is: {version}. \
             Minimal required version to use a tracker is 10.2.2 FP5!"
        );
    }

    Ok(version)
}
