//! Response status precondition.

use crate::error::TrackerError;
use crate::request::ODataResponse;
use reqwest::StatusCode;

/// Check that `response` carries the `expected` status.
///
/// `context` describes what was being attempted and is only evaluated on
/// mismatch. On success the response is left untouched for the caller.
///
/// # Errors
///
/// Returns [`TrackerError::UnexpectedStatus`] carrying the context, the
/// actual status line and the raw body.
pub fn validate_status<F>(
    response: &ODataResponse,
    expected: StatusCode,
    context: F,
) -> Result<(), TrackerError>
where
    F: FnOnce() -> String,
{
    if response.status == expected {
        return Ok(());
    }

    tracing::debug!(
        expected = %expected,
        actual = %response.status,
        "Unexpected response status"
    );

    Err(TrackerError::UnexpectedStatus {
        context: context(),
        status: response.status,
        body: response.text().into_owned(),
    })
}
