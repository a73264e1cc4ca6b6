//! Credentials for the initial, authenticating request.
//!
//! Only the first request carries credentials; the session cookie it
//! returns authenticates everything after it.

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::fmt;
use tm1_tracker_odata::header::HeaderValue;

/// Authentication mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AuthMode {
    /// Standard TM1 security, sent as HTTP basic authentication
    #[default]
    Tm1,
    /// Cognos Access Manager security
    Cam,
}

impl AuthMode {
    /// Parse the `TM1_AUTHENTICATION` value. Anything but `CAM` selects
    /// standard TM1 security.
    #[must_use]
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(mode) if mode.eq_ignore_ascii_case("CAM") => Self::Cam,
            _ => Self::Tm1,
        }
    }
}

/// User credentials.
#[derive(Clone, Default)]
pub struct Credentials {
    /// Authentication mode
    pub mode: AuthMode,
    /// User name
    pub user: String,
    /// Password
    pub password: String,
    /// CAM namespace, only used in [`AuthMode::Cam`]
    pub namespace: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("mode", &self.mode)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("namespace", &self.namespace)
            .finish()
    }
}

impl Credentials {
    /// The `Authorization` header value for these credentials.
    #[must_use]
    pub fn authorization(&self) -> String {
        match self.mode {
            AuthMode::Tm1 => {
                let token = STANDARD.encode(format!("{}:{}", self.user, self.password));
                format!("Basic {token}")
            }
            AuthMode::Cam => {
                let token = STANDARD.encode(format!(
                    "{}:{}:{}",
                    self.user, self.password, self.namespace
                ));
                format!("CAMNamespace {token}")
            }
        }
    }

    /// The `Authorization` header, marked sensitive so it is never logged.
    ///
    /// # Errors
    ///
    /// Returns error if the value is not a valid header value.
    pub fn authorization_header(&self) -> Result<HeaderValue> {
        let mut value = HeaderValue::from_str(&self.authorization())
            .context("Credentials do not form a valid Authorization header")?;
        value.set_sensitive(true);
        Ok(value)
    }
}
