//! Continuation state and the response processing seam.
//!
//! The protocol only depends on two fields of a response body:
//! `@odata.nextLink` (more of the same collection is pending) and
//! `@odata.deltaLink` (the collection is exhausted; follow this for later
//! changes). Everything else in the body belongs to the caller's
//! [`ResponseProcessor`].

use serde::de::DeserializeOwned;
use serde::Deserialize;

/// Error type returned by response processors.
pub type ProcessError = Box<dyn std::error::Error + Send + Sync>;

/// The two continuation tokens extracted from one response.
///
/// Empty tokens are stored as `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Continuation {
    /// Link to the next page of the current collection
    pub next_link: Option<String>,
    /// Link returning changes made after this response
    pub delta_link: Option<String>,
}

impl Continuation {
    /// Build from raw tokens as found in a response body.
    #[must_use]
    pub fn new(next_link: Option<String>, delta_link: Option<String>) -> Self {
        Self {
            next_link: next_link.filter(|l| !l.is_empty()),
            delta_link: delta_link.filter(|l| !l.is_empty()),
        }
    }

    /// More of the current collection is pending at `link`.
    #[must_use]
    pub fn next(link: impl Into<String>) -> Self {
        Self::new(Some(link.into()), None)
    }

    /// The collection is exhausted; changes are available at `link`.
    #[must_use]
    pub fn delta(link: impl Into<String>) -> Self {
        Self::new(None, Some(link.into()))
    }

    /// Neither token present: the server stopped tracking.
    #[must_use]
    pub fn done() -> Self {
        Self::default()
    }

    /// True when neither token is present.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.next_link.is_none() && self.delta_link.is_none()
    }

    /// Extract the tokens from a JSON response body, ignoring every other
    /// field.
    ///
    /// # Errors
    ///
    /// Returns error if the body is not a JSON object.
    pub fn from_json(body: &[u8]) -> Result<Self, serde_json::Error> {
        let page: CollectionPage<serde::de::IgnoredAny> = serde_json::from_slice(body)?;
        Ok(page.continuation())
    }
}

/// Interprets one response body and reports how to continue.
///
/// The same processor handles the initial collection pages and every delta
/// response: for append-only logs both have the same shape.
pub trait ResponseProcessor {
    /// Consume a response body.
    ///
    /// # Errors
    ///
    /// Returns error if the body cannot be interpreted; this ends the run.
    fn process(&mut self, body: &[u8]) -> Result<Continuation, ProcessError>;
}

impl<F> ResponseProcessor for F
where
    F: FnMut(&[u8]) -> Result<Continuation, ProcessError>,
{
    fn process(&mut self, body: &[u8]) -> Result<Continuation, ProcessError> {
        self(body)
    }
}

/// An OData collection response wrapping entities of type `T`.
#[derive(Debug, Clone, Deserialize)]
pub struct CollectionPage<T> {
    /// `@odata.context`
    #[serde(rename = "@odata.context", default)]
    pub context: Option<String>,
    /// `@odata.count`, when `$count=true` was requested
    #[serde(rename = "@odata.count", default)]
    pub count: Option<u64>,
    /// Entities in this page
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
    /// `@odata.nextLink`
    #[serde(rename = "@odata.nextLink", default)]
    pub next_link: Option<String>,
    /// `@odata.deltaLink`
    #[serde(rename = "@odata.deltaLink", default)]
    pub delta_link: Option<String>,
}

impl<T: DeserializeOwned> CollectionPage<T> {
    /// Decode a page from a JSON response body.
    ///
    /// # Errors
    ///
    /// Returns error on malformed JSON or entities not matching `T`.
    pub fn from_slice(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }
}

impl<T> CollectionPage<T> {
    /// Continuation tokens of this page.
    #[must_use]
    pub fn continuation(&self) -> Continuation {
        Continuation::new(self.next_link.clone(), self.delta_link.clone())
    }
}
