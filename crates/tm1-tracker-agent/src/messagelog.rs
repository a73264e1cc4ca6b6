//! Message log processing: MDX view creation timings.
//!
//! When TM1 creates a view from MDX it logs two entries under the
//! `TM1.MdxViewCreate` logger on the same thread: one naming the MDX about
//! to be processed and, once done, `View is created.`. Pairing them per
//! thread gives the time each view took. Entries arrive in the order they
//! were written to the log, across the initial collection and every delta,
//! so a pair may straddle two responses.
//!
//! Output is one CSV line per completed view:
//!
//! ```text
//! QUERY,<count>,<start>,<end>,<seconds>
//! ```

use chrono::{DateTime, FixedOffset, Timelike};
use serde::Deserialize;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::io::{self, Write};
use tm1_tracker_odata::{CollectionPage, Continuation, ProcessError, ResponseProcessor};

/// Logger emitting MDX view creation entries.
pub const MDX_VIEW_CREATE_LOGGER: &str = "TM1.MdxViewCreate";

/// Message of the entry closing an MDX view creation.
pub const VIEW_CREATED_MESSAGE: &str = "View is created.";

/// A single message log entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MessageLogEntry {
    /// Session the entry was logged for
    #[serde(rename = "SessionID", default)]
    pub session_id: i64,
    /// Thread that logged the entry
    #[serde(rename = "ThreadID", default)]
    pub thread_id: i64,
    /// Logger name
    #[serde(default)]
    pub logger: String,
    /// Log level
    #[serde(default)]
    pub level: String,
    /// Time stamp; kept raw since some entries carry no valid time
    #[serde(default)]
    pub time_stamp: String,
    /// Message text
    #[serde(default)]
    pub message: String,
}

/// Pairs MDX view creation entries and writes their timings.
pub struct MdxViewTimer<W> {
    out: W,
    /// Thread id to the start of the view it is creating, `None` when the
    /// start entry had no valid time stamp
    open_views: HashMap<i64, Option<DateTime<FixedOffset>>>,
    query_count: u64,
}

impl<W: Write> MdxViewTimer<W> {
    /// Create a timer writing CSV lines to `out`.
    pub fn new(out: W) -> Self {
        Self {
            out,
            open_views: HashMap::new(),
            query_count: 0,
        }
    }

    /// Number of completed view creations seen so far.
    pub fn query_count(&self) -> u64 {
        self.query_count
    }

    /// Views started but not yet completed.
    pub fn open_views(&self) -> usize {
        self.open_views.len()
    }

    fn record(&mut self, entry: &MessageLogEntry) -> io::Result<()> {
        if entry.logger != MDX_VIEW_CREATE_LOGGER {
            return Ok(());
        }

        tracing::trace!(
            session_id = entry.session_id,
            thread_id = entry.thread_id,
            level = %entry.level,
            message = %entry.message,
            "MDX view entry"
        );

        // Entries without a usable time still drive the pairing; only the
        // timing is lost.
        let at = DateTime::parse_from_rfc3339(&entry.time_stamp).ok();
        if at.is_none() {
            tracing::warn!(
                thread_id = entry.thread_id,
                time_stamp = %entry.time_stamp,
                "MDX view entry without a valid time stamp"
            );
        }

        if entry.message == VIEW_CREATED_MESSAGE {
            self.query_count += 1;
            match (self.open_views.remove(&entry.thread_id), at) {
                (Some(Some(started)), Some(at)) => writeln!(
                    self.out,
                    "QUERY,{},{},{},{:.3}",
                    self.query_count,
                    format_time(&started),
                    format_time(&at),
                    seconds_between(&started, &at)
                ),
                _ => writeln!(self.out, "ERROR,{},ERROR,ERROR,0.000", self.query_count),
            }
        } else {
            match self.open_views.entry(entry.thread_id) {
                Entry::Vacant(slot) => {
                    slot.insert(at);
                    Ok(())
                }
                Entry::Occupied(_) => writeln!(
                    self.out,
                    "ERROR,{},VIEW CREATED EXPECTED,ERROR,0.000",
                    self.query_count
                ),
            }
        }
    }
}

impl<W: Write> ResponseProcessor for MdxViewTimer<W> {
    fn process(&mut self, body: &[u8]) -> Result<Continuation, ProcessError> {
        let page = CollectionPage::<MessageLogEntry>::from_slice(body)?;

        tracing::debug!(entries = page.value.len(), "Processing message log entries");
        for entry in &page.value {
            self.record(entry)?;
        }
        self.out.flush()?;

        Ok(page.continuation())
    }
}

/// RFC 3339 with as many fractional digits as needed and `Z` for UTC.
fn format_time(at: &DateTime<FixedOffset>) -> String {
    let mut formatted = at.format("%Y-%m-%dT%H:%M:%S").to_string();

    let nanos = at.nanosecond() % 1_000_000_000;
    if nanos > 0 {
        let fraction = format!("{nanos:09}");
        formatted.push('.');
        formatted.push_str(fraction.trim_end_matches('0'));
    }

    if at.offset().local_minus_utc() == 0 {
        formatted.push('Z');
    } else {
        formatted.push_str(&at.format("%:z").to_string());
    }
    formatted
}

#[allow(clippy::cast_precision_loss)]
fn seconds_between(start: &DateTime<FixedOffset>, end: &DateTime<FixedOffset>) -> f64 {
    let elapsed = end.signed_duration_since(*start);
    elapsed
        .num_microseconds()
        .map_or(elapsed.num_milliseconds() as f64 / 1e3, |us| us as f64 / 1e6)
}
