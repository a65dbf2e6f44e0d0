//! Time and duration helpers.
//!
//! The server stamps wire payloads with wall-clock timestamps; local state
//! interpolates with monotonic clocks. The conversions here are saturating
//! and never panic.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use std::time::Duration;

/// Extension trait for safe `Duration` conversions.
pub trait DurationExt {
    /// Convert duration to milliseconds as u64, saturating at `u64::MAX`.
    ///
    /// In practice, this is always safe because durations exceeding `u64::MAX`
    /// milliseconds would represent ~584 million years.
    fn as_millis_u64(&self) -> u64;
}

impl DurationExt for Duration {
    fn as_millis_u64(&self) -> u64 {
        u64::try_from(self.as_millis()).unwrap_or(u64::MAX)
    }
}

/// Parse a server-issued timestamp.
///
/// The service emits ISO-8601 both with an explicit offset and as a naive
/// UTC string (`2026-08-06T12:34:56.789`). Naive timestamps are interpreted
/// as UTC.
#[must_use]
pub fn parse_server_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    raw.parse::<NaiveDateTime>()
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Local playback offset matching a server-declared start time.
///
/// A `started_at` in the past yields the elapsed wall time; a `started_at`
/// at or after `now` yields zero. Never negative.
#[must_use]
pub fn start_offset(started_at: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (now - started_at).to_std().unwrap_or(Duration::ZERO)
}
