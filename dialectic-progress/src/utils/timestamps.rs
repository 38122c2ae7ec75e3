//! Timestamp helpers.

use chrono::{DateTime, SecondsFormat, Utc};

/// A UTC timestamp.
pub type Timestamp = DateTime<Utc>;

/// Returns the current UTC time as an RFC 3339 string with millisecond precision.
///
/// Matches the `lastRenderAtIso` form the remote service writes:
/// `YYYY-MM-DDTHH:MM:SS.sssZ`.
///
/// # Examples
///
/// ```
/// use dialectic_progress::utils::iso_timestamp;
///
/// let ts = iso_timestamp();
/// assert!(ts.contains('T'));
/// assert!(ts.ends_with('Z'));
/// ```
#[must_use]
pub fn iso_timestamp() -> String {
    format_iso(&now_utc())
}

/// Formats a timestamp in the `lastRenderAtIso` form.
#[must_use]
pub fn format_iso(timestamp: &Timestamp) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Returns the current UTC timestamp.
#[must_use]
pub fn now_utc() -> Timestamp {
    Utc::now()
}

/// Parses an RFC 3339 timestamp, returning `None` when malformed.
#[must_use]
pub fn parse_iso(value: &str) -> Option<Timestamp> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc3339(trimmed)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
