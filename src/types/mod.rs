//! Wire types shared with the Taskdeck server.
//!
//! Field names follow the server's JSON (`snake_case`); camelCase spellings
//! are accepted on input as aliases.

pub mod task;
pub mod user;

pub use task::*;
pub use user::*;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Parses a server timestamp into UTC.
///
/// Accepts RFC 3339 (`2024-01-01T10:00:00Z`), naive date-times which the
/// server emits in UTC (`2024-01-01T10:00:00.123456`), and bare dates
/// (`2024-01-01`, read as midnight). Returns `None` for anything else.
///
/// # Examples
///
/// ```
/// use taskdeck::types::parse_timestamp;
///
/// assert!(parse_timestamp("2024-01-01").is_some());
/// assert!(parse_timestamp("2024-01-01T10:00:00.5").is_some());
/// assert!(parse_timestamp("yesterday").is_none());
/// ```
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
