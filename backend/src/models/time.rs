use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Error raised when a client-supplied timestamp cannot be interpreted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid date format")]
pub struct TimeParseError {
    pub input: String,
}

/// Timestamp as it arrives on the wire: either text or epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimeInput {
    Millis(i64),
    Text(String),
}

impl TimeInput {
    /// An empty string counts as "no timestamp supplied".
    pub fn is_blank(&self) -> bool {
        matches!(self, TimeInput::Text(s) if s.trim().is_empty())
    }
}

impl From<&str> for TimeInput {
    fn from(value: &str) -> Self {
        TimeInput::Text(value.to_string())
    }
}

impl From<DateTime<Utc>> for TimeInput {
    fn from(value: DateTime<Utc>) -> Self {
        TimeInput::Text(value.to_rfc3339())
    }
}

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Parse a client timestamp into a UTC instant.
///
/// Accepted forms:
/// - RFC 3339 (`2024-05-01T10:00:00Z`, `2024-05-01T12:00:00+02:00`)
/// - naive date-time, interpreted as UTC (`2024-05-01T10:00:00`)
/// - bare date, midnight UTC (`2024-05-01`)
/// - integer milliseconds since the Unix epoch
pub fn parse_instant(input: &TimeInput) -> Result<DateTime<Utc>, TimeParseError> {
    let invalid = || TimeParseError {
        input: match input {
            TimeInput::Millis(ms) => ms.to_string(),
            TimeInput::Text(s) => s.clone(),
        },
    };

    match input {
        TimeInput::Millis(ms) => DateTime::from_timestamp_millis(*ms).ok_or_else(invalid),
        TimeInput::Text(raw) => {
            let text = raw.trim();
            if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
                return Ok(dt.with_timezone(&Utc));
            }
            for format in NAIVE_FORMATS {
                if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
                    return Ok(naive.and_utc());
                }
            }
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .map(|naive| naive.and_utc())
                .ok_or_else(invalid)
        }
    }
}

/// Resolve an optional explicit timestamp, defaulting to `now` when absent or blank.
pub fn instant_or_now(
    input: Option<&TimeInput>,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>, TimeParseError> {
    match input {
        Some(value) if !value.is_blank() => parse_instant(value),
        _ => Ok(now),
    }
}

/// Elapsed seconds between two instants; negative when `end` precedes `start`.
pub fn elapsed_seconds(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    (end - start).num_milliseconds() as f64 / 1000.0
}

#[cfg(test)]
#[path = "time_tests.rs"]
mod time_tests;
