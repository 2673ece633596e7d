//! Quota State
//!
//! The persisted `{count, timestamp}` record and its time-window arithmetic.

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Generations consumed in the current window and when that window began
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaState {
    /// Generations consumed in the current window
    pub count: u32,

    /// Start of the current window
    #[serde(rename = "timestamp", deserialize_with = "deserialize_timestamp")]
    pub window_start: DateTime<Utc>,
}

impl QuotaState {
    /// Fresh state: nothing consumed, window starting at `now`
    pub fn fresh(now: DateTime<Utc>) -> Self {
        Self {
            count: 0,
            window_start: now,
        }
    }

    /// Whether more than `window` has elapsed since the window began
    pub fn is_expired(&self, now: DateTime<Utc>, window: Duration) -> bool {
        now.signed_duration_since(self.window_start) > window
    }

    /// Zero the count and restart the window at `now`
    pub fn reset(&mut self, now: DateTime<Utc>) {
        self.count = 0;
        self.window_start = now;
    }

    /// Pull a window start that lies in the future back to `now`
    pub fn clamp_to(mut self, now: DateTime<Utc>) -> Self {
        if self.window_start > now {
            self.window_start = now;
        }
        self
    }
}

/// Accepts RFC 3339 as well as the offset-less ISO-8601 form
/// (`2024-05-01T12:34:56.123456`), which is read as UTC.
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).map_err(serde::de::Error::custom)
}

pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| format!("invalid timestamp '{}': {}", raw, e))
}
