//! Timestamp normalization.
//!
//! Stored documents carry `createdAt`/`updatedAt` values in several legacy
//! encodings: a `{seconds, nanoseconds}` pair (with underscore-prefixed
//! variants from older exports), a numeric epoch, or an ISO-ish string. All
//! sorting and display goes through this single boundary so pagination
//! behaves consistently regardless of how a document was written.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// A timestamp as found in stored documents.
///
/// The variants cover every encoding observed in production data. Values
/// that match none of them deserialize into `Opaque` and normalize to `0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawTimestamp {
    /// `{seconds, nanoseconds}` pair, optionally underscore-prefixed.
    SecondsNanos {
        #[serde(alias = "_seconds")]
        seconds: i64,
        #[serde(default, alias = "_nanoseconds")]
        nanoseconds: i64,
    },
    /// Numeric epoch milliseconds.
    EpochMillis(f64),
    /// ISO-ish string.
    Text(String),
    /// Anything else; never matches a real instant.
    Opaque(serde_json::Value),
}

impl RawTimestamp {
    /// Current instant in the canonical write encoding (RFC 3339).
    pub fn now() -> Self {
        RawTimestamp::Text(Utc::now().to_rfc3339())
    }
}

/// Normalizes a raw timestamp to epoch milliseconds.
///
/// Never fails: unparseable input yields `0`, which sorts last in the
/// descending order used by listings.
pub fn normalize_timestamp(raw: &RawTimestamp) -> i64 {
    match raw {
        RawTimestamp::SecondsNanos {
            seconds,
            nanoseconds,
        } => seconds * 1000 + nanoseconds / 1_000_000,
        RawTimestamp::EpochMillis(ms) => *ms as i64,
        RawTimestamp::Text(text) => parse_text(text).unwrap_or(0),
        RawTimestamp::Opaque(_) => 0,
    }
}

/// Normalization for optional fields; missing values sort last.
pub fn normalize_optional(raw: Option<&RawTimestamp>) -> i64 {
    raw.map(normalize_timestamp).unwrap_or(0)
}

/// Display-oriented normalization to RFC 3339.
///
/// Used by the audit listing: a value that cannot be interpreted renders as
/// the current instant rather than a zero date. The fallback is display-only
/// and never written back.
pub fn to_rfc3339_or_now(raw: Option<&RawTimestamp>) -> String {
    let millis = normalize_optional(raw);
    let instant = if millis > 0 {
        DateTime::<Utc>::from_timestamp_millis(millis).unwrap_or_else(Utc::now)
    } else {
        Utc::now()
    };
    instant.to_rfc3339()
}

/// Normalizes a raw JSON value (as found in schemaless document data)
/// without requiring the caller to name the encoding.
pub fn normalize_value(value: &serde_json::Value) -> i64 {
    serde_json::from_value::<RawTimestamp>(value.clone())
        .map(|raw| normalize_timestamp(&raw))
        .unwrap_or(0)
}

fn parse_text(text: &str) -> Option<i64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.timestamp_millis());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc().timestamp_millis());
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(date.and_hms_opt(0, 0, 0)?.and_utc().timestamp_millis());
    }
    None
}
