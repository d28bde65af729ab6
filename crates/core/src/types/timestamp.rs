//! Serde helpers for backend timestamps.
//!
//! The backend emits ISO 8601 timestamps, sometimes with an offset
//! (`2024-03-01T10:00:00Z`) and sometimes without one
//! (`2024-03-01T10:00:00.123`). Timestamps without an offset are UTC.
//!
//! Use with `#[serde(with = "shop_smart_core::types::timestamp")]`.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serializer};

/// Parse a backend timestamp, accepting RFC 3339 or a naive UTC timestamp.
///
/// # Errors
///
/// Returns the naive-format parse error if neither format matches.
pub fn parse(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f").map(|naive| naive.and_utc())
}

/// Serialize as RFC 3339.
///
/// # Errors
///
/// Propagates serializer errors.
pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&value.to_rfc3339())
}

/// Deserialize from either supported format.
///
/// # Errors
///
/// Returns a custom error if the string is not a recognized timestamp.
pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse(&raw).map_err(serde::de::Error::custom)
}
