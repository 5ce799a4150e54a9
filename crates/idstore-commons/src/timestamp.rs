//! Timestamp encoding for soft-delete markers.
//!
//! Index range keys must compare by string equality, so the `DeletedOn`
//! attribute always uses one fixed layout: RFC 3339, nine fractional digits,
//! `Z` suffix. A live record carries [`ZERO_TIMESTAMP`]; a deleted one carries
//! the deletion instant.
//!
//! In Rust the attribute is an `Option<DateTime<Utc>>`; use the [`soft_delete`]
//! module with `#[serde(with = "...")]` to get the stored layout.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};

/// Stored form of "not deleted".
pub const ZERO_TIMESTAMP: &str = "0001-01-01T00:00:00.000000000Z";

/// Returns the stored form of "not deleted" as an owned string.
pub fn zero_timestamp() -> String {
    ZERO_TIMESTAMP.to_string()
}

/// Formats an instant in the fixed index-key layout.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Stored `DeletedOn` value for an optional deletion instant.
pub fn deleted_on_key(deleted_on: Option<&DateTime<Utc>>) -> String {
    match deleted_on {
        Some(ts) => format_timestamp(ts),
        None => zero_timestamp(),
    }
}

/// Parses a stored `DeletedOn` value; the zero instant maps to `None`.
pub fn parse_deleted_on(raw: &str) -> Result<Option<DateTime<Utc>>, chrono::ParseError> {
    if raw == ZERO_TIMESTAMP {
        return Ok(None);
    }
    let parsed = DateTime::parse_from_rfc3339(raw)?.with_timezone(&Utc);
    let zero = NaiveDate::from_ymd_opt(1, 1, 1).and_then(|d| d.and_hms_opt(0, 0, 0));
    if Some(parsed.naive_utc()) == zero {
        Ok(None)
    } else {
        Ok(Some(parsed))
    }
}

/// Serde adapter for `Option<DateTime<Utc>>` soft-delete fields.
///
/// Pair with `#[serde(default)]` so records written before the field existed
/// still load as live.
pub mod soft_delete {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::deleted_on_key(value.as_ref()))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw {
            None => Ok(None),
            Some(raw) => super::parse_deleted_on(&raw).map_err(serde::de::Error::custom),
        }
    }
}
