//! Timestamp helpers.
//!
//! Persisted files written by older tools carry naive ISO-8601 timestamps
//! without an offset. Those are read as UTC; everything written back uses
//! RFC 3339.

use chrono::{DateTime, NaiveDateTime, Utc};

/// Timestamp type
pub type Time = DateTime<Utc>;

/// Current time.
pub fn now() -> Time {
    Utc::now()
}

/// Parse an ISO-8601 timestamp, with or without an offset.
pub fn parse_timestamp(s: &str) -> Option<Time> {
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Some(t.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Format a timestamp the way it is persisted.
pub fn format_timestamp(t: &Time) -> String {
    t.to_rfc3339()
}

/// Seconds between two timestamps, with sub-second precision.
pub fn seconds_between(start: &Time, end: &Time) -> f64 {
    (*end - *start).num_milliseconds() as f64 / 1000.0
}

/// Serde adapter for a required timestamp.
pub mod flexible {
    use super::{format_timestamp, parse_timestamp, Time};
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    /// Serialize as RFC 3339.
    pub fn serialize<S: Serializer>(t: &Time, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&format_timestamp(t))
    }

    /// Deserialize from RFC 3339 or naive ISO-8601.
    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Time, D::Error> {
        let raw = String::deserialize(d)?;
        parse_timestamp(&raw).ok_or_else(|| D::Error::custom(format!("invalid timestamp: {raw}")))
    }
}

/// Serde adapter for an optional timestamp.
pub mod flexible_option {
    use super::{format_timestamp, parse_timestamp, Time};
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    /// Serialize as RFC 3339 or null.
    pub fn serialize<S: Serializer>(t: &Option<Time>, s: S) -> Result<S::Ok, S::Error> {
        match t {
            Some(t) => s.serialize_str(&format_timestamp(t)),
            None => s.serialize_none(),
        }
    }

    /// Deserialize from RFC 3339, naive ISO-8601 or null.
    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Time>, D::Error> {
        match Option::<String>::deserialize(d)? {
            Some(raw) => parse_timestamp(&raw)
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("invalid timestamp: {raw}"))),
            None => Ok(None),
        }
    }
}

/// Serde adapter for a map of name to timestamp.
pub mod flexible_map {
    use super::{format_timestamp, parse_timestamp, Time};
    use serde::{de::Error, ser::SerializeMap, Deserialize, Deserializer, Serializer};
    use std::collections::BTreeMap;

    /// Serialize values as RFC 3339.
    pub fn serialize<S: Serializer>(map: &BTreeMap<String, Time>, s: S) -> Result<S::Ok, S::Error> {
        let mut out = s.serialize_map(Some(map.len()))?;
        for (k, v) in map {
            out.serialize_entry(k, &format_timestamp(v))?;
        }
        out.end()
    }

    /// Deserialize values from RFC 3339 or naive ISO-8601.
    pub fn deserialize<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<BTreeMap<String, Time>, D::Error> {
        BTreeMap::<String, String>::deserialize(d)?
            .into_iter()
            .map(|(k, raw)| {
                parse_timestamp(&raw)
                    .map(|t| (k, t))
                    .ok_or_else(|| D::Error::custom(format!("invalid timestamp: {raw}")))
            })
            .collect()
    }
}
