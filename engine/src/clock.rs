//! Timestamp handling for record freshness.
//!
//! The local replica and the server do not share a clock, and the server's
//! timestamps may arrive with or without sub-second precision. Freshness is
//! therefore compared with a tolerance window rather than exactly.

use crate::Timestamp;
use chrono::{NaiveDateTime, SecondsFormat, SubsecRound, TimeZone, Utc};

/// Default slack, in milliseconds, within which two timestamps are equal.
pub const DEFAULT_TOLERANCE_MS: i64 = 999;

/// Naive layouts accepted when a timestamp carries no offset (read as UTC).
const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Outcome of comparing a remote `updatedAt` with a local `updatedAtLocal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Remote copy is newer by more than the tolerance
    RemoteNewer,
    /// Local copy is newer by more than the tolerance
    LocalNewer,
    /// Difference is within the tolerance
    InSync,
    /// The remote side has no usable timestamp
    Unknown,
}

/// Compare remote and local timestamps as epoch milliseconds.
///
/// The tolerance is inclusive: a difference of exactly `tolerance_ms` is
/// still [`Freshness::InSync`]. A local copy without a usable stamp counts
/// as written at the epoch, so any stamped remote copy replaces it.
pub fn compare(
    remote: Option<Timestamp>,
    local: Option<Timestamp>,
    tolerance_ms: i64,
) -> Freshness {
    let Some(remote) = remote else {
        return Freshness::Unknown;
    };

    let remote_ms = remote.timestamp_millis();
    let local_ms = local.map_or(0, |local| local.timestamp_millis());

    if remote_ms > local_ms.saturating_add(tolerance_ms) {
        Freshness::RemoteNewer
    } else if local_ms > remote_ms.saturating_add(tolerance_ms) {
        Freshness::LocalNewer
    } else {
        Freshness::InSync
    }
}

/// The `updatedAtLocal` value for a local write at `now` (whole seconds).
pub fn local_stamp(now: Timestamp) -> Timestamp {
    now.trunc_subsecs(0)
}

/// Parse an ISO-8601 timestamp. Returns `None` for anything unparseable.
pub fn parse_timestamp(raw: &str) -> Option<Timestamp> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Format a timestamp as RFC 3339 UTC, with fractional seconds only when set.
pub fn format_timestamp(ts: &Timestamp) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Serde adapter for optional timestamps.
///
/// Deserialization never fails on a bad value: strings that do not parse,
/// booleans, objects and the like all become `None`. Integers are read as
/// epoch milliseconds.
pub mod iso8601 {
    use super::{format_timestamp, parse_timestamp};
    use crate::Timestamp;
    use chrono::{TimeZone, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<Timestamp>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(ts) => serializer.serialize_str(&format_timestamp(ts)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Timestamp>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(match value {
            serde_json::Value::String(raw) => parse_timestamp(&raw),
            serde_json::Value::Number(n) => n
                .as_i64()
                .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
            _ => None,
        })
    }
}
