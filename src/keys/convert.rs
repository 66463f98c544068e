//! Deterministic scalar converters
//!
//! Date/time values are stored as a count of 100ns ticks since
//! 0001-01-01T00:00:00Z, the layout shared by every node of the store.
//! Floating point values are stored as an `i64` whose signed ordering matches
//! the numeric ordering of the original `f64`.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Ticks (100ns intervals) per second
pub const TICKS_PER_SECOND: i64 = 10_000_000;

/// Seconds between 0001-01-01T00:00:00Z and the Unix epoch
const SECONDS_BEFORE_UNIX_EPOCH: i64 = 62_135_596_800;

/// Convert a UTC date/time into its tick count.
///
/// Saturates at the `i64` bounds for instants outside the representable range.
pub fn date_time_to_ticks(value: &DateTime<Utc>) -> i64 {
    let seconds = value.timestamp().saturating_add(SECONDS_BEFORE_UNIX_EPOCH);
    let sub_ticks = i64::from(value.timestamp_subsec_nanos() / 100);
    seconds
        .saturating_mul(TICKS_PER_SECOND)
        .saturating_add(sub_ticks)
}

/// Convert a calendar date into the tick count of its midnight (UTC).
pub fn date_to_ticks(value: &NaiveDate) -> i64 {
    date_time_to_ticks(&value.and_time(chrono::NaiveTime::MIN).and_utc())
}

/// Inverse of [`date_time_to_ticks`].
pub fn ticks_to_date_time(ticks: i64) -> Option<DateTime<Utc>> {
    let seconds = ticks.div_euclid(TICKS_PER_SECOND) - SECONDS_BEFORE_UNIX_EPOCH;
    let nanos = (ticks.rem_euclid(TICKS_PER_SECOND) * 100) as u32;
    DateTime::from_timestamp(seconds, nanos)
}

/// Parse the textual date/time forms accepted for date fields.
///
/// Accepts RFC 3339, naive `YYYY-MM-DDTHH:MM:SS[.f]` / `YYYY-MM-DD HH:MM:SS`
/// (taken as UTC) and plain `YYYY-MM-DD` dates.
pub fn parse_date_time(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .map(|date| date.and_time(chrono::NaiveTime::MIN).and_utc())
}

/// Order-preserving integer encoding of an `f64`.
///
/// `-0.0` is folded into `0.0` and every NaN into one canonical NaN, so equal
/// numbers always produce equal keys.
pub fn ordered_f64(value: f64) -> i64 {
    let canonical = if value == 0.0 {
        0.0
    } else if value.is_nan() {
        f64::NAN
    } else {
        value
    };

    let bits = canonical.to_bits() as i64;
    if bits < 0 {
        // Negative: keep the sign, invert the magnitude
        bits ^ i64::MAX
    } else {
        bits
    }
}
