//! Timestamp parsing for export headers and client queries.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Timelike};

/// Header formats, tried in order: two-digit year first, then four-digit.
const EXPORT_FORMATS: [&str; 2] = ["%d/%m/%y %H:%M:%S", "%d/%m/%Y %H:%M:%S"];

/// Naive ISO 8601 variants accepted from clients.
const QUERY_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parse the `date` and `time` captured from a header line.
///
/// Returns `None` if neither format accepts the pair.
pub fn parse_export_timestamp(date: &str, time: &str) -> Option<NaiveDateTime> {
    let joined = format!("{date} {time}");
    EXPORT_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(&joined, fmt).ok())
        .map(truncate_subsec)
}

/// Parse a client-supplied target instant.
///
/// Accepts RFC 3339 (the wall-clock part is kept and the offset dropped, since
/// export timestamps carry no zone), naive ISO 8601 with `T` or space, and a
/// bare `YYYY-MM-DD` date meaning midnight. Sub-second parts are dropped.
pub fn parse_query_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(truncate_subsec(dt.naive_local()));
    }
    // A `+hh:mm` offset arrives as a space when the query string was not encoded.
    if raw.contains('T') && raw.contains(' ') {
        if let Ok(dt) = DateTime::parse_from_rfc3339(&raw.replace(' ', "+")) {
            return Some(truncate_subsec(dt.naive_local()));
        }
    }

    if let Some(dt) = QUERY_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
    {
        return Some(truncate_subsec(dt));
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Drop anything below one second.
pub fn truncate_subsec(dt: NaiveDateTime) -> NaiveDateTime {
    dt.with_nanosecond(0).unwrap_or(dt)
}
