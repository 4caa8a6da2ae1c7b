//! Timestamp helpers for stage nodes and snapshot records.

use chrono::{DateTime, SecondsFormat, Utc};

/// Represents a timestamp that can be serialized/deserialized.
pub type Timestamp = DateTime<Utc>;

/// Returns the current UTC time as an ISO 8601 string with millisecond
/// precision and a `Z` suffix, e.g. `2024-05-01T12:30:45.123Z`.
#[must_use]
pub fn iso_timestamp() -> String {
    format_iso(&Utc::now())
}

/// Formats a timestamp the same way as [`iso_timestamp`].
#[must_use]
pub fn format_iso(ts: &Timestamp) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Returns the current UTC time in Unix milliseconds.
#[must_use]
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Returns the current UTC timestamp.
#[must_use]
pub fn now_utc() -> Timestamp {
    Utc::now()
}

/// Makes an ISO timestamp safe for use in a directory name.
///
/// `:` and `.` are replaced by `-`.
#[must_use]
pub fn path_safe(iso: &str) -> String {
    iso.replace([':', '.'], "-")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_iso_millis_z() {
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 45).unwrap()
            + chrono::Duration::milliseconds(123);
        assert_eq!(format_iso(&ts), "2024-05-01T12:30:45.123Z");
    }

    #[test]
    fn test_path_safe_replaces_separators() {
        assert_eq!(
            path_safe("2024-05-01T12:30:45.123Z"),
            "2024-05-01T12-30-45-123Z"
        );
    }

    #[test]
    fn test_now_millis_is_positive() {
        assert!(now_millis() > 1_600_000_000_000);
        assert!(iso_timestamp().ends_with('Z'));
        assert!(now_utc().timestamp() > 0);
    }
}
