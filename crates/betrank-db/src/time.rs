//! Timestamps are stored as UTC text in SQLite's `datetime()` layout so
//! they compare lexicographically and match `DEFAULT (datetime('now'))`.

use chrono::{DateTime, NaiveDateTime, Utc};

pub const DB_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn format_ts(ts: DateTime<Utc>) -> String {
    ts.format(DB_FORMAT).to_string()
}

/// Parse a stored timestamp. Accepts RFC 3339 as well as the SQLite layout.
pub fn parse_ts(raw: &str) -> Option<DateTime<Utc>> {
    raw.parse::<DateTime<Utc>>()
        .ok()
        .or_else(|| NaiveDateTime::parse_from_str(raw, DB_FORMAT).ok().map(|ndt| ndt.and_utc()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn sqlite_layout_roundtrips() {
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 15).unwrap();
        assert_eq!(format_ts(ts), "2024-05-01 08:30:15");
        assert_eq!(parse_ts("2024-05-01 08:30:15"), Some(ts));
        assert_eq!(parse_ts("not a date"), None);
    }
}
