use chrono::{DateTime, SecondsFormat, Utc};

/// Current time as a fixed-width RFC 3339 string.
///
/// Every stored timestamp goes through here so that lexical ordering in SQL
/// matches chronological ordering.
pub fn now_timestamp() -> String {
    to_timestamp(&Utc::now())
}

pub fn to_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M UTC").to_string()
}

/// Formats a stored timestamp for chat output, falling back to the raw value.
pub fn format_timestamp(raw: &str) -> String {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| format_datetime(&dt.with_timezone(&Utc)))
        .unwrap_or_else(|_| raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_timestamps_are_fixed_width() {
        let whole = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let fractional = whole + chrono::Duration::microseconds(1);

        let a = to_timestamp(&whole);
        let b = to_timestamp(&fractional);
        assert_eq!(a.len(), b.len());
        assert!(a < b);
        assert!(a.ends_with('Z'));
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp("2024-03-01T12:30:00.000000Z"), "2024-03-01 12:30 UTC");
        assert_eq!(format_timestamp("not a date"), "not a date");
    }
}
