//! Timestamp utilities

use chrono::{DateTime, SecondsFormat, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Format a timestamp as ISO-8601 with microsecond precision
pub fn to_iso8601(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_now_returns_recent_timestamp() {
        let timestamp = now();
        // Between 2000-01-01 and 2100-01-01
        assert!(timestamp.timestamp() > 946_684_800);
        assert!(timestamp.timestamp() < 4_102_444_800);
    }

    #[test]
    fn test_iso8601_format() {
        let timestamp = Utc.with_ymd_and_hms(2025, 3, 23, 12, 30, 0).unwrap();
        assert_eq!(to_iso8601(&timestamp), "2025-03-23T12:30:00.000000Z");
    }

    #[test]
    fn test_iso8601_parses_back() {
        let timestamp = now();
        let text = to_iso8601(&timestamp);
        let parsed = DateTime::parse_from_rfc3339(&text).unwrap();
        assert_eq!(parsed.timestamp(), timestamp.timestamp());
    }
}
