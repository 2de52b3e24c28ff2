//! UTC timestamp helpers

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::error::{Error, Result};

/// Pattern of every timestamp the service emits
pub const ISO8601_PATTERN: &str = "%Y-%m-%dT%H:%M:%SZ";

pub fn current_utc() -> DateTime<Utc> {
    Utc::now()
}

/// `2024-03-01T12:30:00Z`, second precision
pub fn to_iso8601_utc(dt: &DateTime<Utc>) -> String {
    dt.format(ISO8601_PATTERN).to_string()
}

/// Parse a timestamp in [`ISO8601_PATTERN`] form
pub fn from_iso8601_utc(value: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value.trim(), ISO8601_PATTERN)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Parse and re-format a UTC timestamp
///
/// # Errors
///
/// [`Error::BadRequest`] when `value` is not in [`ISO8601_PATTERN`] form.
pub fn format_date_time(value: &str) -> Result<String> {
    from_iso8601_utc(value)
        .map(|dt| to_iso8601_utc(&dt))
        .ok_or_else(|| Error::BadRequest(format!("invalid date time: {}", value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_to_iso8601_utc() {
        let dt = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 5).unwrap();
        assert_eq!(to_iso8601_utc(&dt), "2024-03-01T12:30:05Z");
    }

    #[test]
    fn test_format_date_time() {
        assert_eq!(
            format_date_time(" 2024-03-01T12:30:05Z").unwrap(),
            "2024-03-01T12:30:05Z"
        );
        assert!(matches!(
            format_date_time("01/03/2024"),
            Err(Error::BadRequest(_))
        ));
    }

    #[test]
    fn test_current_utc_round_trips_at_second_precision() {
        let now = current_utc();
        let parsed = from_iso8601_utc(&to_iso8601_utc(&now)).unwrap();
        assert_eq!(parsed.timestamp(), now.timestamp());
    }
}
