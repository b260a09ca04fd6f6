//! Parsers for the time window flags.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use std::time::Duration;

use crate::config::ConfigError;

/// Layout accepted by `--start` and `--end`, always read as UTC
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, ConfigError> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
        .map(|naive| Utc.from_utc_datetime(&naive))
        .map_err(|_| ConfigError::Timestamp {
            value: value.to_string(),
        })
}

/// Parse a step such as `30s`, `1m30s`, `1.5h` or `250ms`.
///
/// Accepts the units `ns`, `us` (`µs`), `ms`, `s`, `m` and `h`. Every number
/// needs a unit and the total must be positive.
pub fn parse_duration(value: &str) -> Result<Duration, ConfigError> {
    let invalid = |reason: String| ConfigError::Duration {
        value: value.to_string(),
        reason,
    };

    let mut rest = value.trim();
    if rest.is_empty() {
        return Err(invalid("empty duration".to_string()));
    }
    if rest.starts_with('-') {
        return Err(invalid("step must be positive".to_string()));
    }
    rest = rest.strip_prefix('+').unwrap_or(rest);

    let mut nanos = 0f64;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if number_len == 0 {
            return Err(invalid(format!("expected a number at {:?}", rest)));
        }
        let number: f64 = rest[..number_len]
            .parse()
            .map_err(|_| invalid(format!("malformed number {:?}", &rest[..number_len])))?;
        rest = &rest[number_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let scale = match &rest[..unit_len] {
            "ns" => 1.0,
            "us" | "µs" | "μs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60e9,
            "h" => 3600e9,
            "" => return Err(invalid("missing unit".to_string())),
            unit => return Err(invalid(format!("unknown unit {:?}", unit))),
        };
        nanos += number * scale;
        rest = &rest[unit_len..];
    }

    if nanos < 1.0 {
        return Err(invalid("step must be positive".to_string()));
    }
    Ok(Duration::from_nanos(nanos.round() as u64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_timestamp() {
        let ts = parse_timestamp("2024-03-01T12:30:45").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 45).unwrap());

        for bad in ["2024-03-01", "2024-03-01 12:30:45", "2024-03-01T12:30:45Z", "yesterday"] {
            let err = parse_timestamp(bad).unwrap_err();
            assert!(matches!(err, ConfigError::Timestamp { .. }), "{}", bad);
        }
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("1m").unwrap(), Duration::from_secs(60));
        assert_eq!(parse_duration("1m30s").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_duration("1.5s").unwrap(), Duration::from_millis(1500));
        assert_eq!(parse_duration("2h45m").unwrap(), Duration::from_secs(9900));
        assert_eq!(parse_duration("10µs").unwrap(), Duration::from_micros(10));
    }

    #[test]
    fn test_parse_duration_rejects() {
        for bad in ["", "10", "5d", "-1m", "0s", "m", "1..5s", "1m 30s"] {
            let err = parse_duration(bad).unwrap_err();
            assert!(matches!(err, ConfigError::Duration { .. }), "{}", bad);
        }

        let err = parse_duration("5d").unwrap_err();
        assert_eq!(err.to_string(), "Invalid duration \"5d\": unknown unit \"d\"");
    }
}
