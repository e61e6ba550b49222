// Duration helpers.
//
// Mute durations arrive as short strings ("30m", "1h30m", "90s") from config
// and from the `/mute` command, and expiries are stored as UTC instants.

use chrono::{DateTime, Utc};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum DurationParseError {
    #[error("empty duration")]
    Empty,

    #[error("invalid duration: {0:?}")]
    Invalid(String),

    #[error("missing unit in duration {0:?}")]
    MissingUnit(String),

    #[error("unknown unit {unit:?} in duration {input:?}")]
    UnknownUnit { unit: String, input: String },
}

/// Parse a duration such as `"300ms"`, `"90s"`, `"1.5h"` or `"2h45m"`.
///
/// Accepted units are `ns`, `us`/`µs`, `ms`, `s`, `m` and `h`. A bare `"0"` is
/// accepted; any other number needs a unit. Negative durations are rejected.
pub fn parse_duration(input: &str) -> Result<Duration, DurationParseError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(DurationParseError::Empty);
    }
    if trimmed == "0" {
        return Ok(Duration::ZERO);
    }

    let is_number_char = |c: char| c.is_ascii_digit() || c == '.';
    let mut rest = trimmed;
    let mut total_secs = 0f64;

    while !rest.is_empty() {
        let number_end = rest.find(|c: char| !is_number_char(c)).unwrap_or(rest.len());
        if number_end == 0 {
            return Err(DurationParseError::Invalid(trimmed.to_string()));
        }
        let value: f64 = rest[..number_end]
            .parse()
            .map_err(|_| DurationParseError::Invalid(trimmed.to_string()))?;
        rest = &rest[number_end..];

        let unit_end = rest.find(is_number_char).unwrap_or(rest.len());
        let unit = &rest[..unit_end];
        let scale = match unit {
            "" => return Err(DurationParseError::MissingUnit(trimmed.to_string())),
            "ns" => 1e-9,
            "us" | "µs" => 1e-6,
            "ms" => 1e-3,
            "s" => 1.0,
            "m" => 60.0,
            "h" => 3600.0,
            other => {
                return Err(DurationParseError::UnknownUnit {
                    unit: other.to_string(),
                    input: trimmed.to_string(),
                })
            }
        };
        total_secs += value * scale;
        rest = &rest[unit_end..];
    }

    Duration::try_from_secs_f64(total_secs)
        .map_err(|_| DurationParseError::Invalid(trimmed.to_string()))
}

/// Render a duration compactly, e.g. `1h30m0s`, `45s` or `250ms`.
pub fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    if total == 0 {
        return format!("{}ms", duration.as_millis());
    }

    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;

    let mut out = String::new();
    if hours > 0 {
        out.push_str(&format!("{hours}h"));
    }
    if hours > 0 || minutes > 0 {
        out.push_str(&format!("{minutes}m"));
    }
    out.push_str(&format!("{seconds}s"));
    out
}

/// `at + duration`, saturating at the largest representable instant.
pub fn add_to(at: DateTime<Utc>, duration: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(duration)
        .ok()
        .and_then(|delta| at.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// `at - duration`, saturating at the smallest representable instant.
pub fn subtract_from(at: DateTime<Utc>, duration: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(duration)
        .ok()
        .and_then(|delta| at.checked_sub_signed(delta))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_units() {
        assert_eq!(parse_duration("90s").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_duration("30m").unwrap(), Duration::from_secs(1800));
        assert_eq!(parse_duration("2h").unwrap(), Duration::from_secs(7200));
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
    }

    #[test]
    fn test_parse_compound_and_fractional() {
        assert_eq!(parse_duration("1h30m").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_duration("1.5h").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_duration(" 0 ").unwrap(), Duration::ZERO);
    }

    #[test]
    fn test_parse_rejects_malformed_input() {
        assert_eq!(parse_duration(""), Err(DurationParseError::Empty));
        assert!(matches!(
            parse_duration("10"),
            Err(DurationParseError::MissingUnit(_))
        ));
        assert!(matches!(
            parse_duration("5d"),
            Err(DurationParseError::UnknownUnit { .. })
        ));
        assert!(matches!(
            parse_duration("-5m"),
            Err(DurationParseError::Invalid(_))
        ));
        assert!(matches!(
            parse_duration("abc"),
            Err(DurationParseError::Invalid(_))
        ));
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(5400)), "1h30m0s");
        assert_eq!(format_duration(Duration::from_secs(45)), "45s");
        assert_eq!(format_duration(Duration::from_secs(600)), "10m0s");
        assert_eq!(format_duration(Duration::from_millis(250)), "250ms");
    }

    #[test]
    fn test_add_to_saturates() {
        let now = Utc::now();
        assert_eq!(add_to(now, Duration::MAX), DateTime::<Utc>::MAX_UTC);
        assert_eq!(
            add_to(now, Duration::from_secs(60)),
            now + chrono::Duration::seconds(60)
        );
    }
}
