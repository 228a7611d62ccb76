pub type ConsoleInstant = hifitime::Epoch;
pub type ConsoleDuration = hifitime::Duration;

use hifitime::{UNIX_REF_EPOCH, Unit};
use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::tag,
    character::complete::digit1,
    combinator::{all_consuming, map_res, value},
    multi::many1,
};

pub trait ConsoleInstantExt {
    fn from_unix_seconds_f64(timestamp: f64) -> Self;
    fn from_unix_milliseconds_i64(timestamp: i64) -> Self;
    /// Year, month, day-of-month and hour, in UTC.
    fn utc_hour_bucket(&self) -> (i32, u8, u8, u8);
    fn same_utc_hour(&self, other: &Self) -> bool;
}

impl ConsoleInstantExt for ConsoleInstant {
    fn from_unix_seconds_f64(timestamp: f64) -> Self {
        Self::from_unix_seconds(timestamp)
    }
    fn from_unix_milliseconds_i64(timestamp: i64) -> Self {
        Self::from_utc_duration(UNIX_REF_EPOCH.to_utc_duration() + timestamp * Unit::Millisecond)
    }
    fn utc_hour_bucket(&self) -> (i32, u8, u8, u8) {
        let (year, month, day, hour, _, _, _) = self.to_gregorian_utc();
        (year, month, day, hour)
    }
    fn same_utc_hour(&self, other: &Self) -> bool {
        self.utc_hour_bucket() == other.utc_hour_bucket()
    }
}

/// Converts to a std duration for timers. Negative durations saturate to zero.
pub fn to_std_duration(duration: ConsoleDuration) -> std::time::Duration {
    std::time::Duration::from_secs_f64(duration.to_seconds().max(0.0))
}

fn duration_unit(input: &str) -> IResult<&str, (i64, Unit)> {
    // "ms" must be tried before "m"
    alt((
        value((1, Unit::Millisecond), tag("ms")),
        value((1, Unit::Second), tag("s")),
        value((1, Unit::Minute), tag("m")),
        value((1, Unit::Hour), tag("h")),
        value((1, Unit::Day), tag("d")),
        value((1, Unit::Week), tag("w")),
        value((365, Unit::Day), tag("y")),
    ))
    .parse(input)
}

fn duration_part(input: &str) -> IResult<&str, ConsoleDuration> {
    let (rest, (count, (factor, unit))) =
        (map_res(digit1, str::parse::<i64>), duration_unit).parse(input)?;
    Ok((rest, (count * factor) * unit))
}

/// Parses Prometheus-style durations such as `30s`, `1h30m` or `2w`.
pub fn parse_prometheus_duration(input: &str) -> Option<ConsoleDuration> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    match all_consuming(many1(duration_part)).parse(trimmed) {
        Ok((_, parts)) => Some(
            parts
                .into_iter()
                .fold(ConsoleDuration::ZERO, |acc, part| acc + part),
        ),
        Err(_) => None,
    }
}

/// Formats a duration the way [`parse_prometheus_duration`] reads it,
/// dropping sub-millisecond precision.
pub fn format_prometheus_duration(duration: ConsoleDuration) -> String {
    let mut remaining = (duration.to_seconds() * 1000.0).round() as i64;
    if remaining <= 0 {
        return "0s".to_string();
    }
    const UNITS: [(&str, i64); 6] = [
        ("w", 7 * 24 * 3600 * 1000),
        ("d", 24 * 3600 * 1000),
        ("h", 3600 * 1000),
        ("m", 60 * 1000),
        ("s", 1000),
        ("ms", 1),
    ];
    let mut out = String::new();
    for (suffix, millis) in UNITS {
        let count = remaining / millis;
        if count > 0 {
            out.push_str(&format!("{}{}", count, suffix));
            remaining -= count * millis;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send<T: Send>() {}

    #[test]
    fn test_send() {
        assert_send::<ConsoleInstant>();
    }

    #[test]
    fn test_milliseconds_roundtrip() {
        let test_cases: &[i64] = &[1000, 1704067200000, 1704067200123];

        for &input_ms in test_cases {
            let epoch = ConsoleInstant::from_unix_milliseconds_i64(input_ms);
            let output_ms = epoch.to_unix_milliseconds().round() as i64;
            assert_eq!(
                input_ms, output_ms,
                "from_unix_milliseconds_i64 should roundtrip for {}",
                input_ms
            );
        }
    }

    #[test]
    fn test_same_utc_hour() {
        let a = ConsoleInstant::from_gregorian_utc_hms(2024, 3, 10, 14, 0, 5);
        let b = ConsoleInstant::from_gregorian_utc_hms(2024, 3, 10, 14, 59, 59);
        let c = ConsoleInstant::from_gregorian_utc_hms(2024, 3, 10, 15, 0, 0);
        let d = ConsoleInstant::from_gregorian_utc_hms(2024, 3, 11, 14, 10, 0);

        assert!(a.same_utc_hour(&b));
        assert!(!a.same_utc_hour(&c));
        assert!(!a.same_utc_hour(&d));
        assert_eq!(a.utc_hour_bucket(), (2024, 3, 10, 14));
    }

    #[test]
    fn test_parse_prometheus_duration() {
        assert_eq!(
            parse_prometheus_duration("30s"),
            Some(ConsoleDuration::from_seconds(30.0))
        );
        assert_eq!(
            parse_prometheus_duration("1h30m"),
            Some(ConsoleDuration::from_seconds(5400.0))
        );
        assert_eq!(
            parse_prometheus_duration("2w"),
            Some(ConsoleDuration::from_seconds(14.0 * 86400.0))
        );
        assert_eq!(
            parse_prometheus_duration("250ms"),
            Some(ConsoleDuration::from_seconds(0.25))
        );
        assert_eq!(
            parse_prometheus_duration("1y"),
            Some(ConsoleDuration::from_seconds(365.0 * 86400.0))
        );
        assert_eq!(parse_prometheus_duration(""), None);
        assert_eq!(parse_prometheus_duration("5"), None);
        assert_eq!(parse_prometheus_duration("5x"), None);
        assert_eq!(parse_prometheus_duration("h"), None);
    }

    #[test]
    fn test_format_prometheus_duration() {
        assert_eq!(
            format_prometheus_duration(ConsoleDuration::from_seconds(5400.0)),
            "1h30m"
        );
        assert_eq!(
            format_prometheus_duration(ConsoleDuration::from_seconds(50.0 * 3600.0)),
            "2d2h"
        );
        assert_eq!(format_prometheus_duration(ConsoleDuration::ZERO), "0s");
        let parsed = parse_prometheus_duration("1w2d3h4m5s6ms").unwrap();
        assert_eq!(format_prometheus_duration(parsed), "1w2d3h4m5s6ms");
    }
}
