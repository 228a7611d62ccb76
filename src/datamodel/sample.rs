use std::fmt;

use super::ConsoleInstant;

/// Numeric sample value, or the "no data" sentinel for values the backend
/// reported but that cannot be read as a number.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SampleValue {
    Number(f64),
    NoData,
}

impl SampleValue {
    /// Parses a backend value string. `NaN` and `+Inf` are numbers.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().parse::<f64>() {
            Ok(number) => SampleValue::Number(number),
            Err(_) => SampleValue::NoData,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SampleValue::Number(number) => Some(*number),
            SampleValue::NoData => None,
        }
    }
}

impl fmt::Display for SampleValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SampleValue::Number(number) => write!(f, "{}", number),
            SampleValue::NoData => f.write_str("no data"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SamplePoint {
    pub datetime: ConsoleInstant,
    pub value: SampleValue,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_values() {
        assert_eq!(SampleValue::parse("2"), SampleValue::Number(2.0));
        assert_eq!(SampleValue::parse(" 0.5 "), SampleValue::Number(0.5));
        assert_eq!(SampleValue::parse("+Inf"), SampleValue::Number(f64::INFINITY));
        assert!(SampleValue::parse("NaN").as_f64().unwrap().is_nan());
        assert_eq!(SampleValue::parse("pending"), SampleValue::NoData);
        assert_eq!(SampleValue::parse(""), SampleValue::NoData);
    }

    #[test]
    fn test_display() {
        assert_eq!(SampleValue::Number(3.5).to_string(), "3.5");
        assert_eq!(SampleValue::NoData.to_string(), "no data");
    }
}
