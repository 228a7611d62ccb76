use serde::{Deserialize, Serialize};

use super::{ConsoleInstant, ConsoleInstantExt, LabelSet, SamplePoint, SampleValue};

/// A raw `[epochSeconds, "value"]` pair, exactly as the backend sends it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawValue(pub f64, pub String);

impl RawValue {
    pub fn new(timestamp: f64, value: impl Into<String>) -> Self {
        Self(timestamp, value.into())
    }

    pub fn timestamp(&self) -> f64 {
        self.0
    }

    pub fn value(&self) -> &str {
        &self.1
    }

    /// Two pairs are duplicates iff both timestamp and value are equal.
    pub fn dedup_key(&self) -> (u64, &str) {
        // -0.0 and 0.0 are the same instant
        let timestamp = if self.0 == 0.0 { 0.0 } else { self.0 };
        (timestamp.to_bits(), self.1.as_str())
    }

    pub fn to_sample_point(&self) -> SamplePoint {
        SamplePoint {
            datetime: ConsoleInstant::from_unix_seconds_f64(self.0),
            value: SampleValue::parse(&self.1),
        }
    }
}

/// One series of a `matrix` result: its labels and raw values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawObservation {
    pub metric: LabelSet,
    #[serde(default)]
    pub values: Vec<RawValue>,
}

impl RawObservation {
    pub fn new(metric: LabelSet, values: Vec<RawValue>) -> Self {
        Self { metric, values }
    }

    pub fn label(&self, name: &str) -> Option<&str> {
        self.metric.get(name)
    }
}
