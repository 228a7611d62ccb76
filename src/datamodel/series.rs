use super::{LabelSet, RawObservation, SamplePoint};

/// A typed series: labels plus points with strictly increasing timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub labels: LabelSet,
    pub points: Vec<SamplePoint>,
}

impl Series {
    /// Builds a series from raw values, ordering them by time.
    /// When a timestamp repeats, the first value seen wins.
    pub fn from_observation(observation: &RawObservation) -> Self {
        let mut raw: Vec<_> = observation.values.iter().collect();
        // Stable sort keeps arrival order among equal timestamps
        raw.sort_by(|a, b| a.timestamp().total_cmp(&b.timestamp()));
        raw.dedup_by(|later, earlier| later.timestamp() == earlier.timestamp());

        Self {
            labels: observation.metric.clone(),
            points: raw.into_iter().map(|value| value.to_sample_point()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
