use hifitime::Unit;

use crate::datamodel::{ConsoleDuration, TimeRange};

/// Converts a drag selection over a chart into a new time domain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomController {
    min_span: ConsoleDuration,
}

impl Default for ZoomController {
    fn default() -> Self {
        Self::new(30 * Unit::Second)
    }
}

impl ZoomController {
    pub fn new(min_span: ConsoleDuration) -> Self {
        Self { min_span }
    }

    /// Maps pixels `x1`..`x2` of a chart `width` pixels wide onto `domain`.
    ///
    /// `None` when the selection is a click (`x1 == x2`) or the chart has
    /// no width. Selections shorter than the minimum span grow around
    /// their midpoint.
    pub fn zoom(&self, x1: f64, x2: f64, width: f64, domain: TimeRange) -> Option<TimeRange> {
        if x1 == x2 || !(width > 0.0) {
            return None;
        }
        let (left, right) = if x1 < x2 { (x1, x2) } else { (x2, x1) };
        let left = left.clamp(0.0, width);
        let right = right.clamp(0.0, width);

        let span = domain.span().to_seconds();
        let from = domain.from + ConsoleDuration::from_seconds(span * left / width);
        let to = domain.from + ConsoleDuration::from_seconds(span * right / width);

        if to - from >= self.min_span {
            return Some(TimeRange::new(from, to));
        }
        let half = ConsoleDuration::from_seconds(self.min_span.to_seconds() / 2.0);
        let middle = from + ConsoleDuration::from_seconds((to - from).to_seconds() / 2.0);
        Some(TimeRange::new(middle - half, middle + half))
    }
}
