use std::collections::HashSet;

use hifitime::Unit;

use crate::datamodel::{ConsoleDuration, ConsoleInstant, LabelSet, TimeRange};

/// What the surrounding application tells a view about how to poll.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    pub span: ConsoleDuration,
    /// A fixed end time makes the view non-live.
    pub end_time: Option<ConsoleInstant>,
    /// Explicit interval, otherwise derived from the span.
    pub poll_interval: Option<ConsoleDuration>,
    pub hidden: bool,
    disabled_series: HashSet<String>,
}

impl Default for ViewState {
    fn default() -> Self {
        Self::new(30 * Unit::Minute)
    }
}

impl ViewState {
    pub fn new(span: ConsoleDuration) -> Self {
        Self {
            span,
            end_time: None,
            poll_interval: None,
            hidden: false,
            disabled_series: HashSet::new(),
        }
    }

    pub fn is_live(&self) -> bool {
        self.end_time.is_none()
    }

    /// Ticks only fire for visible live views.
    pub fn is_polling(&self) -> bool {
        self.is_live() && !self.hidden
    }

    /// `max(span / 120, min_interval)` unless an interval is configured.
    pub fn effective_poll_interval(&self, min_interval: ConsoleDuration) -> ConsoleDuration {
        match self.poll_interval {
            Some(interval) => interval,
            None => {
                let derived = ConsoleDuration::from_seconds(self.span.to_seconds() / 120.0);
                if derived > min_interval {
                    derived
                } else {
                    min_interval
                }
            }
        }
    }

    pub fn domain(&self, now: ConsoleInstant) -> TimeRange {
        TimeRange::ending_at(self.end_time.unwrap_or(now), self.span)
    }

    pub fn set_series_disabled(&mut self, labels: &LabelSet, disabled: bool) -> bool {
        let key = labels.canonical_key();
        if disabled {
            self.disabled_series.insert(key)
        } else {
            self.disabled_series.remove(&key)
        }
    }

    pub fn is_series_disabled(&self, labels: &LabelSet) -> bool {
        self.disabled_series.contains(&labels.canonical_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_poll_interval() {
        let min = 15 * Unit::Second;
        let mut view = ViewState::new(30 * Unit::Minute);
        assert_eq!(view.effective_poll_interval(min), min);

        view.span = 24 * Unit::Hour;
        assert_eq!(view.effective_poll_interval(min), 12 * Unit::Minute);

        view.poll_interval = Some(5 * Unit::Second);
        assert_eq!(view.effective_poll_interval(min), 5 * Unit::Second);
    }

    #[test]
    fn test_polling_suspension() {
        let mut view = ViewState::default();
        assert!(view.is_polling());
        view.hidden = true;
        assert!(!view.is_polling());
        view.hidden = false;
        view.end_time = Some(ConsoleInstant::from_unix_seconds(1000.0));
        assert!(!view.is_live());
        assert!(!view.is_polling());
    }

    #[test]
    fn test_disabled_series_match_structurally() {
        let mut view = ViewState::default();
        let a: LabelSet = [("pod", "a"), ("ns", "x")].into_iter().collect();
        let same: LabelSet = [("ns", "x"), ("pod", "a")].into_iter().collect();

        assert!(view.set_series_disabled(&a, true));
        assert!(view.is_series_disabled(&same));
        assert!(view.set_series_disabled(&same, false));
        assert!(!view.is_series_disabled(&a));
    }

    #[test]
    fn test_domain() {
        let mut view = ViewState::new(60 * Unit::Second);
        let now = ConsoleInstant::from_unix_seconds(1000.0);
        assert_eq!(view.domain(now).from, ConsoleInstant::from_unix_seconds(940.0));

        view.end_time = Some(ConsoleInstant::from_unix_seconds(500.0));
        assert_eq!(view.domain(now).to, ConsoleInstant::from_unix_seconds(500.0));
    }
}
