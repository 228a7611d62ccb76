use super::{ConsoleDuration, ConsoleInstant};

/// Half-open interval `[end - duration, end)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeWindow {
    pub end: ConsoleInstant,
    pub duration: ConsoleDuration,
}

impl TimeWindow {
    pub fn new(end: ConsoleInstant, duration: ConsoleDuration) -> Self {
        Self { end, duration }
    }

    pub fn start(&self) -> ConsoleInstant {
        self.end - self.duration
    }

    pub fn contains(&self, instant: ConsoleInstant) -> bool {
        instant >= self.start() && instant < self.end
    }
}

/// Closed time domain shown by a chart, `from` to `to`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeRange {
    pub from: ConsoleInstant,
    pub to: ConsoleInstant,
}

impl TimeRange {
    pub fn new(from: ConsoleInstant, to: ConsoleInstant) -> Self {
        Self { from, to }
    }

    pub fn ending_at(end: ConsoleInstant, span: ConsoleDuration) -> Self {
        Self {
            from: end - span,
            to: end,
        }
    }

    pub fn span(&self) -> ConsoleDuration {
        self.to - self.from
    }
}
