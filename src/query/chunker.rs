use hifitime::Unit;

use crate::datamodel::{ConsoleDuration, ConsoleInstant, TimeWindow};

/// Splits a time span into fixed-size windows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeRangeChunker {
    chunk: ConsoleDuration,
}

impl Default for TimeRangeChunker {
    fn default() -> Self {
        Self::new(24 * Unit::Hour)
    }
}

impl TimeRangeChunker {
    /// Chunks shorter than one second are raised to one second.
    pub fn new(chunk: ConsoleDuration) -> Self {
        let minimum = 1 * Unit::Second;
        Self {
            chunk: if chunk < minimum { minimum } else { chunk },
        }
    }

    pub fn chunk(&self) -> ConsoleDuration {
        self.chunk
    }

    /// Windows covering `[max_end - span, ...)`, each exactly one chunk long.
    ///
    /// The first window ends at `start + chunk`, each following window
    /// starts where the previous one ended, and the sequence stops once a
    /// window reaches `max_end`. A span shorter than a chunk still yields a
    /// single full-size window.
    pub fn windows(&self, span: ConsoleDuration, max_end: ConsoleInstant) -> Vec<TimeWindow> {
        let start = max_end - span;
        let mut windows = vec![TimeWindow::new(start + self.chunk, self.chunk)];
        while let Some(last) = windows.last() {
            if last.end >= max_end {
                break;
            }
            let next_end = last.end + self.chunk;
            windows.push(TimeWindow::new(next_end, self.chunk));
        }
        windows
    }

    /// Windows for a live range query: spans that fit in one chunk are
    /// fetched as a single window of exactly the span.
    pub fn plan(&self, span: ConsoleDuration, end: ConsoleInstant) -> Vec<TimeWindow> {
        if span <= self.chunk {
            vec![TimeWindow::new(end, span)]
        } else {
            self.windows(span, end)
        }
    }
}

/// The 24 hour windows used by the incidents view.
pub fn incidents_time_ranges(span: ConsoleDuration, max_end: ConsoleInstant) -> Vec<TimeWindow> {
    TimeRangeChunker::default().windows(span, max_end)
}
