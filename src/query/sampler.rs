use hifitime::Unit;
use tracing::{debug, warn};

use crate::datamodel::ConsoleDuration;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplerSettings {
    pub min_samples: usize,
    pub max_samples: usize,
    /// Smallest spacing between two requested samples.
    pub min_step: ConsoleDuration,
    /// Point budget the sampler converges to.
    pub soft_max_points: usize,
    /// Above this, at minimum sampling, the dataset is not rendered.
    pub hard_max_points: usize,
    /// Relative change below which the sample count is left alone.
    pub leeway: f64,
}

impl Default for SamplerSettings {
    fn default() -> Self {
        Self {
            min_samples: 10,
            max_samples: 300,
            min_step: 5 * Unit::Second,
            soft_max_points: 6000,
            hard_max_points: 10000,
            leeway: 0.2,
        }
    }
}

impl SamplerSettings {
    /// `clamp(floor(span / min_step), min_samples, max_samples)`, so that
    /// `span / samples` never drops below `min_step` above the floor.
    pub fn max_samples_for_span(&self, span: ConsoleDuration) -> usize {
        let upper = self.max_samples.max(self.min_samples);
        let min_step = self.min_step.to_seconds();
        let by_step = if min_step > 0.0 {
            (span.to_seconds() / min_step).floor().max(0.0) as usize
        } else {
            upper
        };
        by_step.clamp(self.min_samples, upper)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplerDecision {
    Keep,
    Adjust { from: usize, to: usize },
    /// Even minimum sampling is above the hard ceiling; adjusting stops.
    TooLarge { points: usize },
}

/// Per-query sample count, adapted after every fetch so the number of
/// points returned settles around the soft budget.
#[derive(Debug, Clone, PartialEq)]
pub struct AdaptiveSampler {
    settings: SamplerSettings,
    span: ConsoleDuration,
    samples: usize,
    too_large: bool,
}

impl AdaptiveSampler {
    pub fn new(settings: SamplerSettings, span: ConsoleDuration) -> Self {
        Self {
            settings,
            span,
            samples: settings.max_samples_for_span(span),
            too_large: false,
        }
    }

    pub fn with_samples(mut self, samples: usize) -> Self {
        self.samples = samples.clamp(
            self.settings.min_samples,
            self.settings.max_samples_for_span(self.span),
        );
        self
    }

    pub fn samples(&self) -> usize {
        self.samples
    }

    pub fn span(&self) -> ConsoleDuration {
        self.span
    }

    pub fn is_too_large(&self) -> bool {
        self.too_large
    }

    /// Starts over for a new span or a new query.
    pub fn reset(&mut self, span: ConsoleDuration) {
        self.span = span;
        self.samples = self.settings.max_samples_for_span(span);
        self.too_large = false;
    }

    /// Step to request: `span / samples`, at least one second and never
    /// finer than `min_step`.
    pub fn step(&self) -> ConsoleDuration {
        let seconds = (self.span.to_seconds() / self.samples.max(1) as f64).floor();
        let step = ConsoleDuration::from_seconds(seconds.max(1.0));
        if step < self.settings.min_step {
            self.settings.min_step
        } else {
            step
        }
    }

    /// Feeds back the number of points the last fetch returned.
    pub fn observe(&mut self, total_points: usize) -> SamplerDecision {
        if self.too_large {
            return SamplerDecision::TooLarge {
                points: total_points,
            };
        }

        let settings = &self.settings;
        if total_points > settings.hard_max_points && self.samples == settings.min_samples {
            warn!(
                "Dataset too large: {} points at {} samples",
                total_points, self.samples
            );
            self.too_large = true;
            return SamplerDecision::TooLarge {
                points: total_points,
            };
        }

        let max_for_span = settings.max_samples_for_span(self.span);
        let candidate = if total_points == 0 {
            max_for_span
        } else {
            let scaled = (self.samples as u128 * settings.soft_max_points as u128)
                / total_points as u128;
            (scaled.min(usize::MAX as u128) as usize).clamp(settings.min_samples, max_for_span)
        };

        if candidate == self.samples {
            return SamplerDecision::Keep;
        }

        let change = (candidate as f64 - self.samples as f64).abs() / self.samples.max(1) as f64;
        let at_bound = candidate == settings.min_samples || candidate == max_for_span;
        if change > settings.leeway || at_bound {
            debug!(
                "Adjusting samples {} -> {} ({} points)",
                self.samples, candidate, total_points
            );
            let from = self.samples;
            self.samples = candidate;
            SamplerDecision::Adjust {
                from,
                to: candidate,
            }
        } else {
            SamplerDecision::Keep
        }
    }
}
