pub mod datetime;
pub mod labels;
pub mod observation;
pub mod sample;
pub mod series;
pub mod time_window;

pub use datetime::{ConsoleDuration, ConsoleInstant, ConsoleInstantExt};
pub use labels::LabelSet;
pub use observation::{RawObservation, RawValue};
pub use sample::{SamplePoint, SampleValue};
pub use series::Series;
pub use time_window::{TimeRange, TimeWindow};
