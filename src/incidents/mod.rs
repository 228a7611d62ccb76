pub mod correlation;
pub mod error;
pub mod grouping;
pub mod pipeline;
pub mod processor;

pub use correlation::CorrelationQueryBuilder;
pub use error::{PipelineError, ProcessingError};
pub use grouping::{AlertGrouper, GroupedIncident, GroupedRecord, IncidentGrouper};
pub use pipeline::{IncidentsPipeline, IncidentsSettings, IncidentsSnapshot};
pub use processor::{Incident, IncidentProcessor, ProcessorSettings};
