use thiserror::Error;

use crate::query::QueryError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProcessingError {
    /// An incident without values reached the processor. Upstream must
    /// drop empty observations before grouping.
    #[error("Incident {group_id} has no values")]
    EmptyValues { group_id: String },

    #[error("Correlation query needs {clauses} clauses, the limit is {limit}")]
    CorrelationQueryTooLarge { clauses: usize, limit: usize },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Processing(#[from] ProcessingError),
}
