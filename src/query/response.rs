//! Model of the Prometheus HTTP API query response envelope.

use serde::{Deserialize, Serialize};

use super::error::QueryError;
use crate::datamodel::{LabelSet, RawObservation, RawValue, Series};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstantSample {
    pub metric: LabelSet,
    pub value: RawValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "resultType", content = "result", rename_all = "lowercase")]
pub enum QueryData {
    Vector(Vec<InstantSample>),
    Matrix(Vec<RawObservation>),
    Scalar(RawValue),
    String(RawValue),
}

impl QueryData {
    pub fn result_type(&self) -> &'static str {
        match self {
            QueryData::Vector(_) => "vector",
            QueryData::Matrix(_) => "matrix",
            QueryData::Scalar(_) => "scalar",
            QueryData::String(_) => "string",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub status: ResponseStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<QueryData>,
    #[serde(rename = "errorType", default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl QueryResponse {
    pub fn matrix(result: Vec<RawObservation>) -> Self {
        Self {
            status: ResponseStatus::Success,
            data: Some(QueryData::Matrix(result)),
            error_type: None,
            error: None,
            warnings: Vec::new(),
        }
    }

    pub fn error(error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Error,
            data: None,
            error_type: Some(error_type.into()),
            error: Some(message.into()),
            warnings: Vec::new(),
        }
    }

    /// Turns an error envelope into a [`QueryError::Backend`].
    pub fn into_checked(self) -> Result<Self, QueryError> {
        match self.status {
            ResponseStatus::Success => Ok(self),
            ResponseStatus::Error => Err(QueryError::backend(
                self.error
                    .unwrap_or_else(|| "unknown backend error".to_string()),
            )),
        }
    }

    /// Matrix results, empty for every other result type.
    pub fn observations(&self) -> &[RawObservation] {
        match &self.data {
            Some(QueryData::Matrix(result)) => result,
            _ => &[],
        }
    }

    pub fn total_points(&self) -> usize {
        self.observations().iter().map(|o| o.values.len()).sum()
    }

    pub fn to_series(&self) -> Vec<Series> {
        self.observations()
            .iter()
            .map(Series::from_observation)
            .collect()
    }
}
