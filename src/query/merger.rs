use std::collections::HashMap;

use tracing::debug;

use super::response::{QueryData, QueryResponse};
use crate::datamodel::RawObservation;

/// Merges the chunk responses of one query into a single response holding
/// one series per distinct label set.
///
/// Values are concatenated in chunk order. The first chunk's envelope is
/// kept so status and warnings survive the merge.
#[derive(Debug, Default)]
pub struct SeriesMerger {
    container: Option<QueryResponse>,
    merged: Vec<RawObservation>,
    index: HashMap<String, usize>,
    extra_warnings: Vec<String>,
}

impl SeriesMerger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, mut response: QueryResponse) {
        let observations = match response.data.take() {
            Some(QueryData::Matrix(result)) => result,
            other => {
                // Only matrices can be merged; keep the first non-matrix as is
                if self.container.is_none() {
                    response.data = other;
                    self.container = Some(response);
                } else {
                    debug!("Ignoring non-matrix chunk response");
                }
                return;
            }
        };

        for observation in observations {
            let key = observation.metric.canonical_key();
            match self.index.get(&key) {
                Some(&position) => self.merged[position].values.extend(observation.values),
                None => {
                    self.index.insert(key, self.merged.len());
                    self.merged.push(observation);
                }
            }
        }

        match &self.container {
            None => self.container = Some(response),
            Some(_) => self.extra_warnings.append(&mut response.warnings),
        }
    }

    pub fn finish(self) -> Option<QueryResponse> {
        let mut container = self.container?;
        if container.data.is_none() || !self.merged.is_empty() {
            container.data = Some(QueryData::Matrix(self.merged));
        }
        for warning in self.extra_warnings {
            if !container.warnings.contains(&warning) {
                container.warnings.push(warning);
            }
        }
        Some(container)
    }
}

/// Merges chunk responses, `None` when there are none.
pub fn merge_chunk_responses(
    responses: impl IntoIterator<Item = QueryResponse>,
) -> Option<QueryResponse> {
    let mut merger = SeriesMerger::new();
    for response in responses {
        merger.push(response);
    }
    merger.finish()
}
