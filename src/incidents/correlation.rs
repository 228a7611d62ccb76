use tracing::debug;

use super::error::ProcessingError;
use super::grouping::GroupedIncident;
use crate::query::selector::Selector;

/// Builds the query checking, for each (component, layer) pair of each
/// incident, whether the corroborating signal is absent.
///
/// A record with C components and L layers contributes C×L clauses, so
/// the total is capped by `max_clauses`.
#[derive(Debug, Clone)]
pub struct CorrelationQueryBuilder {
    metric: String,
    max_clauses: usize,
}

impl Default for CorrelationQueryBuilder {
    fn default() -> Self {
        Self::new("cluster_health_components_map", 1000)
    }
}

impl CorrelationQueryBuilder {
    pub fn new(metric: impl Into<String>, max_clauses: usize) -> Self {
        Self {
            metric: metric.into(),
            max_clauses,
        }
    }

    fn clauses<'a>(&'a self, incident: &'a GroupedIncident) -> impl Iterator<Item = String> + 'a {
        incident.components.iter().flat_map(move |component| {
            incident.layers.iter().map(move |layer| {
                let selector = Selector::new(self.metric.as_str())
                    .with("group_id", incident.group_id())
                    .with("component", component.as_str())
                    .with("layer", layer.as_str());
                format!("absent({})", selector)
            })
        })
    }

    pub fn clause_count(incidents: &[GroupedIncident]) -> usize {
        incidents
            .iter()
            .map(|incident| incident.components.len() * incident.layers.len())
            .sum()
    }

    /// The query of a single record, `None` when it has no pairs.
    pub fn record_query(&self, incident: &GroupedIncident) -> Option<String> {
        let clauses: Vec<String> = self.clauses(incident).collect();
        if clauses.is_empty() {
            None
        } else {
            Some(clauses.join(" or "))
        }
    }

    /// All records' clauses OR-joined into one query.
    pub fn build(&self, incidents: &[GroupedIncident]) -> Result<Option<String>, ProcessingError> {
        let total = Self::clause_count(incidents);
        if total > self.max_clauses {
            return Err(ProcessingError::CorrelationQueryTooLarge {
                clauses: total,
                limit: self.max_clauses,
            });
        }
        debug!("Building correlation query with {} clause(s)", total);

        let records: Vec<String> = incidents
            .iter()
            .filter_map(|incident| self.record_query(incident))
            .collect();
        if records.is_empty() {
            Ok(None)
        } else {
            Ok(Some(records.join(" or ")))
        }
    }
}
