use std::sync::Arc;

use hifitime::Unit;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::correlation::CorrelationQueryBuilder;
use super::error::PipelineError;
use super::grouping::{AlertGrouper, GroupedRecord, IncidentGrouper};
use super::processor::{Incident, IncidentProcessor};
use crate::datamodel::{ConsoleDuration, ConsoleInstant, RawObservation};
use crate::query::{QueryBackend, TimeRangeChunker, fetch_windows};

#[derive(Debug, Clone, PartialEq)]
pub struct IncidentsSettings {
    pub incidents_query: String,
    pub step: ConsoleDuration,
    pub chunker: TimeRangeChunker,
}

impl Default for IncidentsSettings {
    fn default() -> Self {
        Self {
            incidents_query: "cluster_health_components_map".to_string(),
            step: 300 * Unit::Second,
            chunker: TimeRangeChunker::default(),
        }
    }
}

/// Result of one pass of the incidents view.
#[derive(Debug, Clone, PartialEq)]
pub struct IncidentsSnapshot {
    pub incidents: Vec<Incident>,
    pub correlation_query: Option<String>,
    pub alerts: Vec<GroupedRecord>,
}

/// Fetch, group, process and correlate incidents over a time span.
#[derive(Debug)]
pub struct IncidentsPipeline {
    backend: Arc<dyn QueryBackend>,
    settings: IncidentsSettings,
    incident_grouper: IncidentGrouper,
    processor: IncidentProcessor,
    correlation: CorrelationQueryBuilder,
    alert_grouper: AlertGrouper,
}

impl IncidentsPipeline {
    pub fn new(
        backend: Arc<dyn QueryBackend>,
        settings: IncidentsSettings,
        processor: IncidentProcessor,
        correlation: CorrelationQueryBuilder,
    ) -> Self {
        Self {
            backend,
            settings,
            incident_grouper: IncidentGrouper::default(),
            processor,
            correlation,
            alert_grouper: AlertGrouper::default(),
        }
    }

    pub async fn load(
        &self,
        span: ConsoleDuration,
        end: ConsoleInstant,
        now: ConsoleInstant,
        cancel: &CancellationToken,
    ) -> Result<IncidentsSnapshot, PipelineError> {
        let windows = self.settings.chunker.windows(span, end);
        let response = fetch_windows(
            self.backend.as_ref(),
            &self.settings.incidents_query,
            &windows,
            self.settings.step,
            cancel,
        )
        .await?;

        // The processor cannot place an incident without values
        let observations: Vec<&RawObservation> = response
            .observations()
            .iter()
            .filter(|observation| !observation.values.is_empty())
            .collect();
        let grouped: Vec<_> = self
            .incident_grouper
            .group(observations)
            .into_iter()
            .filter(|incident| !self.processor.is_watchdog(incident))
            .collect();
        let correlation_query = self.correlation.build(&grouped)?;
        let incidents = self.processor.process(grouped, now)?;
        info!("Loaded {} incident(s)", incidents.len());

        let alerts = match &correlation_query {
            Some(query) => {
                let response = fetch_windows(
                    self.backend.as_ref(),
                    query,
                    &windows,
                    self.settings.step,
                    cancel,
                )
                .await?;
                self.alert_grouper.group(response.observations())
            }
            None => {
                debug!("No correlation query to run");
                Vec::new()
            }
        };

        Ok(IncidentsSnapshot {
            incidents,
            correlation_query,
            alerts,
        })
    }
}
