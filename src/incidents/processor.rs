use hifitime::Unit;
use tracing::debug;

use super::error::ProcessingError;
use super::grouping::GroupedIncident;
use crate::datamodel::{ConsoleDuration, ConsoleInstant, ConsoleInstantExt, LabelSet, SamplePoint};

#[derive(Debug, Clone, PartialEq)]
pub struct ProcessorSettings {
    /// Label holding the representative alert name of an incident.
    pub alert_name_label: String,
    /// Heartbeat alert name, dropped from the output.
    pub watchdog_alert: String,
    pub long_standing_threshold: ConsoleDuration,
}

impl Default for ProcessorSettings {
    fn default() -> Self {
        Self {
            alert_name_label: "src_alertname".to_string(),
            watchdog_alert: "Watchdog".to_string(),
            long_standing_threshold: 7 * Unit::Day,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Incident {
    pub group_id: String,
    pub metric: LabelSet,
    pub components: Vec<String>,
    pub layers: Vec<String>,
    pub points: Vec<SamplePoint>,
    pub firing_start: ConsoleInstant,
    pub firing_end: ConsoleInstant,
    /// Set when the firing duration is *below* the threshold.
    pub long_standing: bool,
    /// No point falls within the current UTC hour.
    pub inactive: bool,
    /// Reverse chart order: the first incident gets the highest index.
    pub chart_index: usize,
}

#[derive(Debug, Clone, Default)]
pub struct IncidentProcessor {
    settings: ProcessorSettings,
}

impl IncidentProcessor {
    pub fn new(settings: ProcessorSettings) -> Self {
        Self { settings }
    }

    pub fn is_watchdog(&self, incident: &GroupedIncident) -> bool {
        incident.record.metric.get(&self.settings.alert_name_label)
            == Some(self.settings.watchdog_alert.as_str())
    }

    pub fn process(
        &self,
        grouped: Vec<GroupedIncident>,
        now: ConsoleInstant,
    ) -> Result<Vec<Incident>, ProcessingError> {
        let surviving: Vec<GroupedIncident> = grouped
            .into_iter()
            .filter(|incident| !self.is_watchdog(incident))
            .collect();
        let total = surviving.len();
        debug!("Processing {} incident(s)", total);

        surviving
            .into_iter()
            .enumerate()
            .map(|(position, incident)| {
                let points: Vec<SamplePoint> = incident
                    .record
                    .values
                    .iter()
                    .map(|value| value.to_sample_point())
                    .collect();
                let (Some(first), Some(last)) = (points.first(), points.last()) else {
                    return Err(ProcessingError::EmptyValues {
                        group_id: incident.record.key,
                    });
                };
                let firing_start = first.datetime;
                let firing_end = last.datetime;
                let inactive = !points.iter().any(|p| p.datetime.same_utc_hour(&now));

                Ok(Incident {
                    group_id: incident.record.key,
                    metric: incident.record.metric,
                    components: incident.components,
                    layers: incident.layers,
                    long_standing: (firing_end - firing_start)
                        < self.settings.long_standing_threshold,
                    inactive,
                    chart_index: total - position,
                    firing_start,
                    firing_end,
                    points,
                })
            })
            .collect()
    }
}
