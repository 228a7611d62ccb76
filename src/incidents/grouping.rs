//! Deduplicating aggregation of raw observations by a grouping label.

use std::collections::{HashMap, HashSet};

use tracing::trace;

use crate::datamodel::{LabelSet, RawObservation, RawValue};

/// All observations sharing one grouping key, values deduplicated.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupedRecord {
    pub key: String,
    /// Metadata of the first observation seen for the key.
    pub metric: LabelSet,
    pub values: Vec<RawValue>,
}

/// A grouped incident with the components and layers it touches.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupedIncident {
    pub record: GroupedRecord,
    pub components: Vec<String>,
    pub layers: Vec<String>,
}

impl GroupedIncident {
    pub fn group_id(&self) -> &str {
        &self.record.key
    }
}

#[derive(Default)]
struct Accumulator {
    index: HashMap<String, usize>,
    records: Vec<GroupedRecord>,
    seen: Vec<HashSet<(u64, String)>>,
}

impl Accumulator {
    /// Folds one observation into its group and returns the group position.
    fn absorb(&mut self, key: &str, observation: &RawObservation) -> usize {
        let position = match self.index.get(key) {
            Some(&position) => position,
            None => {
                let position = self.records.len();
                self.index.insert(key.to_string(), position);
                self.records.push(GroupedRecord {
                    key: key.to_string(),
                    metric: observation.metric.clone(),
                    values: Vec::with_capacity(observation.values.len()),
                });
                self.seen.push(HashSet::new());
                position
            }
        };

        let record = &mut self.records[position];
        let seen = &mut self.seen[position];
        for value in &observation.values {
            let (timestamp, raw) = value.dedup_key();
            if seen.insert((timestamp, raw.to_string())) {
                record.values.push(value.clone());
            } else {
                trace!("Dropping duplicate value for {}", key);
            }
        }
        position
    }
}

fn push_distinct(list: &mut Vec<String>, value: Option<&str>) {
    if let Some(value) = value {
        if !list.iter().any(|existing| existing == value) {
            list.push(value.to_string());
        }
    }
}

/// Groups alerts by component.
#[derive(Debug, Clone)]
pub struct AlertGrouper {
    key_label: String,
}

impl Default for AlertGrouper {
    fn default() -> Self {
        Self {
            key_label: "component".to_string(),
        }
    }
}

impl AlertGrouper {
    pub fn new(key_label: impl Into<String>) -> Self {
        Self {
            key_label: key_label.into(),
        }
    }

    /// One record per distinct key, in first-seen order. Observations
    /// without the key label are skipped.
    pub fn group<'a>(
        &self,
        observations: impl IntoIterator<Item = &'a RawObservation>,
    ) -> Vec<GroupedRecord> {
        let mut accumulator = Accumulator::default();
        for observation in observations {
            if let Some(key) = observation.label(&self.key_label) {
                accumulator.absorb(key, observation);
            }
        }
        accumulator.records
    }
}

/// Groups incident observations by correlation id, collecting the
/// components and layers of every member.
#[derive(Debug, Clone)]
pub struct IncidentGrouper {
    key_label: String,
    component_label: String,
    layer_label: String,
}

impl Default for IncidentGrouper {
    fn default() -> Self {
        Self {
            key_label: "group_id".to_string(),
            component_label: "component".to_string(),
            layer_label: "layer".to_string(),
        }
    }
}

impl IncidentGrouper {
    pub fn group<'a>(
        &self,
        observations: impl IntoIterator<Item = &'a RawObservation>,
    ) -> Vec<GroupedIncident> {
        let mut accumulator = Accumulator::default();
        let mut components: Vec<Vec<String>> = Vec::new();
        let mut layers: Vec<Vec<String>> = Vec::new();

        for observation in observations {
            let Some(key) = observation.label(&self.key_label) else {
                continue;
            };
            let position = accumulator.absorb(key, observation);
            if position == components.len() {
                components.push(Vec::new());
                layers.push(Vec::new());
            }
            push_distinct(
                &mut components[position],
                observation.label(&self.component_label),
            );
            push_distinct(&mut layers[position], observation.label(&self.layer_label));
        }

        accumulator
            .records
            .into_iter()
            .zip(components.into_iter().zip(layers))
            .map(|(record, (components, layers))| GroupedIncident {
                record,
                components,
                layers,
            })
            .collect()
    }
}
