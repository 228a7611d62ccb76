use anyhow::Error;
use confique::Config;
use hifitime::Unit;
use std::sync::{Arc, Mutex, OnceLock};

use crate::datamodel::ConsoleDuration;
use crate::incidents::{
    CorrelationQueryBuilder, IncidentProcessor, IncidentsSettings, ProcessorSettings,
};
use crate::polling::{PollingSettings, ViewState, ZoomController};
use crate::query::{SamplerSettings, TimeRangeChunker};

#[derive(Debug, Config)]
pub struct ConsoleConfig {
    #[config(
        env = "MONITORING_CONSOLE_BACKEND_URL",
        default = "http://localhost:9090"
    )]
    pub backend_url: String,

    #[config(env = "MONITORING_CONSOLE_REQUEST_TIMEOUT_SECONDS", default = 30)]
    pub request_timeout_seconds: u64,

    #[config(env = "MONITORING_CONSOLE_CHUNK_HOURS", default = 24)]
    pub chunk_hours: u64,

    #[config(env = "MONITORING_CONSOLE_MIN_SAMPLES", default = 10)]
    pub min_samples: usize,

    #[config(env = "MONITORING_CONSOLE_MAX_SAMPLES", default = 300)]
    pub max_samples: usize,

    #[config(env = "MONITORING_CONSOLE_MIN_STEP_SECONDS", default = 5)]
    pub min_step_seconds: u64,

    #[config(env = "MONITORING_CONSOLE_SOFT_MAX_POINTS", default = 6000)]
    pub soft_max_points: usize,

    #[config(env = "MONITORING_CONSOLE_HARD_MAX_POINTS", default = 10000)]
    pub hard_max_points: usize,

    #[config(env = "MONITORING_CONSOLE_SAMPLES_LEEWAY", default = 0.2)]
    pub samples_leeway: f64,

    #[config(env = "MONITORING_CONSOLE_MIN_POLL_INTERVAL_SECONDS", default = 10)]
    pub min_poll_interval_seconds: u64,

    #[config(env = "MONITORING_CONSOLE_DEFAULT_SPAN_MINUTES", default = 30)]
    pub default_span_minutes: u64,

    #[config(env = "MONITORING_CONSOLE_MIN_ZOOM_SPAN_SECONDS", default = 30)]
    pub min_zoom_span_seconds: u64,

    #[config(env = "MONITORING_CONSOLE_LONG_STANDING_DAYS", default = 7)]
    pub long_standing_days: u64,

    #[config(env = "MONITORING_CONSOLE_MAX_CORRELATION_CLAUSES", default = 1000)]
    pub max_correlation_clauses: usize,

    #[config(
        env = "MONITORING_CONSOLE_INCIDENTS_QUERY",
        default = "cluster_health_components_map"
    )]
    pub incidents_query: String,

    #[config(env = "MONITORING_CONSOLE_INCIDENTS_STEP_SECONDS", default = 300)]
    pub incidents_step_seconds: u64,

    /// Metric checked with `absent()` when correlating incidents with alerts.
    #[config(
        env = "MONITORING_CONSOLE_CORRELATION_METRIC",
        default = "cluster_health_components_map"
    )]
    pub correlation_metric: String,

    #[config(
        env = "MONITORING_CONSOLE_ALERT_NAME_LABEL",
        default = "src_alertname"
    )]
    pub alert_name_label: String,

    #[config(env = "MONITORING_CONSOLE_WATCHDOG_ALERT", default = "Watchdog")]
    pub watchdog_alert: String,
}

fn seconds(value: u64) -> ConsoleDuration {
    ConsoleDuration::from_seconds(value as f64)
}

impl ConsoleConfig {
    pub fn load() -> Result<ConsoleConfig, Error> {
        let c = ConsoleConfig::builder()
            .env()
            .file("settings.toml")
            .load()?;

        Ok(c)
    }

    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn default_span(&self) -> ConsoleDuration {
        seconds(self.default_span_minutes * 60)
    }

    pub fn default_view(&self) -> ViewState {
        ViewState::new(self.default_span())
    }
}

impl From<&ConsoleConfig> for TimeRangeChunker {
    fn from(config: &ConsoleConfig) -> Self {
        TimeRangeChunker::new(seconds(config.chunk_hours * 3600))
    }
}

impl From<&ConsoleConfig> for SamplerSettings {
    fn from(config: &ConsoleConfig) -> Self {
        Self {
            min_samples: config.min_samples,
            max_samples: config.max_samples,
            min_step: seconds(config.min_step_seconds),
            soft_max_points: config.soft_max_points,
            hard_max_points: config.hard_max_points,
            leeway: config.samples_leeway,
        }
    }
}

impl From<&ConsoleConfig> for ZoomController {
    fn from(config: &ConsoleConfig) -> Self {
        ZoomController::new(seconds(config.min_zoom_span_seconds))
    }
}

impl From<&ConsoleConfig> for PollingSettings {
    fn from(config: &ConsoleConfig) -> Self {
        Self {
            min_poll_interval: seconds(config.min_poll_interval_seconds),
            chunker: config.into(),
            sampler: config.into(),
            zoom: config.into(),
        }
    }
}

impl From<&ConsoleConfig> for ProcessorSettings {
    fn from(config: &ConsoleConfig) -> Self {
        Self {
            alert_name_label: config.alert_name_label.clone(),
            watchdog_alert: config.watchdog_alert.clone(),
            long_standing_threshold: (config.long_standing_days as i64) * Unit::Day,
        }
    }
}

impl From<&ConsoleConfig> for IncidentProcessor {
    fn from(config: &ConsoleConfig) -> Self {
        IncidentProcessor::new(config.into())
    }
}

impl From<&ConsoleConfig> for CorrelationQueryBuilder {
    fn from(config: &ConsoleConfig) -> Self {
        CorrelationQueryBuilder::new(
            config.correlation_metric.as_str(),
            config.max_correlation_clauses,
        )
    }
}

impl From<&ConsoleConfig> for IncidentsSettings {
    fn from(config: &ConsoleConfig) -> Self {
        Self {
            incidents_query: config.incidents_query.clone(),
            step: seconds(config.incidents_step_seconds),
            chunker: config.into(),
        }
    }
}

static CONSOLE_CONFIG: OnceLock<Arc<ConsoleConfig>> = OnceLock::new();

pub fn get() -> Result<Arc<ConsoleConfig>, Error> {
    CONSOLE_CONFIG.get().cloned().ok_or_else(|| {
        Error::msg(
            "Configuration not loaded. Please call load_configuration() before using the configuration",
        )
    })
}

pub fn load_configuration() -> Result<(), Error> {
    if CONSOLE_CONFIG.get().is_some() {
        return Ok(());
    }

    let config = ConsoleConfig::load()?;
    CONSOLE_CONFIG.get_or_init(|| Arc::new(config));

    Ok(())
}

static TEST_CONFIG_INIT: Mutex<()> = Mutex::new(());

/// Loads the configuration exactly once across concurrently running tests.
pub fn load_configuration_for_tests() -> Result<(), Error> {
    let _guard = TEST_CONFIG_INIT
        .lock()
        .map_err(|_| Error::msg("Test configuration lock poisoned"))?;

    if CONSOLE_CONFIG.get().is_some() {
        return Ok(());
    }

    let config = ConsoleConfig::load()?;
    CONSOLE_CONFIG.get_or_init(|| Arc::new(config));

    Ok(())
}
