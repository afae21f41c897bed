use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use super::{
    AnalysisConfig, HttpRetryConfig, NotifierConfig, ServerConfig, TelemetryConfig,
    deserialize_duration_from_seconds,
};
use crate::{
    engine::{
        alert_manager::{DEFAULT_ALERT_COOLDOWN, DEFAULT_MAX_ALERTS},
        analysis_throttle::{DEFAULT_FALLBACK_PERIOD, DEFAULT_SIGNIFICANT_CHANGE_RATIO},
        history::MAX_HISTORY,
    },
    persistence::threshold_store::DEFAULT_THRESHOLDS_KEY,
};

fn default_thresholds_key() -> String {
    DEFAULT_THRESHOLDS_KEY.to_string()
}

fn default_history_capacity() -> usize {
    MAX_HISTORY
}

fn default_max_alerts() -> usize {
    DEFAULT_MAX_ALERTS
}

fn default_alert_cooldown() -> Duration {
    DEFAULT_ALERT_COOLDOWN
}

fn default_significant_change_ratio() -> f64 {
    DEFAULT_SIGNIFICANT_CHANGE_RATIO
}

fn default_fallback_period() -> Duration {
    DEFAULT_FALLBACK_PERIOD
}

fn default_fallback_check_interval() -> Duration {
    Duration::from_secs(60)
}

fn default_event_channel_capacity() -> usize {
    256
}

fn default_shutdown_timeout() -> Duration {
    Duration::from_secs(30)
}

/// Application configuration for BreathEasy.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// SQLite URL for the state database. Thresholds are kept in memory only
    /// when unset.
    #[serde(default)]
    pub database_url: Option<String>,

    /// Key under which thresholds are persisted.
    #[serde(default = "default_thresholds_key")]
    pub thresholds_key: String,

    /// Telemetry feed.
    pub telemetry: TelemetryConfig,

    /// Analysis service.
    pub analysis: AnalysisConfig,

    /// Maximum number of readings kept in history.
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,

    /// Maximum number of alerts kept in the session.
    #[serde(default = "default_max_alerts")]
    pub max_alerts: usize,

    /// Minimum time between two alerts for the same pollutant.
    #[serde(
        default = "default_alert_cooldown",
        deserialize_with = "deserialize_duration_from_seconds"
    )]
    pub alert_cooldown_secs: Duration,

    /// Relative change of any pollutant that triggers a new analysis.
    #[serde(default = "default_significant_change_ratio")]
    pub significant_change_ratio: f64,

    /// Maximum age of the derived insight before a fallback analysis runs.
    #[serde(
        default = "default_fallback_period",
        deserialize_with = "deserialize_duration_from_seconds"
    )]
    pub analysis_fallback_period_secs: Duration,

    /// How often the fallback condition is checked.
    #[serde(
        default = "default_fallback_check_interval",
        deserialize_with = "deserialize_duration_from_seconds"
    )]
    pub fallback_check_interval_secs: Duration,

    /// Capacity of the coordinator's event queue.
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,

    /// The maximum time in seconds to wait for graceful shutdown.
    #[serde(
        default = "default_shutdown_timeout",
        deserialize_with = "deserialize_duration_from_seconds"
    )]
    pub shutdown_timeout_secs: Duration,

    /// Retry policy for the alert webhook and telemetry polling.
    #[serde(default)]
    pub http_retry_config: HttpRetryConfig,

    /// Optional alert webhook.
    #[serde(default)]
    pub notifier: Option<NotifierConfig>,

    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
}

impl AppConfig {
    /// Creates a new `AppConfig` by reading `app.yaml` from the configuration
    /// directory, with `BREATHEASY__*` environment variables taking
    /// precedence.
    pub fn new(config_dir: Option<&str>) -> Result<Self, ConfigError> {
        let config_dir_str = config_dir.unwrap_or("configs");
        let s = Config::builder()
            .add_source(File::with_name(&format!("{}/app.yaml", config_dir_str)))
            .add_source(Environment::with_prefix("BREATHEASY").separator("__"))
            .build()?;
        let config: Self = s.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.history_capacity == 0 {
            return Err(ConfigError::Message("history_capacity must be at least 1".into()));
        }
        if self.event_channel_capacity == 0 {
            return Err(ConfigError::Message("event_channel_capacity must be at least 1".into()));
        }
        if !self.significant_change_ratio.is_finite() || self.significant_change_ratio < 0.0 {
            return Err(ConfigError::Message(
                "significant_change_ratio must be a non-negative number".into(),
            ));
        }
        if self.telemetry.polling_interval_ms.is_zero() {
            return Err(ConfigError::Message(
                "telemetry.polling_interval_ms must be greater than zero".into(),
            ));
        }
        if self.fallback_check_interval_secs.is_zero() {
            return Err(ConfigError::Message(
                "fallback_check_interval_secs must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}
