//! Settings for the external collaborators: the telemetry feed, the analysis
//! service and the alert webhook.

use std::time::Duration;

use serde::Deserialize;
use url::Url;

use super::helpers::{deserialize_duration_from_ms, deserialize_duration_from_seconds};

fn default_polling_interval() -> Duration {
    Duration::from_millis(5_000)
}

fn default_analysis_timeout() -> Duration {
    Duration::from_secs(30)
}

/// Where telemetry payloads are polled from.
#[derive(Debug, Deserialize, Clone)]
pub struct TelemetryConfig {
    /// Endpoint returning the latest raw sensor payload as JSON.
    pub url: Url,

    /// Interval between two polls.
    #[serde(default = "default_polling_interval", deserialize_with = "deserialize_duration_from_ms")]
    pub polling_interval_ms: Duration,
}

/// The external analysis service.
#[derive(Debug, Deserialize, Clone)]
pub struct AnalysisConfig {
    /// Base URL; `analysis` and `recommendations` are resolved against it.
    pub base_url: Url,

    /// Per-request timeout. The coordinator itself imposes none.
    #[serde(default = "default_analysis_timeout", deserialize_with = "deserialize_duration_from_seconds")]
    pub timeout_secs: Duration,
}

/// Webhook receiving newly raised alerts.
#[derive(Debug, Deserialize, Clone)]
pub struct NotifierConfig {
    /// Target URL.
    pub url: Url,

    /// When set, payloads are signed with HMAC-SHA256 using this secret.
    #[serde(default)]
    pub secret: Option<String>,
}
