use std::time::Duration;

use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{Jitter, RetryTransientMiddleware, policies::ExponentialBackoff};
use serde::{Deserialize, Serialize};

use super::helpers::{deserialize_duration_from_ms, deserialize_duration_from_seconds};

fn default_max_retries() -> u32 {
    3
}

fn default_base_for_backoff() -> u32 {
    2
}

fn default_initial_backoff() -> Duration {
    Duration::from_millis(250)
}

fn default_max_backoff() -> Duration {
    Duration::from_secs(10)
}

/// Serializable setting for jitter in retry policies
#[derive(Default, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum JitterSetting {
    /// No jitter applied to the backoff duration
    None,
    /// Full jitter applied, randomizing the backoff duration
    #[default]
    Full,
}

/// Retry policy for outbound HTTP calls that tolerate retries (alert
/// webhooks, telemetry polling).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct HttpRetryConfig {
    /// Maximum number of retries for transient errors
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Base for exponential backoff calculations
    #[serde(default = "default_base_for_backoff")]
    pub base_for_backoff: u32,
    /// Backoff before the first retry
    #[serde(default = "default_initial_backoff", deserialize_with = "deserialize_duration_from_ms")]
    pub initial_backoff_ms: Duration,
    /// Upper bound on any single backoff
    #[serde(default = "default_max_backoff", deserialize_with = "deserialize_duration_from_seconds")]
    pub max_backoff_secs: Duration,
    /// Jitter to apply to the backoff duration
    #[serde(default)]
    pub jitter: JitterSetting,
}

impl Default for HttpRetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_for_backoff: default_base_for_backoff(),
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_secs: default_max_backoff(),
            jitter: JitterSetting::default(),
        }
    }
}

impl HttpRetryConfig {
    /// Builds the exponential backoff policy described by this config.
    pub fn policy(&self) -> ExponentialBackoff {
        let jitter = match self.jitter {
            JitterSetting::None => Jitter::None,
            JitterSetting::Full => Jitter::Full,
        };
        ExponentialBackoff::builder()
            .jitter(jitter)
            .base(self.base_for_backoff)
            .retry_bounds(self.initial_backoff_ms, self.max_backoff_secs)
            .build_with_max_retries(self.max_retries)
    }

    /// Wraps `client` in middleware that retries transient failures.
    pub fn retrying_client(&self, client: reqwest::Client) -> ClientWithMiddleware {
        ClientBuilder::new(client)
            .with(RetryTransientMiddleware::new_with_policy(self.policy()))
            .build()
    }
}
