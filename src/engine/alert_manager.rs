//! Alerting engine
//!
//! Evaluates readings against user thresholds and produces deduplicated,
//! cooled-down alerts. The engine performs no I/O; the coordinator merges the
//! returned alerts into session state.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

use crate::models::{Alert, Reading, ThresholdSet};

/// Default minimum time between two alerts for the same pollutant.
pub const DEFAULT_ALERT_COOLDOWN: Duration = Duration::from_secs(5 * 60);

/// Default number of alerts retained in the session.
pub const DEFAULT_MAX_ALERTS: usize = 10;

/// Applies the threshold and cooldown policy to incoming readings.
#[derive(Debug, Clone)]
pub struct AlertManager {
    /// Window during which a repeated breach of the same pollutant is
    /// suppressed.
    cooldown: TimeDelta,

    /// Maximum length of the retained alert list.
    max_alerts: usize,
}

impl AlertManager {
    /// Creates a new AlertManager.
    pub fn new(cooldown: Duration, max_alerts: usize) -> Self {
        Self {
            cooldown: TimeDelta::from_std(cooldown).unwrap_or(TimeDelta::MAX),
            max_alerts,
        }
    }

    /// Returns the alerts that `reading` raises at time `now`.
    ///
    /// A pollutant alerts when its value is strictly greater than a finite
    /// threshold and `recent_alerts` holds no alert for it created within the
    /// cooldown window.
    pub fn evaluate(
        &self,
        reading: &Reading,
        thresholds: &ThresholdSet,
        recent_alerts: &[Alert],
        now: DateTime<Utc>,
    ) -> Vec<Alert> {
        thresholds
            .iter()
            .filter_map(|(pollutant, threshold)| {
                let value = reading.get(pollutant);
                if value <= threshold {
                    return None;
                }

                if let Some(previous) = recent_alerts
                    .iter()
                    .find(|a| a.pollutant == pollutant && now - a.created_at < self.cooldown)
                {
                    tracing::debug!(
                        pollutant = %pollutant,
                        value,
                        threshold,
                        previous_alert = %previous.id,
                        "Suppressing alert inside cooldown window."
                    );
                    return None;
                }

                tracing::info!(pollutant = %pollutant, value, threshold, "Threshold exceeded.");
                Some(Alert::new(pollutant, value, threshold, now))
            })
            .collect()
    }

    /// Prepends `new_alerts` to `alerts` and truncates the list to the most
    /// recent entries.
    pub fn merge(&self, alerts: &mut Vec<Alert>, new_alerts: Vec<Alert>) {
        if new_alerts.is_empty() {
            return;
        }
        alerts.splice(0..0, new_alerts);
        alerts.truncate(self.max_alerts);
    }
}

impl Default for AlertManager {
    fn default() -> Self {
        Self::new(DEFAULT_ALERT_COOLDOWN, DEFAULT_MAX_ALERTS)
    }
}
