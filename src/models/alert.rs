//! Threshold breach alerts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::reading::Pollutant;

/// An alert raised when a pollutant exceeded its configured threshold.
///
/// Alerts are created by the alerting engine and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    /// Unique identifier, `"{pollutant}-{created_at_millis}"`.
    pub id: String,
    /// The pollutant that breached its threshold.
    pub pollutant: Pollutant,
    /// The observed concentration.
    pub value: f64,
    /// The threshold in effect when the alert was created.
    pub threshold: f64,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Rendered, human readable message.
    pub message: String,
}

impl Alert {
    /// Creates an alert and renders its message.
    pub fn new(pollutant: Pollutant, value: f64, threshold: f64, created_at: DateTime<Utc>) -> Self {
        let unit = pollutant.unit();
        Self {
            id: format!("{}-{}", pollutant.id(), created_at.timestamp_millis()),
            pollutant,
            value,
            threshold,
            created_at,
            message: format!(
                "{} level ({:.1} {unit}) exceeded threshold ({threshold} {unit}).",
                pollutant.name(),
                value
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_renders_message_and_id() {
        let at = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        let alert = Alert::new(Pollutant::Pm25, 25.04, 20.0, at);
        assert_eq!(alert.id, "pm2_5-1700000000123");
        assert_eq!(alert.message, "PM2.5 level (25.0 µg/m³) exceeded threshold (20 µg/m³).");
    }
}
