//! The read-only session state exposed to the rendering layer.

use serde::{Deserialize, Serialize};

use super::{
    alert::Alert,
    insight::DerivedInsight,
    reading::{HistoricalEntry, Reading},
    threshold::ThresholdSet,
};

/// Lifecycle phase of a dashboard session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    /// Nothing subscribed yet.
    #[default]
    Uninitialized,
    /// Subscribed, waiting for the first telemetry callback.
    Loading,
    /// Receiving valid readings.
    Live,
    /// The sensor is offline or the telemetry source reported an error.
    Degraded,
    /// The session has been torn down.
    Terminated,
}

/// Immutable snapshot of the session state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    /// Current lifecycle phase.
    pub phase: SessionPhase,
    /// Latest valid reading, `None` while the sensor is offline.
    pub current_reading: Option<Reading>,
    /// Bounded history, oldest first.
    pub history: Vec<HistoricalEntry>,
    /// Thresholds currently in effect.
    pub thresholds: ThresholdSet,
    /// Most recent alerts, newest first.
    pub alerts: Vec<Alert>,
    /// Latest derived insight.
    pub derived_insight: Option<DerivedInsight>,
    /// `true` until the first telemetry callback.
    pub is_loading_readings: bool,
    /// `true` while an analysis call is in flight.
    pub is_loading_analysis: bool,
}
