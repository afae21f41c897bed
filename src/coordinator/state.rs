//! The in-memory session state owned by the coordinator.

use crate::{
    engine::{analysis_throttle::AnalysisTracker, history::HistoricalBuffer},
    models::{Alert, DerivedInsight, Reading, SessionPhase, SessionSnapshot, ThresholdSet},
};

/// Mutable state of one session. Only the coordinator task touches it.
#[derive(Debug)]
pub struct SessionState {
    pub phase: SessionPhase,
    pub current_reading: Option<Reading>,
    pub history: HistoricalBuffer,
    pub thresholds: ThresholdSet,
    pub alerts: Vec<Alert>,
    pub derived_insight: Option<DerivedInsight>,
    pub is_loading_readings: bool,
    pub analysis: AnalysisTracker,
}

impl SessionState {
    pub fn new(history_capacity: usize) -> Self {
        Self {
            phase: SessionPhase::Uninitialized,
            current_reading: None,
            history: HistoricalBuffer::new(history_capacity),
            thresholds: ThresholdSet::unlimited(),
            alerts: Vec::new(),
            derived_insight: None,
            is_loading_readings: false,
            analysis: AnalysisTracker::default(),
        }
    }

    /// Clears the loading flag and sets the phase after a telemetry callback.
    pub fn settle(&mut self, phase: SessionPhase) {
        self.is_loading_readings = false;
        if self.phase != phase {
            tracing::info!(from = ?self.phase, to = ?phase, "Session phase changed.");
            self.phase = phase;
        }
    }

    /// Removes the alert with `id`. Returns whether one was removed.
    pub fn dismiss_alert(&mut self, id: &str) -> bool {
        let before = self.alerts.len();
        self.alerts.retain(|a| a.id != id);
        self.alerts.len() != before
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            phase: self.phase,
            current_reading: self.current_reading,
            history: self.history.snapshot(),
            thresholds: self.thresholds.clone(),
            alerts: self.alerts.clone(),
            derived_insight: self.derived_insight.clone(),
            is_loading_readings: self.is_loading_readings,
            is_loading_analysis: self.analysis.in_flight(),
        }
    }
}
