//! Typed events processed by the coordinator.

use tokio::sync::oneshot;

use super::ThresholdSaveError;
use crate::{
    analysis::AnalysisError,
    models::{DerivedInsight, Pollutant, Reading, ThresholdSet},
    providers::TelemetryEvent,
};

/// Everything that can change the session state. Events are applied one at a
/// time, in arrival order.
#[derive(Debug)]
pub enum CoordinatorEvent {
    /// A delivery from the telemetry source.
    Telemetry(TelemetryEvent),

    /// The threshold store delivered its current value.
    Thresholds(ThresholdSet),

    /// An analysis call finished.
    AnalysisCompleted {
        /// Generation the call was issued under.
        generation: u64,
        /// The reading that was analyzed.
        reading: Reading,
        /// Outcome of the call.
        result: Result<DerivedInsight, AnalysisError>,
    },

    /// Periodic check for a stale derived insight.
    FallbackTick,

    /// The user dismissed an alert. Replies whether it existed.
    DismissAlert {
        /// Id of the alert to remove.
        id: String,
        /// Receives `true` if an alert was removed.
        reply: oneshot::Sender<bool>,
    },

    /// The user changed a threshold. `None` clears it.
    SetThreshold {
        /// Pollutant whose threshold changes.
        pollutant: Pollutant,
        /// New limit, or `None` for "never alert".
        value: Option<f64>,
        /// Receives the outcome of persisting the change.
        reply: oneshot::Sender<Result<(), ThresholdSaveError>>,
    },

    /// Tear the session down.
    Shutdown,
}
