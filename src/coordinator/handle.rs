//! The session state surface handed to consumers of the coordinator.

use tokio::sync::{mpsc, oneshot, watch};

use super::{CoordinatorStopped, ThresholdSaveError, events::CoordinatorEvent};
use crate::models::{Pollutant, SessionSnapshot};

/// A cheap, cloneable handle to a running coordinator.
///
/// Reads are served from the latest published [`SessionSnapshot`]; actions are
/// queued behind every event already waiting to be processed.
#[derive(Debug, Clone)]
pub struct CoordinatorHandle {
    events: mpsc::Sender<CoordinatorEvent>,
    snapshots: watch::Receiver<SessionSnapshot>,
}

impl CoordinatorHandle {
    pub(super) fn new(
        events: mpsc::Sender<CoordinatorEvent>,
        snapshots: watch::Receiver<SessionSnapshot>,
    ) -> Self {
        Self { events, snapshots }
    }

    /// The most recently published session state.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    /// A receiver notified after every state change.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.clone()
    }

    /// Removes an alert. Returns `Ok(false)` if no alert has this id.
    pub async fn dismiss_alert(&self, id: impl Into<String>) -> Result<bool, CoordinatorStopped> {
        let (reply, rx) = oneshot::channel();
        self.events
            .send(CoordinatorEvent::DismissAlert { id: id.into(), reply })
            .await
            .map_err(|_| CoordinatorStopped)?;
        rx.await.map_err(|_| CoordinatorStopped)
    }

    /// Sets (`Some`) or clears (`None`) the threshold of `pollutant`.
    ///
    /// The in-memory thresholds change immediately; an error means only that
    /// the change could not be persisted.
    pub async fn set_threshold(
        &self,
        pollutant: Pollutant,
        value: Option<f64>,
    ) -> Result<(), ThresholdSaveError> {
        let (reply, rx) = oneshot::channel();
        self.events
            .send(CoordinatorEvent::SetThreshold { pollutant, value, reply })
            .await
            .map_err(|_| ThresholdSaveError::CoordinatorUnavailable)?;
        rx.await.map_err(|_| ThresholdSaveError::CoordinatorUnavailable)?
    }

    /// Asks the coordinator to tear the session down.
    pub async fn shutdown(&self) {
        let _ = self.events.send(CoordinatorEvent::Shutdown).await;
    }
}
