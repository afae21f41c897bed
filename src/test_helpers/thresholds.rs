//! A threshold store with scripted contents and failures.

use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::{
    models::ThresholdSet,
    persistence::{error::PersistenceError, traits::ThresholdStore},
};

/// Delivers a fixed initial set and records every save.
#[derive(Debug, Default)]
pub struct StaticThresholdStore {
    initial: ThresholdSet,
    fail_saves: bool,
    saved: Mutex<Vec<ThresholdSet>>,
    subscribers: Mutex<Vec<mpsc::Sender<ThresholdSet>>>,
}

impl StaticThresholdStore {
    /// A store initially holding `initial`.
    pub fn new(initial: ThresholdSet) -> Self {
        Self { initial, ..Self::default() }
    }

    /// A store whose writes always fail.
    pub fn failing_saves(initial: ThresholdSet) -> Self {
        Self { initial, fail_saves: true, ..Self::default() }
    }

    /// Every set successfully saved, in order.
    pub fn saved(&self) -> Vec<ThresholdSet> {
        self.saved.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Pushes `thresholds` to every subscriber, as if changed elsewhere.
    pub async fn push(&self, thresholds: ThresholdSet) {
        let subscribers = self.subscribers.lock().map(|s| s.clone()).unwrap_or_default();
        for subscriber in subscribers {
            let _ = subscriber.send(thresholds.clone()).await;
        }
    }
}

#[async_trait]
impl ThresholdStore for StaticThresholdStore {
    async fn subscribe(&self) -> mpsc::Receiver<ThresholdSet> {
        let (tx, rx) = mpsc::channel(16);
        let _ = tx.try_send(self.initial.clone());
        if let Ok(mut subscribers) = self.subscribers.lock() {
            subscribers.push(tx);
        }
        rx
    }

    async fn save(&self, thresholds: &ThresholdSet) -> Result<(), PersistenceError> {
        if self.fail_saves {
            return Err(PersistenceError::OperationFailed("store is read-only".to_string()));
        }
        if let Ok(mut saved) = self.saved.lock() {
            saved.push(thresholds.clone());
        }
        Ok(())
    }
}
