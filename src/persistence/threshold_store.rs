//! Threshold store adapter: exposes the persisted [`ThresholdSet`] as a push
//! subscription over any [`KeyValueStore`].

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc};

use super::{
    error::PersistenceError,
    traits::{KeyValueStore, ThresholdStore},
};
use crate::models::ThresholdSet;

/// Default key under which thresholds are persisted.
pub const DEFAULT_THRESHOLDS_KEY: &str = "user_settings/thresholds";

/// Buffer size of a subscriber's channel.
const SUBSCRIPTION_BUFFER: usize = 16;

/// A [`ThresholdStore`] persisting thresholds as a single JSON value.
pub struct KeyValueThresholdStore<S> {
    store: Arc<S>,
    key: String,
}

impl<S: KeyValueStore + 'static> KeyValueThresholdStore<S> {
    /// Creates an adapter storing thresholds under `key`.
    pub fn new(store: Arc<S>, key: impl Into<String>) -> Self {
        Self { store, key: key.into() }
    }

    /// Loads the stored thresholds, defaulting to "never alert" when nothing
    /// is stored or the stored value cannot be read.
    pub async fn load(&self) -> ThresholdSet {
        load_or_default(self.store.as_ref(), &self.key).await
    }
}

async fn read<S: KeyValueStore>(
    store: &S,
    key: &str,
) -> Result<Option<ThresholdSet>, PersistenceError> {
    store.get_json_state::<ThresholdSet>(key).await
}

async fn load_or_default<S: KeyValueStore>(store: &S, key: &str) -> ThresholdSet {
    match read(store, key).await {
        Ok(Some(thresholds)) => thresholds,
        Ok(None) => {
            tracing::info!(key, "No stored thresholds found, alerting disabled until configured.");
            ThresholdSet::unlimited()
        }
        Err(e) => {
            tracing::warn!(key, error = %e, "Failed to load thresholds, alerting disabled until configured.");
            ThresholdSet::unlimited()
        }
    }
}

#[async_trait]
impl<S: KeyValueStore + 'static> ThresholdStore for KeyValueThresholdStore<S> {
    async fn subscribe(&self) -> mpsc::Receiver<ThresholdSet> {
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);
        // Watch before the initial read so no write can slip in between.
        let mut changes = self.store.watch();
        let store = Arc::clone(&self.store);
        let key = self.key.clone();

        tokio::spawn(async move {
            let initial = load_or_default(store.as_ref(), &key).await;
            if tx.send(initial).await.is_err() {
                return;
            }

            loop {
                tokio::select! {
                    _ = tx.closed() => break,
                    change = changes.recv() => match change {
                        Ok(changed) if changed != key => continue,
                        Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {
                            match read(store.as_ref(), &key).await {
                                Ok(Some(thresholds)) => {
                                    if tx.send(thresholds).await.is_err() {
                                        break;
                                    }
                                }
                                Ok(None) => {}
                                Err(e) => {
                                    tracing::warn!(key = %key, error = %e, "Failed to reload thresholds, keeping last known values.");
                                }
                            }
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                }
            }
            tracing::debug!(key = %key, "Threshold subscription ended.");
        });

        rx
    }

    #[tracing::instrument(skip(self, thresholds), fields(key = %self.key), level = "debug")]
    async fn save(&self, thresholds: &ThresholdSet) -> Result<(), PersistenceError> {
        self.store.set_json_state(&self.key, thresholds).await.inspect_err(|e| {
            tracing::warn!(error = %e, "Failed to persist thresholds.");
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        models::Pollutant,
        persistence::{memory::InMemoryStateRepository, traits::MockKeyValueStore},
    };

    async fn next(rx: &mut mpsc::Receiver<ThresholdSet>) -> ThresholdSet {
        tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("timed out waiting for thresholds")
            .expect("subscription closed")
    }

    #[tokio::test]
    async fn test_subscribe_delivers_stored_thresholds() {
        let store = Arc::new(InMemoryStateRepository::new());
        let stored = ThresholdSet::unlimited().with(Pollutant::Pm25, 20.0);
        store.set_json_state(DEFAULT_THRESHOLDS_KEY, &stored).await.unwrap();

        let adapter = KeyValueThresholdStore::new(store, DEFAULT_THRESHOLDS_KEY);
        let mut rx = adapter.subscribe().await;
        assert_eq!(next(&mut rx).await, stored);
    }

    #[tokio::test]
    async fn test_subscribe_defaults_when_nothing_stored() {
        let store = Arc::new(InMemoryStateRepository::new());
        let adapter = KeyValueThresholdStore::new(store, DEFAULT_THRESHOLDS_KEY);
        let mut rx = adapter.subscribe().await;
        assert!(next(&mut rx).await.is_unlimited());
    }

    #[tokio::test]
    async fn test_subscribe_pushes_later_writes() {
        let store = Arc::new(InMemoryStateRepository::new());
        let adapter = KeyValueThresholdStore::new(Arc::clone(&store), DEFAULT_THRESHOLDS_KEY);
        let mut rx = adapter.subscribe().await;
        assert!(next(&mut rx).await.is_unlimited());

        // Writes to unrelated keys are ignored.
        store.set_json_state("other", &1u32).await.unwrap();
        let updated = ThresholdSet::unlimited().with(Pollutant::Co, 9.0);
        adapter.save(&updated).await.unwrap();
        assert_eq!(next(&mut rx).await, updated);
    }

    #[tokio::test]
    async fn test_unreadable_stored_value_defaults_to_unlimited() {
        let store = Arc::new(InMemoryStateRepository::new());
        store.set_json_state(DEFAULT_THRESHOLDS_KEY, &"garbage").await.unwrap();
        let adapter = KeyValueThresholdStore::new(store, DEFAULT_THRESHOLDS_KEY);
        assert!(adapter.load().await.is_unlimited());
    }

    #[tokio::test]
    async fn test_read_failure_defaults_to_unlimited() {
        let mut mock = MockKeyValueStore::new();
        let (changes, _) = broadcast::channel(1);
        mock.expect_watch().returning(move || changes.subscribe());
        mock.expect_get_json_state::<ThresholdSet>()
            .returning(|_| Err(PersistenceError::OperationFailed("disk on fire".to_string())));

        let adapter = KeyValueThresholdStore::new(Arc::new(mock), DEFAULT_THRESHOLDS_KEY);
        let mut rx = adapter.subscribe().await;
        assert!(next(&mut rx).await.is_unlimited());
    }

    #[tokio::test]
    async fn test_save_failure_is_returned() {
        let mut mock = MockKeyValueStore::new();
        mock.expect_set_json_state::<ThresholdSet>()
            .returning(|_, _| Err(PersistenceError::OperationFailed("read-only".to_string())));

        let adapter = KeyValueThresholdStore::new(Arc::new(mock), DEFAULT_THRESHOLDS_KEY);
        let result = adapter.save(&ThresholdSet::unlimited()).await;
        assert!(matches!(result, Err(PersistenceError::OperationFailed(_))));
    }
}
