//! Storage seams used by the coordinator.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde::{Serialize, de::DeserializeOwned};
use tokio::sync::{broadcast, mpsc};

use super::error::PersistenceError;
use crate::models::ThresholdSet;

/// A key-value store for JSON-serializable values with change notifications.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Retrieves a JSON-serializable value by its key.
    async fn get_json_state<T: DeserializeOwned + Send + Sync + 'static>(
        &self,
        key: &str,
    ) -> Result<Option<T>, PersistenceError>;

    /// Sets or updates a JSON-serializable value by its key.
    async fn set_json_state<T: Serialize + Send + Sync + 'static>(
        &self,
        key: &str,
        value: &T,
    ) -> Result<(), PersistenceError>;

    /// Subscribes to change notifications. Each message is the key that was
    /// written.
    fn watch(&self) -> broadcast::Receiver<String>;
}

/// Push-subscribe access to the persisted alert thresholds.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ThresholdStore: Send + Sync {
    /// Subscribes to the stored thresholds. The current value is delivered
    /// first, followed by every subsequent change. Dropping the receiver
    /// unsubscribes.
    async fn subscribe(&self) -> mpsc::Receiver<ThresholdSet>;

    /// Persists `thresholds`.
    async fn save(&self, thresholds: &ThresholdSet) -> Result<(), PersistenceError>;
}
