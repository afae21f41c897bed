//! A process-local key-value store, used when no database is configured.

use std::{collections::HashMap, sync::Mutex};

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use tokio::sync::broadcast;

use super::{error::PersistenceError, traits::KeyValueStore};

/// Keeps serialized values in memory. Values are stored as JSON strings so the
/// store behaves the same as the SQLite one with respect to type mismatches.
pub struct InMemoryStateRepository {
    values: Mutex<HashMap<String, String>>,
    changes: broadcast::Sender<String>,
}

impl InMemoryStateRepository {
    /// Creates an empty store.
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(64);
        Self { values: Mutex::new(HashMap::new()), changes }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, PersistenceError> {
        self.values.lock().map_err(|e| PersistenceError::OperationFailed(e.to_string()))
    }
}

impl Default for InMemoryStateRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStateRepository {
    async fn get_json_state<T: DeserializeOwned + Send + Sync + 'static>(
        &self,
        key: &str,
    ) -> Result<Option<T>, PersistenceError> {
        let raw = self.lock()?.get(key).cloned();
        raw.map(|s| {
            serde_json::from_str(&s).map_err(|e| PersistenceError::SerializationError(e.to_string()))
        })
        .transpose()
    }

    async fn set_json_state<T: Serialize + Send + Sync + 'static>(
        &self,
        key: &str,
        value: &T,
    ) -> Result<(), PersistenceError> {
        let raw = serde_json::to_string(value)
            .map_err(|e| PersistenceError::SerializationError(e.to_string()))?;
        self.lock()?.insert(key.to_string(), raw);
        let _ = self.changes.send(key.to_string());
        Ok(())
    }

    fn watch(&self) -> broadcast::Receiver<String> {
        self.changes.subscribe()
    }
}
