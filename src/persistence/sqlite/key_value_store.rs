//! Implementation of the KeyValueStore trait for SqliteStateRepository

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use tokio::sync::broadcast;

use crate::persistence::{
    error::PersistenceError, sqlite::SqliteStateRepository, traits::KeyValueStore,
};

#[async_trait]
impl KeyValueStore for SqliteStateRepository {
    /// Retrieves a JSON-serializable state object by its key.
    #[tracing::instrument(skip(self), level = "debug")]
    async fn get_json_state<T: DeserializeOwned + Send + Sync + 'static>(
        &self,
        key: &str,
    ) -> Result<Option<T>, PersistenceError> {
        tracing::debug!(key, "Attempting to retrieve JSON state.");

        let result: Option<String> = self
            .execute_query_with_error_handling(
                "get JSON state",
                sqlx::query_scalar("SELECT value FROM application_state WHERE key = ?")
                    .bind(key)
                    .fetch_optional(&self.pool),
            )
            .await?;

        match result {
            Some(value_str) => serde_json::from_str(&value_str)
                .map(Some)
                .map_err(|e| PersistenceError::SerializationError(e.to_string())),
            None => Ok(None),
        }
    }

    /// Sets or updates a JSON-serializable state object by its key.
    #[tracing::instrument(skip(self, value), level = "debug")]
    async fn set_json_state<T: Serialize + Send + Sync + 'static>(
        &self,
        key: &str,
        value: &T,
    ) -> Result<(), PersistenceError> {
        tracing::debug!(key, "Attempting to set JSON state.");

        let value_str = serde_json::to_string(value)
            .map_err(|e| PersistenceError::SerializationError(e.to_string()))?;

        self.execute_query_with_error_handling(
            "set JSON state",
            sqlx::query(
                "INSERT INTO application_state (key, value, updated_at) VALUES (?, ?, \
                 CURRENT_TIMESTAMP) ON CONFLICT(key) DO UPDATE SET value = excluded.value, \
                 updated_at = CURRENT_TIMESTAMP",
            )
            .bind(key)
            .bind(&value_str)
            .execute(&self.pool),
        )
        .await?;

        // No subscribers is not an error.
        let _ = self.changes.send(key.to_string());
        Ok(())
    }

    fn watch(&self) -> broadcast::Receiver<String> {
        self.changes.subscribe()
    }
}
