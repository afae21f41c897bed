//! SQLite-backed key-value store for application state.

use std::str::FromStr;

use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use tokio::sync::broadcast;

pub mod key_value_store;

use crate::persistence::error::PersistenceError;

/// Capacity of the change-notification channel.
const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// A key-value store backed by a SQLite database.
pub struct SqliteStateRepository {
    /// The SQLite connection pool used for database operations.
    pool: SqlitePool,

    /// Publishes the key of every successful write.
    changes: broadcast::Sender<String>,
}

impl SqliteStateRepository {
    /// Creates a new instance of SqliteStateRepository with the provided
    /// database URL. This will create the database file if it does not
    /// exist.
    #[tracing::instrument(level = "info")]
    pub async fn new(database_url: &str) -> Result<Self, PersistenceError> {
        tracing::debug!(database_url, "Attempting to connect to SQLite database.");
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| PersistenceError::InvalidInput(e.to_string()))?
            .create_if_missing(true);

        // Every connection to an in-memory database gets its own database, so
        // the pool must hold exactly one connection for its whole lifetime.
        let pool_options = if database_url.contains(":memory:") {
            SqlitePoolOptions::new().max_connections(1).idle_timeout(None).max_lifetime(None)
        } else {
            SqlitePoolOptions::new()
        };

        let pool = pool_options.connect_with(options).await.map_err(|e| {
            PersistenceError::OperationFailed(format!("Failed to connect to database: {}", e))
        })?;
        tracing::info!(database_url, "Successfully connected to SQLite database.");
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Ok(Self { pool, changes })
    }

    /// Runs database migrations.
    #[tracing::instrument(skip(self), level = "info")]
    pub async fn run_migrations(&self) -> Result<(), PersistenceError> {
        tracing::debug!("Running database migrations.");
        sqlx::migrate!("./migrations").run(&self.pool).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to run database migrations.");
            PersistenceError::MigrationError(e.to_string())
        })?;
        tracing::info!("Database migrations completed successfully.");
        Ok(())
    }

    /// Closes the connection pool gracefully.
    #[tracing::instrument(skip(self), level = "info")]
    pub async fn close(&self) {
        tracing::debug!("Closing SQLite connection pool.");
        self.pool.close().await;
        tracing::info!("SQLite connection pool closed successfully.");
    }

    /// Helper to execute database queries with consistent error handling
    async fn execute_query_with_error_handling<F, T, E>(
        &self,
        operation: &str,
        query_fn: F,
    ) -> Result<T, PersistenceError>
    where
        F: std::future::Future<Output = Result<T, E>>,
        E: std::error::Error,
    {
        query_fn.await.map_err(|e| {
            tracing::error!(error = %e, operation = %operation, "Database operation failed.");
            PersistenceError::OperationFailed(e.to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    use super::*;
    use crate::persistence::traits::KeyValueStore;

    #[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
    struct TestState {
        value: String,
        count: u32,
    }

    async fn setup_db() -> SqliteStateRepository {
        let repo = SqliteStateRepository::new("sqlite::memory:")
            .await
            .expect("Failed to connect to in-memory db");
        repo.run_migrations().await.expect("Failed to run migrations");
        repo
    }

    #[tokio::test]
    async fn test_get_missing_key_returns_none() {
        let repo = setup_db().await;
        let state: Option<TestState> = repo.get_json_state("missing").await.unwrap();
        assert!(state.is_none());
    }

    #[tokio::test]
    async fn test_set_and_get_json_state() {
        let repo = setup_db().await;
        let state = TestState { value: "a".to_string(), count: 1 };
        repo.set_json_state("k", &state).await.unwrap();
        let loaded: Option<TestState> = repo.get_json_state("k").await.unwrap();
        assert_eq!(loaded, Some(state));
    }

    #[tokio::test]
    async fn test_set_json_state_overwrites_existing_value() {
        let repo = setup_db().await;
        repo.set_json_state("k", &TestState { value: "a".to_string(), count: 1 }).await.unwrap();
        repo.set_json_state("k", &TestState { value: "b".to_string(), count: 2 }).await.unwrap();
        let loaded: Option<TestState> = repo.get_json_state("k").await.unwrap();
        assert_eq!(loaded, Some(TestState { value: "b".to_string(), count: 2 }));
    }

    #[tokio::test]
    async fn test_get_json_state_with_wrong_shape_is_serialization_error() {
        let repo = setup_db().await;
        repo.set_json_state("k", &"just a string").await.unwrap();
        let result: Result<Option<TestState>, _> = repo.get_json_state("k").await;
        assert!(matches!(result, Err(PersistenceError::SerializationError(_))));
    }

    #[tokio::test]
    async fn test_watch_receives_written_keys() {
        let repo = setup_db().await;
        let mut changes = repo.watch();
        repo.set_json_state("first", &1u32).await.unwrap();
        repo.set_json_state("second", &2u32).await.unwrap();
        assert_eq!(changes.recv().await.unwrap(), "first");
        assert_eq!(changes.recv().await.unwrap(), "second");
    }
}
