//! The Supervisor module manages the lifecycle of the BreathEasy service.
//!
//! The `SupervisorBuilder` constructs and wires the collaborators (telemetry
//! source, threshold store, analysis client, alert notifier) around a single
//! session [`Coordinator`]. The `Supervisor` then runs the coordinator and the
//! optional HTTP API, listens for shutdown signals (Ctrl+C or SIGTERM), and
//! shuts everything down when a signal arrives or any supervised task exits.

mod builder;

use std::sync::Arc;

pub use builder::SupervisorBuilder;
use thiserror::Error;
use tokio::{signal, task::JoinSet};
use tokio_util::sync::CancellationToken;

use crate::{
    analysis::AnalysisError,
    config::AppConfig,
    coordinator::{Coordinator, CoordinatorHandle},
    http_server,
    notification::NotificationError,
    persistence::{SqliteStateRepository, error::PersistenceError},
};

/// Represents the set of errors that can occur during the supervisor's
/// operation.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// A required configuration was not provided to the `SupervisorBuilder`.
    #[error("Missing configuration for Supervisor")]
    MissingConfig,

    /// The state database could not be opened or migrated.
    #[error("State repository error: {0}")]
    Persistence(#[from] PersistenceError),

    /// The analysis client could not be created.
    #[error("Analysis client error: {0}")]
    Analysis(#[from] AnalysisError),

    /// The alert notifier could not be created.
    #[error("Notifier error: {0}")]
    Notification(#[from] NotificationError),

    /// An HTTP client could not be created.
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// The primary runtime manager for the application.
pub struct Supervisor {
    /// Shared application configuration.
    config: Arc<AppConfig>,

    /// The session coordinator, moved onto its task by `run`.
    coordinator: Option<Coordinator>,

    /// Handle to the coordinator, shared with the HTTP API.
    handle: CoordinatorHandle,

    /// The state database, closed during cleanup.
    database: Option<Arc<SqliteStateRepository>>,

    /// A token used to signal a graceful shutdown to all supervised tasks.
    cancellation_token: CancellationToken,

    /// A set of all spawned tasks that the supervisor is actively managing.
    join_set: JoinSet<()>,
}

impl Supervisor {
    pub(crate) fn new(
        config: AppConfig,
        coordinator: Coordinator,
        handle: CoordinatorHandle,
        database: Option<Arc<SqliteStateRepository>>,
        cancellation_token: CancellationToken,
    ) -> Self {
        Self {
            config: Arc::new(config),
            coordinator: Some(coordinator),
            handle,
            database,
            cancellation_token,
            join_set: JoinSet::new(),
        }
    }

    /// Returns a new `SupervisorBuilder` instance.
    pub fn builder() -> SupervisorBuilder {
        SupervisorBuilder::new()
    }

    /// The session surface of the supervised coordinator.
    pub fn handle(&self) -> CoordinatorHandle {
        self.handle.clone()
    }

    /// A token that stops the supervisor when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }

    /// Starts all services and blocks until shutdown completes.
    pub async fn run(mut self) -> Result<(), SupervisorError> {
        let cancellation_token = self.cancellation_token.clone();
        self.join_set.spawn(async move {
            let ctrl_c = signal::ctrl_c();
            #[cfg(unix)]
            let terminate = async {
                match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                    Ok(mut sigterm) => {
                        sigterm.recv().await;
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to register SIGTERM handler.");
                        std::future::pending::<()>().await;
                    }
                }
            };
            #[cfg(not(unix))]
            let terminate = std::future::pending::<()>();

            tokio::select! {
                _ = ctrl_c => tracing::info!("SIGINT (Ctrl+C) received, initiating graceful shutdown."),
                _ = terminate => tracing::info!("SIGTERM received, initiating graceful shutdown."),
                _ = cancellation_token.cancelled() => {}
            }

            cancellation_token.cancel();
        });

        if let Some(coordinator) = self.coordinator.take() {
            self.join_set.spawn(async move {
                let last = coordinator.run().await;
                tracing::info!(
                    history = last.history.len(),
                    alerts = last.alerts.len(),
                    "Final session state recorded."
                );
            });
        }

        if self.config.server.enabled {
            let listen_address = self.config.server.listen_address.clone();
            let handle = self.handle.clone();
            let token = self.cancellation_token.clone();
            self.join_set.spawn(async move {
                if let Err(e) = http_server::run_server(&listen_address, handle, token).await {
                    tracing::error!(error = %e, listen_address = %listen_address, "HTTP server failed.");
                }
            });
        }

        // Any supervised task ending brings the whole service down.
        loop {
            tokio::select! {
                maybe_result = self.join_set.join_next() => {
                    match maybe_result {
                        Some(Ok(())) => {
                            if !self.cancellation_token.is_cancelled() {
                                tracing::warn!("A supervised task exited. Initiating shutdown.");
                                self.cancellation_token.cancel();
                            }
                        }
                        Some(Err(e)) => {
                            tracing::error!("A critical task failed: {:?}. Initiating shutdown.", e);
                            self.cancellation_token.cancel();
                        }
                        None => break,
                    }
                }
                _ = self.cancellation_token.cancelled() => break,
            }
        }

        let shutdown_timeout = self.config.shutdown_timeout_secs;
        let cleanup_logic = async {
            while let Some(result) = self.join_set.join_next().await {
                if let Err(e) = result {
                    tracing::error!("Task failed during shutdown: {:?}", e);
                }
            }
            tracing::info!("All supervised tasks have completed.");
            if let Some(database) = &self.database {
                database.close().await;
            }
        };

        if tokio::time::timeout(shutdown_timeout, cleanup_logic).await.is_err() {
            tracing::warn!(
                "Cleanup did not complete within the timeout of {:?}. Aborting remaining tasks.",
                shutdown_timeout
            );
            self.join_set.shutdown().await;
        } else {
            tracing::info!("Cleanup completed successfully.");
        }

        tracing::info!("Supervisor shutdown complete.");
        Ok(())
    }
}
