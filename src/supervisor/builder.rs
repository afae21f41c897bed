//! This module provides the `SupervisorBuilder` for constructing a `Supervisor`.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::{Supervisor, SupervisorError};
use crate::{
    analysis::{AnalysisClient, HttpAnalysisClient},
    config::AppConfig,
    coordinator::{Coordinator, CoordinatorConfig, CoordinatorDeps},
    notification::{AlertNotifier, WebhookNotifier},
    persistence::{
        InMemoryStateRepository, KeyValueThresholdStore, SqliteStateRepository,
        traits::ThresholdStore,
    },
    providers::{HttpPollingSource, TelemetrySource},
};

/// A builder for creating a `Supervisor` instance.
///
/// Only the configuration is required. Collaborators that are not provided
/// explicitly are built from it.
#[derive(Default)]
pub struct SupervisorBuilder {
    config: Option<AppConfig>,
    telemetry: Option<Arc<dyn TelemetrySource>>,
    thresholds: Option<Arc<dyn ThresholdStore>>,
    analysis: Option<Arc<dyn AnalysisClient>>,
    notifier: Option<Arc<dyn AlertNotifier>>,
}

impl SupervisorBuilder {
    /// Creates a new, empty `SupervisorBuilder`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the application configuration for the `Supervisor`.
    pub fn config(mut self, config: AppConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Overrides the telemetry source.
    pub fn telemetry(mut self, telemetry: Arc<dyn TelemetrySource>) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Overrides the threshold store.
    pub fn thresholds(mut self, thresholds: Arc<dyn ThresholdStore>) -> Self {
        self.thresholds = Some(thresholds);
        self
    }

    /// Overrides the analysis client.
    pub fn analysis(mut self, analysis: Arc<dyn AnalysisClient>) -> Self {
        self.analysis = Some(analysis);
        self
    }

    /// Overrides the alert notifier.
    pub fn notifier(mut self, notifier: Arc<dyn AlertNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Assembles the collaborators and the coordinator.
    pub async fn build(self) -> Result<Supervisor, SupervisorError> {
        let config = self.config.ok_or(SupervisorError::MissingConfig)?;
        let cancellation_token = CancellationToken::new();
        let mut database = None;

        let thresholds: Arc<dyn ThresholdStore> = match self.thresholds {
            Some(thresholds) => thresholds,
            None => match &config.database_url {
                Some(database_url) => {
                    tracing::debug!(database_url = %database_url, "Initializing state repository...");
                    let repo = Arc::new(SqliteStateRepository::new(database_url).await?);
                    repo.run_migrations().await?;
                    database = Some(Arc::clone(&repo));
                    Arc::new(KeyValueThresholdStore::new(repo, config.thresholds_key.clone()))
                }
                None => {
                    tracing::warn!("No database_url configured, thresholds will not survive a restart.");
                    Arc::new(KeyValueThresholdStore::new(
                        Arc::new(InMemoryStateRepository::new()),
                        config.thresholds_key.clone(),
                    ))
                }
            },
        };

        let telemetry: Arc<dyn TelemetrySource> = match self.telemetry {
            Some(telemetry) => telemetry,
            None => {
                let client = config.http_retry_config.retrying_client(reqwest::Client::builder().build()?);
                tracing::info!(url = %config.telemetry.url, interval = ?config.telemetry.polling_interval_ms, "Polling telemetry endpoint.");
                Arc::new(HttpPollingSource::new(
                    config.telemetry.url.clone(),
                    config.telemetry.polling_interval_ms,
                    client,
                    cancellation_token.clone(),
                ))
            }
        };

        let analysis: Arc<dyn AnalysisClient> = match self.analysis {
            Some(analysis) => analysis,
            None => Arc::new(HttpAnalysisClient::new(
                config.analysis.base_url.clone(),
                config.analysis.timeout_secs,
            )?),
        };

        let notifier: Option<Arc<dyn AlertNotifier>> = match (self.notifier, &config.notifier) {
            (Some(notifier), _) => Some(notifier),
            (None, Some(webhook)) => {
                let client = config.http_retry_config.retrying_client(reqwest::Client::builder().build()?);
                tracing::info!(url = %webhook.url, signed = webhook.secret.is_some(), "Forwarding alerts to webhook.");
                Some(Arc::new(WebhookNotifier::new(
                    webhook.url.clone(),
                    webhook.secret.clone(),
                    client,
                )?))
            }
            (None, None) => None,
        };

        let deps = CoordinatorDeps { telemetry, thresholds, analysis, notifier };
        let (coordinator, handle) = Coordinator::new(
            CoordinatorConfig::from(&config),
            deps,
            cancellation_token.child_token(),
        );

        Ok(Supervisor::new(config, coordinator, handle, database, cancellation_token))
    }
}
