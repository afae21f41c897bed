//! `replay`: feeds a recorded JSON-lines session through a coordinator and
//! prints the final session snapshot as JSON.

use std::{path::PathBuf, sync::Arc, time::Duration};

use clap::Parser;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::{
    analysis::{AnalysisClient, AnalysisError, DisabledAnalysisClient, HttpAnalysisClient},
    coordinator::{Coordinator, CoordinatorConfig, CoordinatorDeps},
    models::{SessionSnapshot, ThresholdSet},
    persistence::{
        InMemoryStateRepository, KeyValueThresholdStore, error::PersistenceError,
        threshold_store::DEFAULT_THRESHOLDS_KEY, traits::KeyValueStore,
    },
    providers::ReplaySource,
};

/// Errors of the `replay` subcommand.
#[derive(Error, Debug)]
pub enum ReplayError {
    /// A file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The thresholds file or the output could not be (de)serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The analysis client could not be created.
    #[error("Analysis client error: {0}")]
    Analysis(#[from] AnalysisError),

    /// The in-memory threshold store rejected the initial thresholds.
    #[error("Threshold store error: {0}")]
    Persistence(#[from] PersistenceError),

    /// The coordinator task panicked.
    #[error("Coordinator task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Arguments of the `replay` subcommand.
#[derive(Parser, Debug)]
pub struct ReplayArgs {
    /// JSON-lines file with one raw sensor payload per line.
    #[arg(short, long)]
    pub file: PathBuf,

    /// JSON file holding the thresholds to apply, keyed by pollutant id.
    #[arg(short, long)]
    pub thresholds: Option<PathBuf>,

    /// Base URL of the analysis service. Analysis is skipped when omitted.
    #[arg(short, long)]
    pub analysis_url: Option<Url>,

    /// Per-request analysis timeout in seconds.
    #[arg(long, default_value_t = 30)]
    pub analysis_timeout_secs: u64,
}

/// Replays `args.file` and returns the final snapshot.
pub async fn replay(args: &ReplayArgs) -> Result<SessionSnapshot, ReplayError> {
    let store = Arc::new(InMemoryStateRepository::new());
    if let Some(path) = &args.thresholds {
        let raw = tokio::fs::read_to_string(path).await?;
        let thresholds: ThresholdSet = serde_json::from_str(&raw)?;
        store.set_json_state(DEFAULT_THRESHOLDS_KEY, &thresholds).await?;
    }

    let analysis: Arc<dyn AnalysisClient> = match &args.analysis_url {
        Some(url) => Arc::new(HttpAnalysisClient::new(
            url.clone(),
            Duration::from_secs(args.analysis_timeout_secs),
        )?),
        None => Arc::new(DisabledAnalysisClient),
    };

    let deps = CoordinatorDeps {
        telemetry: Arc::new(ReplaySource::new(&args.file)),
        thresholds: Arc::new(KeyValueThresholdStore::new(store, DEFAULT_THRESHOLDS_KEY)),
        analysis,
        notifier: None,
    };
    let config = CoordinatorConfig { exit_when_source_ends: true, ..CoordinatorConfig::default() };
    let (coordinator, _handle) = Coordinator::new(config, deps, CancellationToken::new());

    Ok(coordinator.spawn().await?)
}

/// Runs the subcommand, printing the final snapshot to stdout.
pub async fn execute(args: ReplayArgs) -> Result<(), ReplayError> {
    let snapshot = replay(&args).await?;
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}
