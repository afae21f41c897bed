//! The session coordinator.
//!
//! A single task owns the [`SessionState`](state::SessionState) and applies
//! [`CoordinatorEvent`]s one at a time: telemetry deliveries, threshold store
//! notifications, analysis completions, fallback ticks and user actions. After
//! each event it publishes a [`SessionSnapshot`] on a `watch` channel.
//!
//! ## Analysis calls
//!
//! At most one analysis call is outstanding. Each call runs on its own task
//! and reports back through the event queue tagged with the generation it was
//! issued under. A completion whose generation no longer matches (the source
//! reset in the meantime) is discarded, and so is one that arrives after the
//! coordinator stopped, because the queue is gone. A reset does not cancel the
//! call itself, so no new call starts until the invalidated one reports back.
//!
//! ## Threshold writes
//!
//! The in-memory thresholds are updated as soon as the user changes them.
//! Persisting runs on a dedicated writer task so the event loop never waits
//! on the store and writes land in the order they were made. The store echoes
//! successful writes back through its subscription; echoes of this session's
//! own writes are ignored so a later change that failed to persist is kept.

mod events;
mod handle;
mod state;

use std::{collections::VecDeque, sync::Arc, time::Duration};

use chrono::{DateTime, DurationRound, TimeDelta, Utc};
use thiserror::Error;
use tokio::{
    sync::{mpsc, oneshot, watch},
    task::JoinHandle,
    time::{Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

pub use events::CoordinatorEvent;
pub use handle::CoordinatorHandle;
use state::SessionState;

use crate::{
    analysis::{AnalysisClient, AnalysisError},
    config::AppConfig,
    engine::{
        alert_manager::{AlertManager, DEFAULT_ALERT_COOLDOWN, DEFAULT_MAX_ALERTS},
        analysis_throttle::{
            self, AnalysisThrottle, DEFAULT_FALLBACK_PERIOD, DEFAULT_SIGNIFICANT_CHANGE_RATIO,
        },
        history::MAX_HISTORY,
        normalizer,
    },
    models::{
        Alert, DerivedInsight, HistoricalEntry, Pollutant, Reading, SessionPhase,
        SessionSnapshot, ThresholdSet,
    },
    notification::AlertNotifier,
    persistence::{error::PersistenceError, traits::ThresholdStore},
    providers::{TelemetryEvent, TelemetrySource},
};

/// A threshold change could not be persisted. The in-memory value was still
/// applied.
#[derive(Debug, Error)]
pub enum ThresholdSaveError {
    /// The store rejected the write.
    #[error("Failed to persist thresholds: {0}")]
    Persistence(#[from] PersistenceError),

    /// The coordinator stopped before the change was handled.
    #[error("Coordinator is not running")]
    CoordinatorUnavailable,
}

/// The coordinator stopped before the request was handled.
#[derive(Debug, Error)]
#[error("Coordinator is not running")]
pub struct CoordinatorStopped;

/// Tuning knobs of a session.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Maximum number of readings kept in history.
    pub history_capacity: usize,
    /// Maximum number of alerts kept.
    pub max_alerts: usize,
    /// Minimum time between two alerts for one pollutant.
    pub alert_cooldown: Duration,
    /// Relative change that triggers a new analysis.
    pub significant_change_ratio: f64,
    /// Maximum age of the derived insight while the sensor is quiescent.
    pub fallback_period: Duration,
    /// How often the fallback condition is checked.
    pub fallback_check_interval: Duration,
    /// Capacity of the event queue.
    pub event_channel_capacity: usize,
    /// Stop once the telemetry source is exhausted and no analysis is
    /// outstanding. Used for replays.
    pub exit_when_source_ends: bool,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            history_capacity: MAX_HISTORY,
            max_alerts: DEFAULT_MAX_ALERTS,
            alert_cooldown: DEFAULT_ALERT_COOLDOWN,
            significant_change_ratio: DEFAULT_SIGNIFICANT_CHANGE_RATIO,
            fallback_period: DEFAULT_FALLBACK_PERIOD,
            fallback_check_interval: Duration::from_secs(60),
            event_channel_capacity: 256,
            exit_when_source_ends: false,
        }
    }
}

impl From<&AppConfig> for CoordinatorConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            history_capacity: config.history_capacity,
            max_alerts: config.max_alerts,
            alert_cooldown: config.alert_cooldown_secs,
            significant_change_ratio: config.significant_change_ratio,
            fallback_period: config.analysis_fallback_period_secs,
            fallback_check_interval: config.fallback_check_interval_secs,
            event_channel_capacity: config.event_channel_capacity,
            exit_when_source_ends: false,
        }
    }
}

/// External collaborators of a session.
#[derive(Clone)]
pub struct CoordinatorDeps {
    /// Source of raw sensor payloads.
    pub telemetry: Arc<dyn TelemetrySource>,
    /// Persisted user thresholds.
    pub thresholds: Arc<dyn ThresholdStore>,
    /// The analysis collaborator.
    pub analysis: Arc<dyn AnalysisClient>,
    /// Receives newly raised alerts, if configured.
    pub notifier: Option<Arc<dyn AlertNotifier>>,
}

/// Number of recent own threshold writes remembered to recognize their echoes.
const OWN_WRITES_REMEMBERED: usize = 16;

struct ThresholdWrite {
    thresholds: ThresholdSet,
    reply: oneshot::Sender<Result<(), ThresholdSaveError>>,
}

/// The coordinator actor. Create it with [`Coordinator::new`] and start it
/// with [`Coordinator::spawn`].
pub struct Coordinator {
    config: CoordinatorConfig,
    deps: CoordinatorDeps,
    state: SessionState,
    alert_manager: AlertManager,
    throttle: AnalysisThrottle,
    events_tx: mpsc::Sender<CoordinatorEvent>,
    events_rx: mpsc::Receiver<CoordinatorEvent>,
    snapshot_tx: watch::Sender<SessionSnapshot>,
    threshold_writer: Option<mpsc::UnboundedSender<ThresholdWrite>>,
    own_writes: VecDeque<ThresholdSet>,
    cancellation_token: CancellationToken,
}

/// Receives from an optional channel; pends forever once it is gone.
async fn recv_optional<T>(rx: &mut Option<mpsc::Receiver<T>>) -> Option<T> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

/// Arrival time at the millisecond resolution of alert ids.
fn arrival_time() -> DateTime<Utc> {
    let now = Utc::now();
    now.duration_trunc(TimeDelta::milliseconds(1)).unwrap_or(now)
}

impl Coordinator {
    /// Creates a coordinator and the handle used to talk to it.
    pub fn new(
        config: CoordinatorConfig,
        deps: CoordinatorDeps,
        cancellation_token: CancellationToken,
    ) -> (Self, CoordinatorHandle) {
        let (events_tx, events_rx) = mpsc::channel(config.event_channel_capacity.max(1));
        let (snapshot_tx, snapshot_rx) = watch::channel(SessionSnapshot::default());
        let handle = CoordinatorHandle::new(events_tx.clone(), snapshot_rx);
        let coordinator = Self {
            state: SessionState::new(config.history_capacity),
            alert_manager: AlertManager::new(config.alert_cooldown, config.max_alerts),
            throttle: AnalysisThrottle::new(
                config.significant_change_ratio,
                config.fallback_period,
            ),
            config,
            deps,
            events_tx,
            events_rx,
            snapshot_tx,
            threshold_writer: None,
            own_writes: VecDeque::with_capacity(OWN_WRITES_REMEMBERED),
            cancellation_token,
        };
        (coordinator, handle)
    }

    /// Runs the coordinator on a new task. The task yields the final snapshot.
    pub fn spawn(self) -> JoinHandle<SessionSnapshot> {
        tokio::spawn(self.run())
    }

    /// Runs the session until shutdown, cancellation, or (for replays) the
    /// end of the telemetry stream. Returns the final snapshot.
    pub async fn run(mut self) -> SessionSnapshot {
        self.state.phase = SessionPhase::Loading;
        self.state.is_loading_readings = true;
        self.publish();

        let telemetry_rx = match self.deps.telemetry.subscribe().await {
            Ok(rx) => Some(rx),
            Err(e) => {
                tracing::error!(error = %e, "Failed to subscribe to telemetry source.");
                self.state.settle(SessionPhase::Degraded);
                None
            }
        };
        let mut thresholds_rx = Some(self.deps.thresholds.subscribe().await);

        // Readings are only evaluated once the stored thresholds are known.
        // User actions arriving meanwhile are applied right after.
        let mut deferred = Vec::new();
        let stopped = loop {
            tokio::select! {
                biased;

                _ = self.cancellation_token.cancelled() => {
                    tracing::info!("Coordinator cancelled while waiting for thresholds.");
                    break true;
                }
                initial = recv_optional(&mut thresholds_rx) => {
                    match initial {
                        Some(initial) => self.state.thresholds = initial,
                        None => {
                            tracing::warn!("Threshold store closed before delivering, alerting disabled.");
                            thresholds_rx = None;
                        }
                    }
                    break false;
                }
                Some(event) = self.events_rx.recv() => match event {
                    CoordinatorEvent::Shutdown => {
                        tracing::info!("Coordinator shutdown requested while waiting for thresholds.");
                        break true;
                    }
                    event => deferred.push(event),
                },
            }
        };

        if !stopped {
            self.threshold_writer =
                Some(spawn_threshold_writer(Arc::clone(&self.deps.thresholds)));
            for event in deferred {
                self.apply(event);
            }
            self.publish();
            self.run_loop(telemetry_rx, thresholds_rx).await;
        }

        self.state.analysis.invalidate();
        self.state.phase = SessionPhase::Terminated;
        self.publish();
        tracing::info!("Coordinator has shut down.");
        self.state.snapshot()
    }

    /// Processes events until shutdown, cancellation, or the end of a replay.
    /// Both subscriptions are dropped on return.
    async fn run_loop(
        &mut self,
        mut telemetry_rx: Option<mpsc::Receiver<TelemetryEvent>>,
        mut thresholds_rx: Option<mpsc::Receiver<ThresholdSet>>,
    ) {
        let period = self.config.fallback_check_interval.max(Duration::from_millis(1));
        let mut fallback = tokio::time::interval_at(Instant::now() + period, period);
        fallback.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!("Coordinator started.");
        loop {
            if self.config.exit_when_source_ends
                && telemetry_rx.is_none()
                && !self.state.analysis.outstanding()
            {
                tracing::info!("Telemetry source exhausted, stopping coordinator.");
                break;
            }

            let event = tokio::select! {
                biased;

                _ = self.cancellation_token.cancelled() => {
                    tracing::info!("Coordinator cancellation signal received, shutting down...");
                    break;
                }
                Some(event) = self.events_rx.recv() => event,
                thresholds = recv_optional(&mut thresholds_rx) => match thresholds {
                    Some(thresholds) => CoordinatorEvent::Thresholds(thresholds),
                    None => {
                        tracing::warn!("Threshold subscription ended, keeping last known thresholds.");
                        thresholds_rx = None;
                        continue;
                    }
                },
                delivery = recv_optional(&mut telemetry_rx) => match delivery {
                    Some(delivery) => CoordinatorEvent::Telemetry(delivery),
                    None => {
                        tracing::warn!("Telemetry subscription ended.");
                        telemetry_rx = None;
                        continue;
                    }
                },
                _ = fallback.tick() => CoordinatorEvent::FallbackTick,
            };

            if matches!(event, CoordinatorEvent::Shutdown) {
                tracing::info!("Coordinator shutdown requested.");
                break;
            }
            self.apply(event);
            self.publish();
        }
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(self.state.snapshot());
    }

    /// Applies one event to the session state.
    fn apply(&mut self, event: CoordinatorEvent) {
        match event {
            CoordinatorEvent::Telemetry(delivery) => self.on_telemetry(delivery),
            CoordinatorEvent::Thresholds(thresholds) => {
                if self.own_writes.contains(&thresholds) {
                    tracing::debug!("Ignoring store echo of an own threshold write.");
                } else {
                    tracing::debug!("Thresholds updated from store.");
                    self.state.thresholds = thresholds;
                }
            }
            CoordinatorEvent::AnalysisCompleted { generation, reading, result } => {
                self.on_analysis_completed(generation, reading, result)
            }
            CoordinatorEvent::FallbackTick => self.on_fallback_tick(Utc::now()),
            CoordinatorEvent::DismissAlert { id, reply } => {
                let removed = self.state.dismiss_alert(&id);
                tracing::debug!(alert_id = %id, removed, "Alert dismissal handled.");
                let _ = reply.send(removed);
            }
            CoordinatorEvent::SetThreshold { pollutant, value, reply } => {
                self.on_set_threshold(pollutant, value, reply)
            }
            CoordinatorEvent::Shutdown => {}
        }
    }

    fn on_telemetry(&mut self, delivery: TelemetryEvent) {
        match delivery {
            TelemetryEvent::Payload(Some(payload)) => match normalizer::normalize(&payload) {
                Some(reading) => {
                    let captured_at =
                        normalizer::capture_timestamp(&payload).unwrap_or_else(arrival_time);
                    self.on_reading(reading, captured_at);
                }
                None => {
                    tracing::debug!("Payload carried no recognizable pollutant, treating as absent.");
                    self.on_absent();
                }
            },
            TelemetryEvent::Payload(None) => self.on_absent(),
            TelemetryEvent::Error(message) => {
                tracing::warn!(error = %message, "Telemetry source reported an error.");
                self.state.settle(SessionPhase::Degraded);
            }
            TelemetryEvent::Reset => {
                tracing::info!(
                    discarded_entries = self.state.history.len(),
                    "Telemetry source reset, clearing history."
                );
                self.state.history.clear();
                self.state.analysis.invalidate();
            }
        }
    }

    fn on_reading(&mut self, reading: Reading, captured_at: DateTime<Utc>) {
        self.state.settle(SessionPhase::Live);
        self.state.current_reading = Some(reading);
        self.state.history.append(HistoricalEntry::new(reading, captured_at));

        let new_alerts = self.alert_manager.evaluate(
            &reading,
            &self.state.thresholds,
            &self.state.alerts,
            captured_at,
        );
        self.forward_alerts(&new_alerts);
        self.alert_manager.merge(&mut self.state.alerts, new_alerts);

        if self.throttle.should_trigger(
            &reading,
            self.state.analysis.last_analyzed(),
            self.state.analysis.outstanding(),
        ) {
            self.start_analysis(reading);
        }
    }

    fn on_absent(&mut self) {
        if self.state.current_reading.is_some() {
            tracing::info!("Sensor went offline.");
        }
        self.state.settle(SessionPhase::Degraded);
        self.state.current_reading = None;
        // The next valid reading is analyzed unconditionally.
        self.state.analysis.forget_last_analyzed();
    }

    fn on_fallback_tick(&mut self, now: DateTime<Utc>) {
        let Some(reading) = self.state.current_reading else {
            return;
        };
        if self.throttle.fallback_due(
            self.state.analysis.last_started_at(),
            now,
            self.state.analysis.outstanding(),
        ) {
            tracing::info!("Derived insight is stale, running fallback analysis.");
            self.start_analysis(reading);
        }
    }

    fn start_analysis(&mut self, reading: Reading) {
        let Some(generation) = self.state.analysis.begin(reading, Utc::now()) else {
            return;
        };
        tracing::debug!(generation, "Starting analysis.");

        let client = Arc::clone(&self.deps.analysis);
        let events = self.events_tx.clone();
        tokio::spawn(async move {
            let result = analysis_throttle::run(client.as_ref(), reading).await;
            let completed = CoordinatorEvent::AnalysisCompleted { generation, reading, result };
            if events.send(completed).await.is_err() {
                tracing::debug!(generation, "Coordinator stopped, discarding analysis result.");
            }
        });
    }

    fn on_analysis_completed(
        &mut self,
        generation: u64,
        reading: Reading,
        result: Result<DerivedInsight, AnalysisError>,
    ) {
        if !self.state.analysis.complete(generation, result.is_ok()) {
            tracing::debug!(generation, "Discarding stale analysis completion.");
            // The current reading may have been held back while the stale call drained.
            if let Some(current) = self.state.current_reading {
                if self.throttle.should_trigger(
                    &current,
                    self.state.analysis.last_analyzed(),
                    self.state.analysis.outstanding(),
                ) {
                    self.start_analysis(current);
                }
            }
            return;
        }
        match result {
            Ok(insight) => {
                tracing::info!(generation, "Derived insight updated.");
                self.state.derived_insight = Some(insight);
            }
            Err(e) => {
                tracing::warn!(generation, error = %e, "Analysis failed.");
                self.state.derived_insight = Some(DerivedInsight::unavailable(reading));
            }
        }
    }

    fn on_set_threshold(
        &mut self,
        pollutant: Pollutant,
        value: Option<f64>,
        reply: oneshot::Sender<Result<(), ThresholdSaveError>>,
    ) {
        self.state.thresholds.set(pollutant, value);
        tracing::info!(pollutant = %pollutant, limit = ?self.state.thresholds.limit(pollutant), "Threshold changed.");

        if self.own_writes.len() == OWN_WRITES_REMEMBERED {
            self.own_writes.pop_front();
        }
        self.own_writes.push_back(self.state.thresholds.clone());

        let write = ThresholdWrite { thresholds: self.state.thresholds.clone(), reply };
        match &self.threshold_writer {
            Some(writer) => {
                if let Err(mpsc::error::SendError(write)) = writer.send(write) {
                    let _ = write.reply.send(Err(ThresholdSaveError::CoordinatorUnavailable));
                }
            }
            None => {
                let _ = write.reply.send(Err(ThresholdSaveError::CoordinatorUnavailable));
            }
        }
    }

    fn forward_alerts(&self, alerts: &[Alert]) {
        let Some(notifier) = &self.deps.notifier else {
            return;
        };
        for alert in alerts {
            let notifier = Arc::clone(notifier);
            let alert = alert.clone();
            tokio::spawn(async move {
                if let Err(e) = notifier.notify(&alert).await {
                    tracing::warn!(alert_id = %alert.id, error = %e, "Failed to forward alert.");
                }
            });
        }
    }
}

/// Persists threshold writes one after another, in submission order.
fn spawn_threshold_writer(store: Arc<dyn ThresholdStore>) -> mpsc::UnboundedSender<ThresholdWrite> {
    let (tx, mut rx) = mpsc::unbounded_channel::<ThresholdWrite>();
    tokio::spawn(async move {
        while let Some(ThresholdWrite { thresholds, reply }) = rx.recv().await {
            let result = store.save(&thresholds).await.map_err(|e| {
                tracing::warn!(error = %e, "Threshold change kept in memory but not persisted.");
                ThresholdSaveError::from(e)
            });
            let _ = reply.send(result);
        }
    });
    tx
}
