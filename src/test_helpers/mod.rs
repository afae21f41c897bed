//! A set of helpers for testing

mod analysis;
mod payload;
mod session;
mod telemetry;
mod thresholds;

pub use analysis::{AnalysisCalls, PendingAnalysis, ScriptedAnalysisClient};
pub use payload::{PayloadBuilder, ReadingBuilder};
pub use session::wait_for_snapshot;
pub use telemetry::ChannelTelemetrySource;
pub use thresholds::StaticThresholdStore;
