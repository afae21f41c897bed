//! Configuration module for BreathEasy.

mod app_config;
mod helpers;
mod http_retry;
mod server;
mod sources;

pub use app_config::AppConfig;
pub use helpers::{
    deserialize_duration_from_ms, deserialize_duration_from_seconds, serialize_duration_to_ms,
    serialize_duration_to_seconds,
};
pub use http_retry::{HttpRetryConfig, JitterSetting};
pub use server::ServerConfig;
pub use sources::{AnalysisConfig, NotifierConfig, TelemetryConfig};
