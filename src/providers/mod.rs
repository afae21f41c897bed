//! Telemetry sources feeding raw sensor payloads to the coordinator.

pub mod http;
pub mod replay;
pub mod traits;

pub use http::HttpPollingSource;
pub use replay::ReplaySource;
pub use traits::{SourceError, TelemetryEvent, TelemetrySource};
