//! A telemetry source replaying recorded payloads from a JSON-lines file.
//!
//! Each non-empty line is one delivery. `null` means "no data"; a line
//! holding the string `"reset"` restarts the series. Lines that are not valid
//! JSON are delivered as [`TelemetryEvent::Error`].

use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use super::traits::{SourceError, TelemetryEvent, TelemetrySource};

/// Replays a recorded session.
pub struct ReplaySource {
    path: PathBuf,
}

impl ReplaySource {
    /// Creates a source replaying `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

/// Parses one recorded line.
pub(crate) fn parse_line(line: &str) -> Option<TelemetryEvent> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    Some(match serde_json::from_str::<Value>(line) {
        Ok(Value::Null) => TelemetryEvent::Payload(None),
        Ok(Value::String(s)) if s == "reset" => TelemetryEvent::Reset,
        Ok(value) => TelemetryEvent::Payload(Some(value)),
        Err(e) => TelemetryEvent::Error(format!("malformed line: {e}")),
    })
}

#[async_trait]
impl TelemetrySource for ReplaySource {
    #[tracing::instrument(skip(self), fields(path = %self.path.display()), level = "info")]
    async fn subscribe(&self) -> Result<mpsc::Receiver<TelemetryEvent>, SourceError> {
        let contents = tokio::fs::read_to_string(&self.path).await?;
        let events: Vec<_> = contents.lines().filter_map(parse_line).collect();
        tracing::info!(events = events.len(), "Loaded telemetry recording.");

        let (tx, rx) = mpsc::channel(events.len().max(1));
        tokio::spawn(async move {
            for event in events {
                if tx.send(event).await.is_err() {
                    break;
                }
            }
        });
        Ok(rx)
    }
}
