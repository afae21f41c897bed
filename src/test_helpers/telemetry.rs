//! A telemetry source driven by the test through a channel.

use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::providers::{SourceError, TelemetryEvent, TelemetrySource};

/// Delivers whatever the test sends on the paired sender. Supports a single
/// subscription.
#[derive(Debug)]
pub struct ChannelTelemetrySource {
    receiver: Mutex<Option<mpsc::Receiver<TelemetryEvent>>>,
}

impl ChannelTelemetrySource {
    /// Creates a source and the sender feeding it.
    pub fn new() -> (Self, mpsc::Sender<TelemetryEvent>) {
        let (tx, rx) = mpsc::channel(64);
        (Self { receiver: Mutex::new(Some(rx)) }, tx)
    }
}

#[async_trait]
impl TelemetrySource for ChannelTelemetrySource {
    async fn subscribe(&self) -> Result<mpsc::Receiver<TelemetryEvent>, SourceError> {
        self.receiver
            .lock()
            .map_err(|e| SourceError::Unavailable(e.to_string()))?
            .take()
            .ok_or_else(|| SourceError::Unavailable("already subscribed".to_string()))
    }
}
