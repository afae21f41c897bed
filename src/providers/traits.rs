//! This module defines the push-subscribe interface of a telemetry source.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors raised while establishing a telemetry subscription.
#[derive(Error, Debug)]
pub enum SourceError {
    /// The source cannot serve a subscription.
    #[error("Telemetry source unavailable: {0}")]
    Unavailable(String),

    /// The replay file could not be read.
    #[error("Failed to read telemetry file: {0}")]
    Io(#[from] std::io::Error),
}

/// One delivery from a telemetry source.
#[derive(Debug, Clone, PartialEq)]
pub enum TelemetryEvent {
    /// The latest raw payload, or `None` when the source explicitly reports
    /// that no data is available.
    Payload(Option<Value>),

    /// The source failed to produce a value.
    Error(String),

    /// The upstream series restarted; previously delivered data is void.
    Reset,
}

/// A source of raw sensor payloads.
///
/// Deliveries are neither evenly spaced nor deduplicated. Dropping the
/// returned receiver unsubscribes.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TelemetrySource: Send + Sync {
    /// Starts delivering events.
    async fn subscribe(&self) -> Result<mpsc::Receiver<TelemetryEvent>, SourceError>;
}
