//! Error types for alert delivery.

use thiserror::Error;

/// Defines the possible errors that can occur while forwarding an alert.
#[derive(Debug, Error)]
pub enum NotificationError {
    /// An error related to invalid or missing configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The payload could not be serialized.
    #[error("Failed to serialize payload: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// The receiving endpoint rejected the notification.
    #[error("Notification failed: {0}")]
    NotifyFailed(String),

    /// An error from the underlying `reqwest` or `reqwest_middleware`
    /// libraries.
    #[error("Request error: {0}")]
    RequestError(#[from] reqwest_middleware::Error),
}
