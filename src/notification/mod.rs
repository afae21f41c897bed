//! Outbound delivery of newly raised alerts to a control room.
//!
//! The coordinator hands every alert it emits to an [`AlertNotifier`] on a
//! detached task; delivery failures are logged and never affect the session.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::models::Alert;

pub mod error;
mod webhook;

pub use error::NotificationError;
pub use webhook::WebhookNotifier;

/// Delivers alerts to an external party.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait AlertNotifier: Send + Sync {
    /// Forwards a single alert.
    async fn notify(&self, alert: &Alert) -> Result<(), NotificationError>;
}
