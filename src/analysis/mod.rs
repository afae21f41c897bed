//! Client seam for the external analysis collaborator that turns a reading
//! into a derived insight.

mod http;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use thiserror::Error;

pub use http::HttpAnalysisClient;

use crate::models::{DerivedInsight, Reading};

/// Errors that can occur when requesting an analysis.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The request could not be sent or the connection failed.
    #[error("Failed to communicate with analysis service: {0}")]
    Transport(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("Analysis service returned status {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Error message returned by the service, if any.
        message: String,
    },

    /// The service answered with an unusable body.
    #[error("Invalid analysis response: {0}")]
    InvalidResponse(String),

    /// The collaborator rejected the request for another reason.
    #[error("Analysis rejected: {0}")]
    Rejected(String),
}

/// The external analysis collaborator.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait AnalysisClient: Send + Sync {
    /// Produces a derived insight for `reading`. Latency is unbounded from the
    /// caller's point of view and the call may fail.
    async fn analyze(&self, reading: &Reading) -> Result<DerivedInsight, AnalysisError>;
}

/// Stands in for the analysis service when none is configured. Every call
/// fails, so sessions show the "analysis unavailable" placeholder.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledAnalysisClient;

#[async_trait]
impl AnalysisClient for DisabledAnalysisClient {
    async fn analyze(&self, _reading: &Reading) -> Result<DerivedInsight, AnalysisError> {
        Err(AnalysisError::Rejected("no analysis service configured".to_string()))
    }
}
