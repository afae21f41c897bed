//! The AI-derived summary and recommendations for a reading.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::reading::Reading;

/// Summary shown when the analysis collaborator failed.
pub const ANALYSIS_UNAVAILABLE_SUMMARY: &str = "AI analysis unavailable.";

/// Recommendation shown when the analysis collaborator failed.
pub const RECOMMENDATIONS_UNAVAILABLE: &str = "Recommendations unavailable.";

/// Whether an insight came from a successful analysis call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightStatus {
    /// Produced by the analysis collaborator.
    Fresh,
    /// Placeholder installed after a failed analysis attempt.
    Unavailable,
}

/// Output of the external analysis collaborator for a given reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedInsight {
    /// Health impact summary.
    pub summary: String,
    /// Suggested mitigation actions.
    pub recommendations: Vec<String>,
    /// The reading that was analyzed.
    pub reading: Reading,
    /// When the insight was produced.
    pub generated_at: DateTime<Utc>,
    /// Origin of the insight.
    pub status: InsightStatus,
}

impl DerivedInsight {
    /// Builds an insight from a successful analysis.
    pub fn fresh(summary: String, recommendations: Vec<String>, reading: Reading) -> Self {
        Self {
            summary,
            recommendations,
            reading,
            generated_at: Utc::now(),
            status: InsightStatus::Fresh,
        }
    }

    /// Builds the clearly-marked placeholder used after a failed analysis.
    pub fn unavailable(reading: Reading) -> Self {
        Self {
            summary: ANALYSIS_UNAVAILABLE_SUMMARY.to_string(),
            recommendations: vec![RECOMMENDATIONS_UNAVAILABLE.to_string()],
            reading,
            generated_at: Utc::now(),
            status: InsightStatus::Unavailable,
        }
    }
}
