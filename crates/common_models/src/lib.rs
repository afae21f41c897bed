//! Common data models for communication between breatheasy and the external
//! analysis service.

use serde::{Deserialize, Serialize};

/// Pollutant concentrations sent to the analysis service, in canonical units.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    /// Carbon monoxide in ppm.
    pub co: f64,
    /// Volatile organic compounds in ppb.
    pub vocs: f64,
    /// Methane / LPG in ppm.
    pub ch4_lpg: f64,
    /// PM1.0 in µg/m³.
    #[serde(rename = "pm1_0")]
    pub pm1_0: f64,
    /// PM2.5 in µg/m³.
    #[serde(rename = "pm2_5")]
    pub pm2_5: f64,
    /// PM10 in µg/m³.
    #[serde(rename = "pm10_0")]
    pub pm10_0: f64,
}

/// Request payload of the `/recommendations` endpoint. Identical to
/// [`AnalysisRequest`] except that PM10 is sent as `pm10`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationsRequest {
    /// Carbon monoxide in ppm.
    pub co: f64,
    /// Volatile organic compounds in ppb.
    pub vocs: f64,
    /// Methane / LPG in ppm.
    pub ch4_lpg: f64,
    /// PM1.0 in µg/m³.
    #[serde(rename = "pm1_0")]
    pub pm1_0: f64,
    /// PM2.5 in µg/m³.
    #[serde(rename = "pm2_5")]
    pub pm2_5: f64,
    /// PM10 in µg/m³.
    pub pm10: f64,
}

impl From<AnalysisRequest> for RecommendationsRequest {
    fn from(request: AnalysisRequest) -> Self {
        Self {
            co: request.co,
            vocs: request.vocs,
            ch4_lpg: request.ch4_lpg,
            pm1_0: request.pm1_0,
            pm2_5: request.pm2_5,
            pm10: request.pm10_0,
        }
    }
}

/// Response payload of the `/analysis` endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AnalysisResponse {
    /// Summary of the potential health impacts of the reading.
    pub summary: String,
}

/// Response payload of the `/recommendations` endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RecommendationsResponse {
    /// Actions the user can take to mitigate exposure.
    pub recommendations: Vec<String>,
}

/// Response payload for an error returned by the analysis service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable error message.
    pub error: String,
}
