//! Handlers exposing the session state surface.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use serde_json::json;

use super::{ApiError, ApiState};
use crate::{
    coordinator::{CoordinatorStopped, ThresholdSaveError},
    models::Pollutant,
};

/// Body of `PUT /thresholds/{pollutant}`. A `null` value clears the limit.
#[derive(Debug, Deserialize)]
pub struct ThresholdUpdate {
    /// The new limit.
    pub value: Option<f64>,
}

/// Returns the full session snapshot.
pub async fn get_state(State(state): State<ApiState>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.coordinator.snapshot()))
}

/// Returns the thresholds currently in effect.
pub async fn get_thresholds(State(state): State<ApiState>) -> impl IntoResponse {
    let thresholds = state.coordinator.snapshot().thresholds;
    (StatusCode::OK, Json(json!({ "thresholds": thresholds })))
}

/// Sets or clears one threshold.
///
/// The change always takes effect in memory; `persisted` reports whether it
/// was also saved.
pub async fn put_threshold(
    State(state): State<ApiState>,
    Path(pollutant): Path<String>,
    Json(update): Json<ThresholdUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    let pollutant: Pollutant = pollutant.parse()?;
    if let Some(value) = update.value {
        if !value.is_finite() || value < 0.0 {
            return Err(ApiError::UnprocessableEntity(
                "threshold must be a non-negative number".to_string(),
            ));
        }
    }

    match state.coordinator.set_threshold(pollutant, update.value).await {
        Ok(()) => Ok((StatusCode::OK, Json(json!({ "pollutant": pollutant, "persisted": true })))),
        Err(ThresholdSaveError::Persistence(e)) => Ok((
            StatusCode::OK,
            Json(json!({ "pollutant": pollutant, "persisted": false, "warning": e.to_string() })),
        )),
        Err(ThresholdSaveError::CoordinatorUnavailable) => Err(ApiError::ServiceUnavailable),
    }
}

/// Dismisses an alert.
pub async fn delete_alert(
    State(state): State<ApiState>,
    Path(alert_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    match state.coordinator.dismiss_alert(alert_id.clone()).await {
        Ok(true) => Ok(StatusCode::NO_CONTENT),
        Ok(false) => Err(ApiError::NotFound(format!("Alert '{alert_id}' not found"))),
        Err(CoordinatorStopped) => Err(ApiError::ServiceUnavailable),
    }
}
