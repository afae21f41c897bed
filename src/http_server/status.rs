//! The `/health` endpoint.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Serialize;

use super::ApiState;
use crate::models::SessionPhase;

/// Represents the response from the `/health` endpoint.
#[derive(Debug, Serialize, Clone)]
pub struct HealthResponse {
    /// Always `"ok"` when the server answers.
    pub status: &'static str,
    /// The version of the application.
    pub version: &'static str,
    /// Current phase of the session.
    pub phase: SessionPhase,
}

/// Reports liveness and the session phase.
pub async fn health(State(state): State<ApiState>) -> impl IntoResponse {
    let response = HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        phase: state.coordinator.snapshot().phase,
    };
    (StatusCode::OK, Json(response))
}
