//! Defines the custom `ApiError` type for the HTTP server.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::json;

use crate::models::UnknownPollutant;

/// A custom error type for the API that can be converted into an HTTP response.
#[derive(Debug)]
pub enum ApiError {
    /// Represents a resource that could not be found.
    NotFound(String),

    /// Represents a validation error for an unprocessable entity.
    UnprocessableEntity(String),

    /// The session coordinator is no longer running.
    ServiceUnavailable,
}

impl From<UnknownPollutant> for ApiError {
    fn from(err: UnknownPollutant) -> Self {
        ApiError::UnprocessableEntity(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, body) = match self {
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, json!({ "error": message })),
            ApiError::UnprocessableEntity(message) => {
                (StatusCode::UNPROCESSABLE_ENTITY, json!({ "error": message }))
            }
            ApiError::ServiceUnavailable => {
                tracing::warn!("Request received while the coordinator is not running.");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    json!({ "error": "The session is not running" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
