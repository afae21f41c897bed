//! HTTP server module
//!
//! A small REST surface over a [`CoordinatorHandle`]: the read-only session
//! snapshot plus the two user actions (dismiss an alert, change a threshold).

mod error;
mod session;
mod status;

use std::net::SocketAddr;

use axum::{
    Router,
    routing::{delete, get, put},
};
pub use error::ApiError;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::coordinator::CoordinatorHandle;

/// Shared state of all handlers.
#[derive(Clone)]
pub struct ApiState {
    /// The session served by this API.
    pub coordinator: CoordinatorHandle,
}

/// Builds the API router.
pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(status::health))
        .route("/state", get(session::get_state))
        .route("/thresholds", get(session::get_thresholds))
        .route("/thresholds/{pollutant}", put(session::put_threshold))
        .route("/alerts/{id}", delete(session::delete_alert))
        .with_state(state)
}

/// Serves the API on `listener` until `cancellation_token` is cancelled.
pub async fn serve(
    listener: TcpListener,
    state: ApiState,
    cancellation_token: CancellationToken,
) -> std::io::Result<()> {
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { cancellation_token.cancelled().await })
        .await
}

/// Binds `listen_address` and serves the API until cancelled.
pub async fn run_server(
    listen_address: &str,
    coordinator: CoordinatorHandle,
    cancellation_token: CancellationToken,
) -> std::io::Result<()> {
    let addr: SocketAddr = listen_address
        .parse()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(listen_address = %addr, "HTTP server listening.");
    serve(listener, ApiState { coordinator }, cancellation_token).await
}
