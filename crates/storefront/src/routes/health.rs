//! Health check endpoints.

use axum::{extract::State, http::StatusCode};

use crate::state::AppState;

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
pub async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Reads the product catalog through its cache. Returns 503 Service
/// Unavailable if the backend cannot be reached.
pub async fn readiness(State(state): State<AppState>) -> (StatusCode, &'static str) {
    match state.catalog().products().await {
        Ok(_) => (StatusCode::OK, state.backend().name()),
        Err(e) => {
            tracing::warn!(backend = state.backend().name(), error = %e, "Readiness check failed");
            (StatusCode::SERVICE_UNAVAILABLE, state.backend().name())
        }
    }
}
