//! Liveness endpoint.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always `ok` while the process serves requests.
    pub status: &'static str,
    /// Service name.
    pub service: &'static str,
    /// Crate version.
    pub version: &'static str,
    /// Which store backs the service: `postgres` or `memory`.
    pub storage: &'static str,
}

/// GET /api/v1/health
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let storage = if state.config.database_url.is_some() {
        "postgres"
    } else {
        "memory"
    };

    Json(HealthResponse {
        status: "ok",
        service: "ridesapp",
        version: env!("CARGO_PKG_VERSION"),
        storage,
    })
}
