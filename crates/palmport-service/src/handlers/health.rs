//! Health check handlers.

use std::sync::Arc;

use axum::extract::State;
use serde::Serialize;

use crate::extract::Json;
use crate::state::AppState;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Service name.
    pub service: String,
    /// Service version.
    pub version: String,
    /// Whether card payments are available.
    pub payments: bool,
}

/// Health check endpoint.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: "palmport".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        payments: state.has_payments(),
    })
}
