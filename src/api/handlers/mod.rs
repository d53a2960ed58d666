//! API request handlers.

/// Research submission, status and queue handlers.
pub mod research;

use crate::AppState;
use axum::{extract::State, Json};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    /// Providers with credentials configured
    pub providers: Vec<String>,
}

/// Liveness check, no authentication required
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        providers: state
            .providers
            .available()
            .into_iter()
            .map(|p| p.to_string())
            .collect(),
    })
}
