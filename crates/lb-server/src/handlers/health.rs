//! Health endpoints.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Serialize;

use crate::state::AppState;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    connections: usize,
}

/// `GET /health`
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: if state.health.is_available() {
            "healthy"
        } else {
            "degraded"
        },
        version: env!("CARGO_PKG_VERSION"),
        connections: state.registry().connection_count(),
    })
}

/// `GET /health/live`
pub async fn liveness_check() -> StatusCode {
    StatusCode::OK
}

/// `GET /health/ready`
pub async fn readiness_check(State(state): State<AppState>) -> StatusCode {
    if state.stores_ready().await {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}
