//! Health check endpoint

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::state::SharedState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub model_loaded: bool,
    pub version: String,
    pub uptime_seconds: u64,
    pub started_at: String,
}

/// GET /api/health - 200 when the model is loaded, 503 otherwise
pub async fn health_check(State(state): State<SharedState>) -> (StatusCode, Json<HealthResponse>) {
    let model_loaded = state.model_loaded();
    let (code, status) = if model_loaded {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
    };

    (
        code,
        Json(HealthResponse {
            status: status.to_string(),
            model_loaded,
            version: saccharum_vision::VERSION.to_string(),
            uptime_seconds: state.uptime_seconds(),
            started_at: state.started_at_utc.to_rfc3339(),
        }),
    )
}
