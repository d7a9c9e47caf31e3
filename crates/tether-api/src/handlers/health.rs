//! Health check handler.

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};

use tether_realtime::metrics::MetricsSnapshot;

use crate::state::AppState;

/// Body of `GET /api/health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// Live connections right now
    pub connections: usize,
    pub metrics: MetricsSnapshot,
}

/// GET /api/health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        connections: state.engine.registry.len(),
        metrics: state.engine.metrics.snapshot(),
    })
}
