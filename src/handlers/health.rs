use axum::{Json, extract::State, response::IntoResponse};
use std::sync::Arc;

use crate::state::AppState;

// health handler
pub async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "sampler_keys": state.sampler.key_count(),
        "sampler_intervals": state.sampler.intervals(),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}
