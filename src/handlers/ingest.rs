use axum::{body::Bytes, extract::State, http::StatusCode};
use std::sync::Arc;
use tracing::error;

use crate::metrics::{REQUEST_LATENCY, REQUEST_TOTAL};
use crate::state::AppState;

// Accepts newline-delimited JSON. Always answers 200 once the body is read;
// per-line problems only show up in the logs and metrics.
pub async fn ingest_handler(State(state): State<Arc<AppState>>, body: Bytes) -> StatusCode {
    REQUEST_TOTAL.inc();

    let ingester = state.ingester.clone();
    let result = tokio::task::spawn_blocking(move || ingester.ingest(&body, &mut rand::rng())).await;

    match result {
        Ok(summary) => REQUEST_LATENCY.observe(summary.elapsed.as_secs_f64()),
        Err(e) => error!(error = %e, "ingest task failed"),
    }
    StatusCode::OK
}
