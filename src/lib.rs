//! Adaptive sampling gateway for newline-delimited JSON events.
//!
//! Records posted to the gateway are normalized, grouped by a sampling key
//! built from configured fields and sampled at a per-key rate that adapts to
//! each key's traffic. Kept records are forwarded to a collector together with
//! their sample rate.

pub mod config;
pub mod decision;
pub mod error;
pub mod handlers;
pub mod ingest;
pub mod key;
pub mod metrics;
pub mod models;
pub mod normalize;
pub mod record;
pub mod sampler;
pub mod sink;
pub mod state;
pub mod url_shape;
pub mod worker;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use std::sync::Arc;

use crate::state::AppState;

// ingest is accepted on any path, like a catch-all log endpoint
pub fn build_router(state: Arc<AppState>, max_body_size: usize) -> Router {
    Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/metrics", get(handlers::metrics_handler))
        .route("/", post(handlers::ingest_handler))
        .route("/{*path}", post(handlers::ingest_handler))
        .layer(DefaultBodyLimit::max(max_body_size))
        .with_state(state)
}
