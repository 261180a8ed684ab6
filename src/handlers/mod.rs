mod health;
mod ingest;
mod metrics;

pub use health::health_handler;
pub use ingest::ingest_handler;
pub use metrics::metrics_handler;
