use std::sync::Arc;

use crate::ingest::Ingester;
use crate::sampler::EmaSampler;

// app's shared state
pub struct AppState {
    pub ingester: Arc<Ingester>, // shared with the blocking ingest tasks
    pub sampler: Arc<EmaSampler>,
}

impl AppState {
    pub fn new(ingester: Ingester) -> Self {
        let sampler = ingester.sampler().clone();
        Self {
            ingester: Arc::new(ingester),
            sampler,
        }
    }
}
