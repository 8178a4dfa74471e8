//! Shared application state.

use crate::auth::TokenValidator;
use std::sync::Arc;
use tubely_processing::IngestPipeline;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<IngestPipeline>,
    pub token_validator: Arc<dyn TokenValidator>,
}

impl AppState {
    pub fn new(pipeline: IngestPipeline, token_validator: Arc<dyn TokenValidator>) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            token_validator,
        }
    }
}
