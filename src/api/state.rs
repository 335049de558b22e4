//! Application state for the API server

use crate::{Config, SegmentPipeline};
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// This struct is cloned for each request (cheap Arc clone) and provides
/// access to the pipeline and configuration.
#[derive(Clone)]
pub struct AppState {
    /// The acquisition pipeline
    pub pipeline: Arc<SegmentPipeline>,

    /// Configuration (read-only)
    pub config: Arc<Config>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(pipeline: Arc<SegmentPipeline>, config: Arc<Config>) -> Self {
        Self { pipeline, config }
    }
}
