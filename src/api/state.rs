//! Shared request state.

use std::sync::Arc;

use crate::github::GitHubApi;
use crate::pipeline::Pipeline;

/// State shared by every handler.
///
/// Everything in here is read-only after startup.
#[derive(Clone)]
pub struct AppState {
    /// The pipeline orchestrator.
    pub pipeline: Arc<Pipeline>,
    /// GitHub access for the source repository.
    pub github: Arc<dyn GitHubApi>,
}

impl AppState {
    /// Creates the shared state.
    #[must_use]
    pub fn new(pipeline: Pipeline, github: Arc<dyn GitHubApi>) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            github,
        }
    }
}
