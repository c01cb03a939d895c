//! HTTP request layer.
//!
//! JSON endpoints under `/api`, liveness and readiness probes, and the
//! static frontend.

mod handlers;
mod routes;
mod state;

pub use handlers::{ApiError, CommitRequest, HealthResponse, PreviewRequest, RunResponse};
pub use routes::build_router;
pub use state::AppState;
