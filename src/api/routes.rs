//! Router assembly.

use axum::Router;
use axum::body::Body;
use axum::http::Request;
use axum::routing::{get, post};
use std::path::Path;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info_span};
use uuid::Uuid;

use super::handlers;
use super::state::AppState;

/// Builds the application router.
///
/// Static files are served from `frontend_dir` when it exists; unknown
/// paths fall back to its `index.html`.
pub fn build_router(state: AppState, frontend_dir: Option<&Path>, timeout: Duration) -> Router {
    let api = Router::new()
        .route("/branches", get(handlers::list_branches))
        .route("/groups", get(handlers::list_groups))
        .route("/preview", post(handlers::preview))
        .route("/commit", post(handlers::commit))
        .route("/health", get(handlers::health));

    let mut router = Router::new()
        .nest("/api", api)
        .route("/healthz", get(handlers::liveness))
        .route("/healthz/ready", get(handlers::readiness));

    if let Some(dir) = frontend_dir.filter(|dir| dir.is_dir()) {
        debug!("Serving frontend from {}", dir.display());
        let index = ServeFile::new(dir.join("index.html"));
        router = router.fallback_service(ServeDir::new(dir).not_found_service(index));
    }

    router
        .with_state(state)
        .layer(TimeoutLayer::new(timeout))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                info_span!(
                    "request",
                    id = %Uuid::new_v4(),
                    method = %request.method(),
                    path = %request.uri().path(),
                )
            }),
        )
        .layer(CorsLayer::permissive())
}
