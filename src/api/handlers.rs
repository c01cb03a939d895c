//! HTTP handlers.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use tracing::{error, info};

use crate::error::HelmPipelineError;
use crate::pipeline::{PipelineMode, PipelineResult};

use super::state::AppState;

/// A request-level failure rendered as `{"error": ...}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    /// Creates a 400 response.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<HelmPipelineError> for ApiError {
    fn from(err: HelmPipelineError) -> Self {
        let status = if err.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        error!("Request failed: {err}");
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

/// Body of `POST /api/preview`.
#[derive(Debug, Deserialize)]
pub struct PreviewRequest {
    /// Chart source branch.
    #[serde(default)]
    pub branch: String,
    /// Groups to run; empty means all.
    #[serde(default)]
    pub groups: Vec<String>,
}

/// Body of `POST /api/commit`.
#[derive(Debug, Deserialize)]
pub struct CommitRequest {
    /// Chart source branch.
    #[serde(default)]
    pub branch: String,
    /// Commit message.
    #[serde(default)]
    pub message: String,
    /// Groups to run; empty means all.
    #[serde(default)]
    pub groups: Vec<String>,
}

/// Response of the preview and commit endpoints.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResponse {
    /// Chart source branch.
    pub branch: String,
    /// When the run finished.
    pub generated_at: DateTime<Utc>,
    /// Per-group outcomes keyed by group name.
    pub results: BTreeMap<String, PipelineResult>,
}

/// Response of `GET /api/health`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Always `ok`; the booleans carry the detail.
    pub status: &'static str,
    /// Whether the GitHub token is accepted.
    pub github_authenticated: bool,
    /// Whether the renderer can be invoked.
    pub renderer_available: bool,
    /// `owner/repo` of the chart source.
    pub source_repository: String,
    /// Chart directory inside the source repository.
    pub chart_path: String,
    /// Number of configured groups.
    pub groups: usize,
}

/// `GET /api/branches`
pub async fn list_branches(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    let branches = state.github.list_branches().await?;
    Ok(Json(json!({ "branches": branches })))
}

/// `GET /api/groups`
pub async fn list_groups(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({ "groups": state.pipeline.config().group_names() }))
}

/// `POST /api/preview`
pub async fn preview(
    State(state): State<AppState>,
    payload: Result<Json<PreviewRequest>, JsonRejection>,
) -> Result<Json<RunResponse>, ApiError> {
    let Json(request) = payload?;
    let branch = required(request.branch, "Branch")?;

    info!("Preview requested for branch {branch}");
    let results = state
        .pipeline
        .run_many(&branch, &request.groups, &PipelineMode::Preview)
        .await?;

    Ok(Json(RunResponse {
        branch,
        generated_at: Utc::now(),
        results,
    }))
}

/// `POST /api/commit`
pub async fn commit(
    State(state): State<AppState>,
    payload: Result<Json<CommitRequest>, JsonRejection>,
) -> Result<Json<RunResponse>, ApiError> {
    let Json(request) = payload?;
    let branch = required(request.branch, "Branch")?;
    let message = required(request.message, "Message")?;

    info!("Commit requested for branch {branch}");
    let results = state
        .pipeline
        .run_many(&branch, &request.groups, &PipelineMode::Commit { message })
        .await?;

    Ok(Json(RunResponse {
        branch,
        generated_at: Utc::now(),
        results,
    }))
}

/// `GET /api/health`
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let (github_authenticated, renderer_available) = tokio::join!(
        state.github.is_authenticated(),
        state.pipeline.renderer().is_available()
    );
    let source = state.pipeline.source();

    Json(HealthResponse {
        status: "ok",
        github_authenticated,
        renderer_available,
        source_repository: source.full_name(),
        chart_path: source.chart_path.display().to_string(),
        groups: state.pipeline.config().groups.len(),
    })
}

/// `GET /healthz`
pub async fn liveness() -> &'static str {
    "OK"
}

/// `GET /healthz/ready`
pub async fn readiness(State(state): State<AppState>) -> (StatusCode, &'static str) {
    if !state.github.is_authenticated().await {
        return (StatusCode::SERVICE_UNAVAILABLE, "GitHub API not available");
    }
    if !state.pipeline.renderer().is_available().await {
        return (StatusCode::SERVICE_UNAVAILABLE, "Helm CLI not available");
    }
    (StatusCode::OK, "Ready")
}

fn required(value: String, field: &str) -> Result<String, ApiError> {
    if value.trim().is_empty() {
        Err(ApiError::bad_request(format!("{field} is required")))
    } else {
        Ok(value)
    }
}
