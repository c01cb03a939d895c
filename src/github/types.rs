//! GitHub REST payloads.

use serde::Deserialize;

/// A branch as returned by `GET /repos/{owner}/{repo}/branches`.
#[derive(Debug, Clone, Deserialize)]
pub struct Branch {
    /// Branch name.
    pub name: String,
    /// Whether the branch is protected.
    #[serde(default)]
    pub protected: bool,
}

/// The authenticated user as returned by `GET /user`.
#[derive(Debug, Clone, Deserialize)]
pub struct User {
    /// Login name.
    pub login: String,
}

/// Error body returned by the REST API.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorBody {
    pub message: String,
}
