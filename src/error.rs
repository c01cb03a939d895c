//! Error types for the Helm pipeline.
//!
//! This module provides the error hierarchy for every stage of a run:
//! configuration loading, repository checkout and push, chart rendering,
//! key extraction and diffing, and GitHub API access.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the Helm pipeline.
#[derive(Debug, Error)]
pub enum HelmPipelineError {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Pipeline stage errors.
    #[error("{0}")]
    Pipeline(#[from] PipelineError),

    /// Repository checkout, commit, or push errors.
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// GitHub API errors.
    #[error("GitHub API error: {0}")]
    GitHub(#[from] GitHubError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file was not found.
    #[error("Configuration file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The configuration could not be parsed.
    #[error("Failed to parse configuration: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location (file path or variable name).
        location: Option<String>,
    },

    /// Validation failed.
    #[error("Configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation error.
        message: String,
        /// Field that failed validation.
        field: Option<String>,
    },

    /// Environment variable is missing.
    #[error("Missing environment variable: {name}")]
    MissingEnvVar {
        /// Name of the missing variable.
        name: String,
    },

    /// Duplicate group definition.
    #[error("Duplicate group name: {name}")]
    DuplicateName {
        /// The duplicated name.
        name: String,
    },

    /// A compact `owner/repo:path[:branch]` source string is malformed.
    #[error("Invalid repository source '{spec}': {reason}")]
    InvalidSource {
        /// The offending source string.
        spec: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// Errors raised while running a group through the pipeline.
///
/// Messages carry the underlying cause (renderer stderr, parser message) but
/// never any content of the rendered document.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The requested group is not configured.
    #[error("Configuration group not found: {group}")]
    ConfigNotFound {
        /// Requested group name.
        group: String,
    },

    /// No groups are configured or selected.
    #[error("No configuration groups available")]
    NoGroups,

    /// The chart checkout is missing `Chart.yaml` or `templates/`.
    #[error("Chart not found: {marker} missing in {path}")]
    ChartNotFound {
        /// Chart directory that was inspected.
        path: PathBuf,
        /// The missing marker.
        marker: String,
    },

    /// No values file could be resolved for the group.
    #[error("No values files resolved for group {group}")]
    NoValues {
        /// Group name.
        group: String,
    },

    /// The external renderer failed.
    #[error("Failed to render chart: {message}")]
    Render {
        /// Renderer diagnostics.
        message: String,
    },

    /// A document is not valid YAML with a mapping at the top level.
    #[error("Failed to parse YAML: {message}")]
    Parse {
        /// Parser diagnostics.
        message: String,
    },

    /// The rendered output could not be written to the output checkout.
    #[error("Failed to write {path}: {message}")]
    Write {
        /// Destination file.
        path: PathBuf,
        /// Underlying IO error.
        message: String,
    },
}

/// Repository accessor errors.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The checkout directory could not be prepared.
    #[error("Failed to prepare workspace: {message}")]
    Workspace {
        /// Description of the failure.
        message: String,
    },

    /// The git binary could not be executed.
    #[error("Git is not available: {message}")]
    GitUnavailable {
        /// Description of the failure.
        message: String,
    },

    /// Clone of a repository branch failed.
    #[error("Failed to clone {repository} (branch {branch}): {message}")]
    CloneFailed {
        /// `owner/repo`.
        repository: String,
        /// Requested branch.
        branch: String,
        /// Git diagnostics with credentials redacted.
        message: String,
    },

    /// Staging or committing failed.
    #[error("Failed to commit changes in {repository}: {message}")]
    CommitFailed {
        /// `owner/repo`.
        repository: String,
        /// Git diagnostics with credentials redacted.
        message: String,
    },

    /// Pushing failed.
    #[error("Failed to push {repository} (branch {branch}): {message}")]
    PushFailed {
        /// `owner/repo`.
        repository: String,
        /// Target branch.
        branch: String,
        /// Git diagnostics with credentials redacted.
        message: String,
    },
}

/// GitHub API errors.
#[derive(Debug, Error)]
pub enum GitHubError {
    /// Authentication failed.
    #[error("GitHub authentication failed: {message}")]
    AuthenticationFailed {
        /// Description of the auth failure.
        message: String,
    },

    /// API request failed.
    #[error("GitHub API request failed: {status} - {message}")]
    ApiRequestFailed {
        /// HTTP status code.
        status: u16,
        /// Error message from API.
        message: String,
    },

    /// Network error.
    #[error("Network error communicating with GitHub: {message}")]
    NetworkError {
        /// Description of the network error.
        message: String,
    },

    /// Invalid response from API.
    #[error("Invalid response from GitHub API: {message}")]
    InvalidResponse {
        /// Description of the response issue.
        message: String,
    },
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, HelmPipelineError>;

impl HelmPipelineError {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Returns true if the error stems from the caller's input rather than
    /// from the environment.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::Pipeline(PipelineError::ConfigNotFound { .. }))
    }
}

impl ConfigError {
    /// Creates a validation error for a specific field.
    #[must_use]
    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Creates a validation error without a specific field.
    #[must_use]
    pub fn validation_general(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: None,
        }
    }

    /// Creates an invalid source error.
    #[must_use]
    pub fn invalid_source(spec: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidSource {
            spec: spec.into(),
            reason: reason.into(),
        }
    }
}

impl PipelineError {
    /// Creates a render error.
    #[must_use]
    pub fn render(message: impl Into<String>) -> Self {
        Self::Render {
            message: message.into(),
        }
    }

    /// Creates a parse error.
    #[must_use]
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }
}

impl GitHubError {
    /// Creates an API request error.
    #[must_use]
    pub fn api_error(status: u16, message: impl Into<String>) -> Self {
        Self::ApiRequestFailed {
            status,
            message: message.into(),
        }
    }

    /// Creates a network error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::NetworkError {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_error_display_is_unwrapped() {
        let err = HelmPipelineError::from(PipelineError::ConfigNotFound {
            group: String::from("prod"),
        });
        assert_eq!(err.to_string(), "Configuration group not found: prod");
        assert!(err.is_client_error());
    }

    #[test]
    fn test_render_error_keeps_diagnostics() {
        let err = HelmPipelineError::from(PipelineError::render("exit status 1, stderr: bad template"));
        assert!(err.to_string().contains("bad template"));
        assert!(!err.is_client_error());
    }
}
