//! Runtime settings assembled once at startup.
//!
//! Everything the services need from the process environment is captured
//! here and passed down explicitly.

use std::fmt;
use std::path::PathBuf;

/// Default HTTP bind host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 4000;

/// Default request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

/// Default commit author name.
pub const DEFAULT_AUTHOR_NAME: &str = "Helm Pipeline";

/// Default commit author email.
pub const DEFAULT_AUTHOR_EMAIL: &str = "helm-pipeline@example.com";

/// The repository holding the Helm chart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRepository {
    /// Repository owner.
    pub owner: String,
    /// Repository name.
    pub repo: String,
    /// Chart directory relative to the repository root.
    pub chart_path: PathBuf,
}

impl SourceRepository {
    /// Creates a source repository whose chart lives at the repository root.
    #[must_use]
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            chart_path: PathBuf::from("."),
        }
    }

    /// Sets the chart directory.
    #[must_use]
    pub fn with_chart_path(mut self, chart_path: impl Into<PathBuf>) -> Self {
        self.chart_path = chart_path.into();
        self
    }

    /// Returns `owner/repo`.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

/// Process-wide runtime settings.
#[derive(Clone)]
pub struct Settings {
    /// GitHub access token, used for the REST API and git over HTTPS.
    pub github_token: String,
    /// The chart source repository.
    pub source: SourceRepository,
    /// HTTP bind host.
    pub host: String,
    /// HTTP bind port.
    pub port: u16,
    /// Root directory for per-request checkouts.
    pub work_dir: PathBuf,
    /// Helm executable.
    pub helm_bin: PathBuf,
    /// Git executable.
    pub git_bin: PathBuf,
    /// Static frontend directory.
    pub frontend_dir: PathBuf,
    /// Request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Commit author name.
    pub author_name: String,
    /// Commit author email.
    pub author_email: String,
}

impl Settings {
    /// Creates settings with defaults for everything but the credentials and
    /// source repository.
    #[must_use]
    pub fn new(github_token: impl Into<String>, source: SourceRepository) -> Self {
        Self {
            github_token: github_token.into(),
            source,
            host: String::from(DEFAULT_HOST),
            port: DEFAULT_PORT,
            work_dir: std::env::temp_dir(),
            helm_bin: PathBuf::from("helm"),
            git_bin: PathBuf::from("git"),
            frontend_dir: PathBuf::from("frontend/dist"),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            author_name: String::from(DEFAULT_AUTHOR_NAME),
            author_email: String::from(DEFAULT_AUTHOR_EMAIL),
        }
    }

    /// Returns the `host:port` bind address.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("github_token", &"<redacted>")
            .field("source", &self.source)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("work_dir", &self.work_dir)
            .field("helm_bin", &self.helm_bin)
            .field("git_bin", &self.git_bin)
            .field("frontend_dir", &self.frontend_dir)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("author_name", &self.author_name)
            .field("author_email", &self.author_email)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_token() {
        let settings = Settings::new("ghp_supersecret", SourceRepository::new("acme", "chart"));
        let debug = format!("{settings:?}");
        assert!(!debug.contains("ghp_supersecret"));
        assert!(debug.contains("<redacted>"));
        assert_eq!(settings.bind_address(), "0.0.0.0:4000");
    }
}
