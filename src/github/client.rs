//! GitHub REST API client.
//!
//! Used for the branch picker and the health probe. Repository content goes
//! through git, not the REST API.

use async_trait::async_trait;
use reqwest::{Client, Response, header};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, trace, warn};

use crate::error::{GitHubError, HelmPipelineError, Result};

use super::types::{ApiErrorBody, Branch, User};

/// GitHub REST API base URL.
pub const GITHUB_API_URL: &str = "https://api.github.com";

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Page size for list endpoints.
const PER_PAGE: usize = 100;

/// Upper bound on pages fetched for one listing.
const MAX_PAGES: u32 = 50;

/// User agent sent with every request.
const USER_AGENT: &str = concat!("helm-pipeline/", env!("CARGO_PKG_VERSION"));

/// Read access to the chart source repository on GitHub.
#[async_trait]
pub trait GitHubApi: Send + Sync {
    /// Lists the branch names of the source repository.
    async fn list_branches(&self) -> Result<Vec<String>>;

    /// Returns true if the configured token is accepted.
    async fn is_authenticated(&self) -> bool;
}

/// GitHub REST client bound to one repository.
#[derive(Clone)]
pub struct GitHubClient {
    client: Client,
    token: String,
    base_url: String,
    owner: String,
    repo: String,
}

impl std::fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient")
            .field("base_url", &self.base_url)
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .finish_non_exhaustive()
    }
}

impl GitHubClient {
    /// Creates a client for `owner/repo`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(token: &str, owner: &str, repo: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| GitHubError::network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            token: token.to_string(),
            base_url: String::from(GITHUB_API_URL),
            owner: owner.to_string(),
            repo: repo.to_string(),
        })
    }

    /// Points the client at another API root.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Fetches the branch listing, following pages until a short page.
    ///
    /// # Errors
    ///
    /// Returns an error if any page request fails.
    pub async fn branches(&self) -> Result<Vec<Branch>> {
        let mut all = Vec::new();

        for page in 1..=MAX_PAGES {
            let url = format!(
                "{}/repos/{}/{}/branches?per_page={PER_PAGE}&page={page}",
                self.base_url, self.owner, self.repo
            );
            let batch: Vec<Branch> = self.get_json(&url).await?;
            let done = batch.len() < PER_PAGE;
            all.extend(batch);
            if done {
                break;
            }
        }

        debug!("Listed {} branches of {}/{}", all.len(), self.owner, self.repo);
        Ok(all)
    }

    /// Returns the user the token belongs to.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is rejected or the request fails.
    pub async fn current_user(&self) -> Result<User> {
        let url = format!("{}/user", self.base_url);
        self.get_json(&url).await
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        trace!("GET {url}");

        let response = self
            .client
            .get(url)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.token))
            .header(header::ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
            .send()
            .await
            .map_err(|e| GitHubError::network(format!("Request failed: {e}")))?;

        let response = Self::check_status(response).await?;

        response.json().await.map_err(|e| {
            HelmPipelineError::GitHub(GitHubError::InvalidResponse {
                message: format!("Failed to parse response: {e}"),
            })
        })
    }

    async fn check_status(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorBody>(&body)
            .map(|e| e.message)
            .unwrap_or(body);

        if status.as_u16() == 401 {
            return Err(GitHubError::AuthenticationFailed { message }.into());
        }

        Err(GitHubError::api_error(status.as_u16(), message).into())
    }
}

#[async_trait]
impl GitHubApi for GitHubClient {
    async fn list_branches(&self) -> Result<Vec<String>> {
        Ok(self.branches().await?.into_iter().map(|b| b.name).collect())
    }

    async fn is_authenticated(&self) -> bool {
        match self.current_user().await {
            Ok(user) => {
                debug!("Authenticated to GitHub as {}", user.login);
                true
            }
            Err(e) => {
                warn!("GitHub authentication check failed: {e}");
                false
            }
        }
    }
}
