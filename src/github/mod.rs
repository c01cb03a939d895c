//! GitHub REST API access.

mod client;
mod types;

pub use client::{GITHUB_API_URL, GitHubApi, GitHubClient};
pub use types::{Branch, User};
