//! In-memory collaborators for pipeline and API tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::TempDir;

use crate::error::{PipelineError, RepositoryError, Result};
use crate::git::{Checkout, RepositoryAccessor};
use crate::github::GitHubApi;
use crate::helm::Renderer;

type RepoKey = (String, String, String);
type Files = HashMap<PathBuf, Vec<u8>>;

/// A push recorded by [`FakeAccessor`].
#[derive(Debug, Clone)]
pub struct PushRecord {
    pub repository: String,
    pub branch: String,
    pub message: String,
}

/// Serves repositories from memory and records pushes.
///
/// Pushed working trees replace the stored files, so a later checkout sees
/// what was committed.
#[derive(Default)]
pub struct FakeAccessor {
    remotes: Mutex<HashMap<RepoKey, Files>>,
    pushes: Mutex<Vec<PushRecord>>,
}

impl FakeAccessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a file to `owner/repo` at `branch`.
    pub fn with_file(self, owner: &str, repo: &str, branch: &str, path: &str, content: &str) -> Self {
        self.remotes
            .lock()
            .expect("lock")
            .entry(key(owner, repo, branch))
            .or_default()
            .insert(PathBuf::from(path.trim_start_matches('/')), content.as_bytes().to_vec());
        self
    }

    /// Adds a minimal chart to `owner/repo` at `branch`.
    pub fn with_chart(self, owner: &str, repo: &str, branch: &str) -> Self {
        self.with_file(owner, repo, branch, "Chart.yaml", "name: app\n")
            .with_file(owner, repo, branch, "templates/config.yaml", "{{ .Values }}\n")
    }

    pub fn pushes(&self) -> Vec<PushRecord> {
        self.pushes.lock().expect("lock").clone()
    }

    pub fn file(&self, owner: &str, repo: &str, branch: &str, path: &str) -> Option<Vec<u8>> {
        self.remotes
            .lock()
            .expect("lock")
            .get(&key(owner, repo, branch))
            .and_then(|files| files.get(Path::new(path)).cloned())
    }
}

fn key(owner: &str, repo: &str, branch: &str) -> RepoKey {
    (owner.to_string(), repo.to_string(), branch.to_string())
}

fn snapshot(root: &Path, dir: &Path, files: &mut Files) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            snapshot(root, &path, files)?;
        } else if let Ok(relative) = path.strip_prefix(root) {
            files.insert(relative.to_path_buf(), std::fs::read(&path)?);
        }
    }
    Ok(())
}

#[async_trait]
impl RepositoryAccessor for FakeAccessor {
    async fn checkout(&self, owner: &str, repo: &str, branch: &str) -> Result<Checkout> {
        let files = self
            .remotes
            .lock()
            .expect("lock")
            .get(&key(owner, repo, branch))
            .cloned()
            .ok_or_else(|| RepositoryError::CloneFailed {
                repository: format!("{owner}/{repo}"),
                branch: branch.to_string(),
                message: String::from("remote branch not found"),
            })?;

        let dir = TempDir::new()?;
        for (path, content) in files {
            let target = dir.path().join(path);
            if let Some(parent) = target.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(target, content).await?;
        }
        Ok(Checkout::new(owner, repo, branch, dir))
    }

    async fn commit_and_push(&self, checkout: &Checkout, message: &str) -> Result<()> {
        let mut files = Files::new();
        snapshot(checkout.path(), checkout.path(), &mut files)?;
        self.remotes
            .lock()
            .expect("lock")
            .insert(key(checkout.owner(), checkout.repo(), checkout.branch()), files);
        self.pushes.lock().expect("lock").push(PushRecord {
            repository: checkout.repository(),
            branch: checkout.branch().to_string(),
            message: message.to_string(),
        });
        Ok(())
    }
}

/// Renders by returning the content of the last values file.
#[derive(Default)]
pub struct FakeRenderer {
    pub available: bool,
    pub fail_with: Option<String>,
    calls: Mutex<Vec<Vec<String>>>,
}

impl FakeRenderer {
    pub fn new() -> Self {
        Self {
            available: true,
            ..Self::default()
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            available: true,
            fail_with: Some(message.to_string()),
            ..Self::default()
        }
    }

    /// File names of the values passed to each render call.
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().expect("lock").clone()
    }
}

#[async_trait]
impl Renderer for FakeRenderer {
    async fn render(&self, chart: &Path, values: &[PathBuf]) -> Result<Vec<u8>> {
        assert!(chart.join("Chart.yaml").exists());
        self.calls.lock().expect("lock").push(
            values
                .iter()
                .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
                .collect(),
        );

        if let Some(message) = &self.fail_with {
            return Err(PipelineError::render(message.clone()).into());
        }
        let last = values
            .last()
            .ok_or_else(|| PipelineError::render("no values"))?;
        Ok(std::fs::read(last)?)
    }

    async fn is_available(&self) -> bool {
        self.available
    }
}

/// Static branch listing.
pub struct FakeGitHub {
    pub branches: Vec<String>,
    pub authenticated: bool,
}

#[async_trait]
impl GitHubApi for FakeGitHub {
    async fn list_branches(&self) -> Result<Vec<String>> {
        if self.authenticated {
            Ok(self.branches.clone())
        } else {
            Err(crate::error::GitHubError::AuthenticationFailed {
                message: String::from("Bad credentials"),
            }
            .into())
        }
    }

    async fn is_authenticated(&self) -> bool {
        self.authenticated
    }
}
