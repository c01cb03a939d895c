//! Configuration specification types for the pipeline.
//!
//! These types map to the group configuration file and describe which values
//! files feed each render and where its output is committed.

use serde::{Deserialize, Serialize};

/// Branch used when a source or target omits one.
pub const DEFAULT_BRANCH: &str = "main";

/// Output filename used when a target omits one.
pub const DEFAULT_FILENAME: &str = "generated.yaml";

/// The root configuration structure: the full set of groups.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Configured groups, in file order.
    #[serde(default)]
    pub groups: Vec<ConfigGroup>,
}

/// A named pairing of values sources with one output target.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConfigGroup {
    /// Unique group name.
    pub name: String,
    /// Values files, later entries override earlier ones.
    #[serde(default, alias = "values_repos", alias = "valuesSources")]
    pub values_sources: Vec<ValuesSource>,
    /// Where the rendered output is written.
    #[serde(alias = "output_repo", alias = "outputTarget")]
    pub output_target: OutputTarget,
}

/// A values file inside a repository.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValuesSource {
    /// Repository owner.
    #[serde(default)]
    pub owner: String,
    /// Repository name.
    #[serde(default)]
    pub repo: String,
    /// Path of the values file relative to the repository root.
    #[serde(default)]
    pub path: String,
    /// Branch to read from.
    #[serde(default = "default_branch")]
    pub branch: String,
}

/// The destination of a group's rendered output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutputTarget {
    /// Repository owner.
    #[serde(default)]
    pub owner: String,
    /// Repository name.
    #[serde(default)]
    pub repo: String,
    /// Directory within the repository (empty for the root).
    #[serde(default)]
    pub path: String,
    /// Output filename.
    #[serde(default = "default_filename")]
    pub filename: String,
    /// Branch to commit to.
    #[serde(default = "default_branch")]
    pub branch: String,
}

fn default_branch() -> String {
    String::from(DEFAULT_BRANCH)
}

fn default_filename() -> String {
    String::from(DEFAULT_FILENAME)
}

impl PipelineConfig {
    /// Looks up a group by name.
    #[must_use]
    pub fn group(&self, name: &str) -> Option<&ConfigGroup> {
        self.groups.iter().find(|g| g.name == name)
    }

    /// Returns the configured group names in file order.
    #[must_use]
    pub fn group_names(&self) -> Vec<String> {
        self.groups.iter().map(|g| g.name.clone()).collect()
    }
}

impl ValuesSource {
    /// Returns `owner/repo`.
    #[must_use]
    pub fn repository(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

impl OutputTarget {
    /// Returns `owner/repo`.
    #[must_use]
    pub fn repository(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }

    /// Returns the target file path relative to the repository root.
    #[must_use]
    pub fn relative_file(&self) -> std::path::PathBuf {
        let dir = self.path.trim_matches('/');
        if dir.is_empty() {
            std::path::PathBuf::from(&self.filename)
        } else {
            std::path::Path::new(dir).join(&self.filename)
        }
    }
}
