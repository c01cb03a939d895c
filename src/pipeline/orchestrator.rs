//! Render, inspect, and optionally persist configuration groups.
//!
//! A run is strictly sequential: groups are processed one after another and
//! every checkout is private to the run that created it.

use std::collections::{BTreeMap, HashSet};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::{ConfigGroup, PipelineConfig, SourceRepository};
use crate::error::{PipelineError, Result};
use crate::extractor::{compare_yaml, extract_keys};
use crate::git::{Checkout, RepositoryAccessor};
use crate::helm::Renderer;

use super::result::{PipelineMode, PipelineResult};

/// File that marks a chart directory.
const CHART_DESCRIPTOR: &str = "Chart.yaml";

/// Directory holding chart templates.
const TEMPLATES_DIR: &str = "templates";

/// Pipeline orchestrator.
#[derive(Clone)]
pub struct Pipeline {
    /// Loaded group configuration.
    config: Arc<PipelineConfig>,
    /// Chart source repository.
    source: SourceRepository,
    /// Repository access.
    accessor: Arc<dyn RepositoryAccessor>,
    /// Chart renderer.
    renderer: Arc<dyn Renderer>,
}

impl Pipeline {
    /// Creates a new pipeline.
    #[must_use]
    pub fn new(
        config: Arc<PipelineConfig>,
        source: SourceRepository,
        accessor: Arc<dyn RepositoryAccessor>,
        renderer: Arc<dyn Renderer>,
    ) -> Self {
        Self {
            config,
            source,
            accessor,
            renderer,
        }
    }

    /// Returns the loaded configuration.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Returns the chart source repository.
    #[must_use]
    pub const fn source(&self) -> &SourceRepository {
        &self.source
    }

    /// Returns the renderer.
    #[must_use]
    pub fn renderer(&self) -> &dyn Renderer {
        self.renderer.as_ref()
    }

    /// Runs one group against `branch` of the chart source.
    ///
    /// # Errors
    ///
    /// Returns an error if the group is unknown or any stage fails.
    pub async fn run_group(
        &self,
        branch: &str,
        group_name: &str,
        mode: &PipelineMode,
    ) -> Result<PipelineResult> {
        let group = self
            .config
            .group(group_name)
            .ok_or_else(|| PipelineError::ConfigNotFound {
                group: group_name.to_string(),
            })?;

        info!("Running {} for group {} on branch {branch}", mode.name(), group.name);

        let chart_checkout = self
            .accessor
            .checkout(&self.source.owner, &self.source.repo, branch)
            .await?;
        let chart_dir = self.locate_chart(&chart_checkout).await?;

        let (_values_checkouts, values_files) = self.fetch_values(group).await?;
        if values_files.is_empty() {
            return Err(PipelineError::NoValues {
                group: group.name.clone(),
            }
            .into());
        }

        let rendered = self.renderer.render(&chart_dir, &values_files).await?;
        debug!("Rendered {} bytes for group {}", rendered.len(), group.name);

        let target = &group.output_target;
        let output_checkout = self
            .accessor
            .checkout(&target.owner, &target.repo, &target.branch)
            .await?;
        let output_file = output_checkout.path().join(target.relative_file());
        let existing = read_existing(&output_file).await?;

        match mode {
            PipelineMode::Preview => Ok(match existing {
                None => PipelineResult::new_file(extract_keys(&rendered)?),
                Some(existing) => PipelineResult::Changes {
                    diff: compare_yaml(&existing, &rendered)?,
                },
            }),
            PipelineMode::Commit { message } => {
                let content_changed = existing.as_deref() != Some(rendered.as_slice());
                write_output(&output_file, &rendered).await?;

                let message = self.annotate(message, branch, group);
                self.accessor
                    .commit_and_push(&output_checkout, &message)
                    .await?;

                info!(
                    "Committed group {} to {} (content changed: {content_changed})",
                    group.name,
                    target.repository()
                );
                Ok(PipelineResult::committed(content_changed))
            }
        }
    }

    /// Runs each requested group in turn; an empty request means every
    /// configured group.
    ///
    /// Per-group failures are captured as [`PipelineResult::Failed`]. Names
    /// are de-duplicated and results come back sorted by group name.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::NoGroups`] if there is nothing to run.
    pub async fn run_many(
        &self,
        branch: &str,
        group_names: &[String],
        mode: &PipelineMode,
    ) -> Result<BTreeMap<String, PipelineResult>> {
        let names = if group_names.is_empty() {
            self.config.group_names()
        } else {
            let mut seen = HashSet::new();
            group_names
                .iter()
                .filter(|name| seen.insert(name.as_str()))
                .cloned()
                .collect()
        };

        if names.is_empty() {
            return Err(PipelineError::NoGroups.into());
        }

        let mut results = BTreeMap::new();
        for name in names {
            let result = match self.run_group(branch, &name, mode).await {
                Ok(result) => result,
                Err(e) => {
                    warn!("Group {name} failed: {e}");
                    PipelineResult::Failed {
                        error: e.to_string(),
                    }
                }
            };
            results.insert(name, result);
        }

        Ok(results)
    }

    async fn locate_chart(&self, checkout: &Checkout) -> Result<PathBuf> {
        let chart_dir = checkout.path().join(&self.source.chart_path);

        for (marker, is_dir) in [(CHART_DESCRIPTOR, false), (TEMPLATES_DIR, true)] {
            let present = tokio::fs::metadata(chart_dir.join(marker))
                .await
                .is_ok_and(|meta| if is_dir { meta.is_dir() } else { meta.is_file() });
            if !present {
                return Err(PipelineError::ChartNotFound {
                    path: self.source.chart_path.clone(),
                    marker: marker.to_string(),
                }
                .into());
            }
        }

        Ok(chart_dir)
    }

    /// Checks out every values source in order. The checkouts are returned
    /// so the files outlive the render.
    async fn fetch_values(&self, group: &ConfigGroup) -> Result<(Vec<Checkout>, Vec<PathBuf>)> {
        let mut checkouts = Vec::with_capacity(group.values_sources.len());
        let mut files = Vec::with_capacity(group.values_sources.len());

        for source in &group.values_sources {
            let checkout = self
                .accessor
                .checkout(&source.owner, &source.repo, &source.branch)
                .await?;
            let file = checkout.path().join(source.path.trim_start_matches('/'));
            debug!("Values file {} from {}", source.path, source.repository());
            files.push(file);
            checkouts.push(checkout);
        }

        Ok((checkouts, files))
    }

    fn annotate(&self, message: &str, branch: &str, group: &ConfigGroup) -> String {
        let target = &group.output_target;
        if target.owner == self.source.owner && target.repo == self.source.repo {
            return message.to_string();
        }
        format!(
            "{message} (generated from {} branch: {branch}, group: {})",
            self.source.full_name(),
            group.name
        )
    }
}

async fn read_existing(path: &Path) -> Result<Option<Vec<u8>>> {
    match tokio::fs::read(path).await {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

async fn write_output(path: &Path, content: &[u8]) -> Result<()> {
    let write_error = |e: std::io::Error| PipelineError::Write {
        path: path.to_path_buf(),
        message: e.to_string(),
    };

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(write_error)?;
    }
    tokio::fs::write(path, content).await.map_err(write_error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DEFAULT_BRANCH, OutputTarget, ValuesSource};
    use crate::extractor::ChangeKind;
    use crate::pipeline::result::{COMMITTED_MESSAGE, UNCHANGED_MESSAGE};
    use crate::pipeline::testing::{FakeAccessor, FakeRenderer};
    use serde_json::json;

    const RENDERED: &str = "db:\n  password: \"x\"\n  host: \"h\"\n";

    fn values(owner: &str, repo: &str, path: &str) -> ValuesSource {
        ValuesSource {
            owner: owner.to_string(),
            repo: repo.to_string(),
            path: path.to_string(),
            branch: String::from(DEFAULT_BRANCH),
        }
    }

    fn output(owner: &str, repo: &str) -> OutputTarget {
        OutputTarget {
            owner: owner.to_string(),
            repo: repo.to_string(),
            path: String::from("deploy/prod"),
            filename: String::from("generated.yaml"),
            branch: String::from(DEFAULT_BRANCH),
        }
    }

    fn group(name: &str, values_sources: Vec<ValuesSource>) -> ConfigGroup {
        ConfigGroup {
            name: name.to_string(),
            values_sources,
            output_target: output("acme", "manifests"),
        }
    }

    fn accessor() -> FakeAccessor {
        FakeAccessor::new()
            .with_chart("acme", "chart", "main")
            .with_file("acme", "values", "main", "prod/values.yaml", RENDERED)
            .with_file("acme", "manifests", "main", "README.md", "manifests\n")
    }

    fn pipeline(groups: Vec<ConfigGroup>, accessor: Arc<FakeAccessor>, renderer: Arc<FakeRenderer>) -> Pipeline {
        Pipeline::new(
            Arc::new(PipelineConfig { groups }),
            SourceRepository::new("acme", "chart"),
            accessor,
            renderer,
        )
    }

    #[tokio::test]
    async fn test_preview_new_file_then_commit_unchanged() {
        let accessor = Arc::new(accessor());
        let p = pipeline(
            vec![group("prod", vec![values("acme", "values", "prod/values.yaml")])],
            Arc::clone(&accessor),
            Arc::new(FakeRenderer::new()),
        );

        let preview = p.run_group("main", "prod", &PipelineMode::Preview).await.expect("preview");
        assert_eq!(
            serde_json::to_value(&preview).expect("serializable"),
            json!({ "allNew": true, "keys": { "db": { "password": "...", "host": "..." } } })
        );
        assert!(accessor.pushes().is_empty());

        let commit = PipelineMode::Commit {
            message: String::from("Update prod"),
        };
        let first = p.run_group("main", "prod", &commit).await.expect("commit");
        assert!(matches!(
            first,
            PipelineResult::Committed { content_changed: true, ref message } if message == COMMITTED_MESSAGE
        ));
        assert_eq!(
            accessor.file("acme", "manifests", "main", "deploy/prod/generated.yaml"),
            Some(RENDERED.as_bytes().to_vec())
        );

        let second = p.run_group("main", "prod", &commit).await.expect("commit");
        assert!(matches!(
            second,
            PipelineResult::Committed { content_changed: false, ref message } if message == UNCHANGED_MESSAGE
        ));

        // Unchanged content is still pushed.
        let pushes = accessor.pushes();
        assert_eq!(pushes.len(), 2);
        assert_eq!(pushes[1].repository, "acme/manifests");
        assert_eq!(pushes[1].branch, "main");
        assert_eq!(
            pushes[1].message,
            "Update prod (generated from acme/chart branch: main, group: prod)"
        );
    }

    #[tokio::test]
    async fn test_preview_diff_against_existing() {
        let accessor = Arc::new(accessor().with_file(
            "acme",
            "manifests",
            "main",
            "deploy/prod/generated.yaml",
            "db:\n  password: \"old\"\n  host: \"h\"\nlegacy: 1\n",
        ));
        let p = pipeline(
            vec![group("prod", vec![values("acme", "values", "prod/values.yaml")])],
            accessor,
            Arc::new(FakeRenderer::new()),
        );

        let result = p.run_group("main", "prod", &PipelineMode::Preview).await.expect("preview");
        let PipelineResult::Changes { diff } = result else {
            panic!("expected a diff");
        };
        assert_eq!(diff.len(), 2);
        assert_eq!(diff.get("db.password"), Some(ChangeKind::Changed));
        assert_eq!(diff.get("legacy"), Some(ChangeKind::Removed));
    }

    #[tokio::test]
    async fn test_values_files_keep_order() {
        let accessor = Arc::new(
            accessor()
                .with_file("acme", "base", "main", "/common/base.yaml", "a: 1\n")
                .with_file("acme", "values", "main", "prod/override.yaml", "a: 2\n"),
        );
        let renderer = Arc::new(FakeRenderer::new());
        let p = pipeline(
            vec![group(
                "prod",
                vec![
                    values("acme", "base", "/common/base.yaml"),
                    values("acme", "values", "prod/values.yaml"),
                    values("acme", "values", "prod/override.yaml"),
                ],
            )],
            accessor,
            Arc::clone(&renderer),
        );

        p.run_group("main", "prod", &PipelineMode::Preview).await.expect("preview");
        assert_eq!(
            renderer.calls(),
            vec![vec!["base.yaml", "values.yaml", "override.yaml"]]
        );
    }

    #[tokio::test]
    async fn test_unknown_group() {
        let p = pipeline(vec![], Arc::new(accessor()), Arc::new(FakeRenderer::new()));
        let err = p.run_group("main", "ghost", &PipelineMode::Preview).await.unwrap_err();
        assert_eq!(err.to_string(), "Configuration group not found: ghost");
    }

    #[tokio::test]
    async fn test_missing_chart_markers() {
        let accessor = Arc::new(
            FakeAccessor::new()
                .with_file("acme", "chart", "main", "Chart.yaml", "name: app\n")
                .with_file("acme", "values", "main", "prod/values.yaml", RENDERED),
        );
        let p = pipeline(
            vec![group("prod", vec![values("acme", "values", "prod/values.yaml")])],
            accessor,
            Arc::new(FakeRenderer::new()),
        );

        let err = p.run_group("main", "prod", &PipelineMode::Preview).await.unwrap_err();
        assert!(matches!(
            err,
            crate::error::HelmPipelineError::Pipeline(PipelineError::ChartNotFound { ref marker, .. })
                if marker == "templates"
        ));
    }

    #[tokio::test]
    async fn test_chart_descriptor_must_be_a_file() {
        let accessor = Arc::new(
            FakeAccessor::new()
                .with_file("acme", "chart", "main", "Chart.yaml/nested.yaml", "x: 1\n")
                .with_file("acme", "chart", "main", "templates/config.yaml", "x: 1\n")
                .with_file("acme", "values", "main", "prod/values.yaml", RENDERED),
        );
        let p = pipeline(
            vec![group("prod", vec![values("acme", "values", "prod/values.yaml")])],
            accessor,
            Arc::new(FakeRenderer::new()),
        );

        let err = p.run_group("main", "prod", &PipelineMode::Preview).await.unwrap_err();
        assert!(matches!(
            err,
            crate::error::HelmPipelineError::Pipeline(PipelineError::ChartNotFound { ref marker, .. })
                if marker == "Chart.yaml"
        ));
    }

    #[tokio::test]
    async fn test_no_values() {
        let p = pipeline(
            vec![group("prod", vec![])],
            Arc::new(accessor()),
            Arc::new(FakeRenderer::new()),
        );
        let err = p.run_group("main", "prod", &PipelineMode::Preview).await.unwrap_err();
        assert!(matches!(
            err,
            crate::error::HelmPipelineError::Pipeline(PipelineError::NoValues { .. })
        ));
    }

    #[tokio::test]
    async fn test_render_error_keeps_diagnostics() {
        let p = pipeline(
            vec![group("prod", vec![values("acme", "values", "prod/values.yaml")])],
            Arc::new(accessor()),
            Arc::new(FakeRenderer::failing("parse error in templates/config.yaml")),
        );
        let results = p
            .run_many("main", &[], &PipelineMode::Preview)
            .await
            .expect("run");
        let error = results["prod"].error().expect("failed");
        assert!(error.contains("parse error in templates/config.yaml"));
    }

    #[tokio::test]
    async fn test_run_many_isolates_group_failures() {
        let p = pipeline(
            vec![
                group("g1", vec![values("acme", "values", "prod/values.yaml")]),
                group("g2", vec![values("acme", "unreachable", "values.yaml")]),
            ],
            Arc::new(accessor()),
            Arc::new(FakeRenderer::new()),
        );

        let results = p
            .run_many(
                "main",
                &[String::from("g1"), String::from("g2")],
                &PipelineMode::Preview,
            )
            .await
            .expect("run");

        assert!(!results["g1"].is_failed());
        assert!(results["g2"].error().is_some_and(|e| e.contains("acme/unreachable")));
    }

    #[tokio::test]
    async fn test_run_many_defaults_dedupes_and_sorts() {
        let p = pipeline(
            vec![
                group("zeta", vec![values("acme", "values", "prod/values.yaml")]),
                group("alpha", vec![values("acme", "values", "prod/values.yaml")]),
            ],
            Arc::new(accessor()),
            Arc::new(FakeRenderer::new()),
        );

        let all = p.run_many("main", &[], &PipelineMode::Preview).await.expect("run");
        assert_eq!(all.keys().collect::<Vec<_>>(), vec!["alpha", "zeta"]);

        let requested = [String::from("zeta"), String::from("ghost"), String::from("zeta")];
        let some = p
            .run_many("main", &requested, &PipelineMode::Preview)
            .await
            .expect("run");
        assert_eq!(some.len(), 2);
        assert!(some["ghost"].error().is_some_and(|e| e.contains("not found")));
    }

    #[tokio::test]
    async fn test_run_many_without_groups() {
        let p = pipeline(vec![], Arc::new(accessor()), Arc::new(FakeRenderer::new()));
        let err = p.run_many("main", &[], &PipelineMode::Preview).await.unwrap_err();
        assert!(matches!(
            err,
            crate::error::HelmPipelineError::Pipeline(PipelineError::NoGroups)
        ));
    }

    #[tokio::test]
    async fn test_commit_to_source_repository_is_not_annotated() {
        let accessor = Arc::new(accessor());
        let mut g = group("prod", vec![values("acme", "values", "prod/values.yaml")]);
        g.output_target = output("acme", "chart");
        let p = pipeline(vec![g], Arc::clone(&accessor), Arc::new(FakeRenderer::new()));

        p.run_group(
            "main",
            "prod",
            &PipelineMode::Commit {
                message: String::from("Regenerate"),
            },
        )
        .await
        .expect("commit");
        assert_eq!(accessor.pushes()[0].message, "Regenerate");
    }
}
