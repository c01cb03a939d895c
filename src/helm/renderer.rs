//! Chart rendering through the `helm` executable.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::{HelmPipelineError, PipelineError, Result};

/// Renders a chart with an ordered list of values files.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Renders the chart at `chart` with `values` applied in order.
    ///
    /// Returns the rendered manifests as one YAML stream.
    async fn render(&self, chart: &Path, values: &[PathBuf]) -> Result<Vec<u8>>;

    /// Returns true if the renderer can be invoked.
    async fn is_available(&self) -> bool;
}

/// Renderer backed by `helm template`.
#[derive(Debug, Clone)]
pub struct HelmRenderer {
    binary: PathBuf,
}

impl Default for HelmRenderer {
    fn default() -> Self {
        Self::new("helm")
    }
}

impl HelmRenderer {
    /// Creates a renderer that invokes the given helm binary.
    #[must_use]
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Returns the helm binary path.
    #[must_use]
    pub fn binary(&self) -> &Path {
        &self.binary
    }
}

#[async_trait]
impl Renderer for HelmRenderer {
    async fn render(&self, chart: &Path, values: &[PathBuf]) -> Result<Vec<u8>> {
        for file in values {
            if !tokio::fs::try_exists(file).await.unwrap_or(false) {
                return Err(PipelineError::render(format!(
                    "values file not found: {}",
                    file.display()
                ))
                .into());
            }
        }

        let output_dir = tempfile::Builder::new()
            .prefix("helm-template-")
            .tempdir()
            .map_err(|e| PipelineError::render(format!("failed to create output directory: {e}")))?;

        let mut command = Command::new(&self.binary);
        command
            .arg("template")
            .arg(chart)
            .arg("--output-dir")
            .arg(output_dir.path());
        for file in values {
            command.arg("-f").arg(file);
        }

        info!(
            "Rendering chart {} with {} values file(s)",
            chart.display(),
            values.len()
        );

        let output = command.output().await.map_err(|e| {
            PipelineError::render(format!(
                "failed to execute {}: {e}",
                self.binary.display()
            ))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PipelineError::render(format!(
                "helm template failed ({}): {}",
                output.status,
                stderr.trim()
            ))
            .into());
        }

        let files = collect_manifests(output_dir.path()).await?;
        debug!("helm template produced {} manifest file(s)", files.len());

        let mut combined = Vec::new();
        for file in files {
            let content = tokio::fs::read(&file).await.map_err(|e| {
                PipelineError::render(format!(
                    "failed to read rendered file {}: {e}",
                    file.display()
                ))
            })?;
            combined.extend_from_slice(b"---\n");
            combined.extend_from_slice(&content);
            combined.push(b'\n');
        }

        Ok(combined)
    }

    async fn is_available(&self) -> bool {
        match Command::new(&self.binary)
            .args(["version", "--short"])
            .output()
            .await
        {
            Ok(output) if output.status.success() => true,
            Ok(output) => {
                warn!("helm version exited with {}", output.status);
                false
            }
            Err(e) => {
                warn!("helm is not available: {e}");
                false
            }
        }
    }
}

/// Lists every `.yaml`/`.yml` file under `dir`, sorted by path.
async fn collect_manifests(dir: &Path) -> Result<Vec<PathBuf>> {
    let read_error = |path: &Path, e: std::io::Error| {
        HelmPipelineError::from(PipelineError::render(format!(
            "failed to read rendered directory {}: {e}",
            path.display()
        )))
    };

    let mut files = Vec::new();
    let mut pending = vec![dir.to_path_buf()];

    while let Some(current) = pending.pop() {
        let mut entries = tokio::fs::read_dir(&current)
            .await
            .map_err(|e| read_error(&current, e))?;

        while let Some(entry) = entries.next_entry().await.map_err(|e| read_error(&current, e))? {
            let path = entry.path();
            let file_type = entry.file_type().await.map_err(|e| read_error(&path, e))?;
            if file_type.is_dir() {
                pending.push(path);
            } else if is_manifest(&path) {
                files.push(path);
            }
        }
    }

    files.sort();
    Ok(files)
}

fn is_manifest(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext == "yaml" || ext == "yml")
}
