//! Configuration parser for loading group definitions.
//!
//! Groups are loaded once at startup, in order of precedence, from a YAML
//! file, from the `CONFIG_GROUPS` JSON variable, or from positional
//! `CONFIG_GROUP_<i>_*` variables. Environment access goes through an
//! explicit variable map so nothing reads process state after startup.

use crate::error::{ConfigError, HelmPipelineError, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use super::spec::{ConfigGroup, DEFAULT_BRANCH, OutputTarget, PipelineConfig, ValuesSource};
use super::validator::ConfigValidator;

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";

/// Variable holding the JSON-encoded group list.
pub const CONFIG_GROUPS_VAR: &str = "CONFIG_GROUPS";

/// Configuration parser for loading group configuration.
#[derive(Debug, Default)]
pub struct ConfigParser {
    /// Base path for resolving relative paths.
    base_path: Option<PathBuf>,
}

impl ConfigParser {
    /// Creates a new configuration parser.
    #[must_use]
    pub const fn new() -> Self {
        Self { base_path: None }
    }

    /// Sets the base path for resolving relative paths.
    #[must_use]
    pub fn with_base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Loads configuration from the file, falling back to environment encodings.
    ///
    /// # Errors
    ///
    /// Returns the file's error when an existing file is rejected and the
    /// environment holds no valid configuration either; otherwise the
    /// environment loader's error.
    pub fn load(&self, path: Option<&Path>, vars: &HashMap<String, String>) -> Result<PipelineConfig> {
        let path = self.resolve_path(path);

        match self.load_file(&path) {
            Ok(config) => Ok(config),
            Err(HelmPipelineError::Config(ConfigError::FileNotFound { .. })) => {
                info!("No config file at {}, loading from environment variables", path.display());
                Self::load_from_vars(vars)
            }
            Err(file_error) => {
                error!("Config file {} rejected: {file_error}", path.display());
                info!("Attempting to load config from environment variables");
                Self::load_from_vars(vars).map_err(|env_error| {
                    debug!("Environment configuration rejected: {env_error}");
                    file_error
                })
            }
        }
    }

    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<PipelineConfig> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());

        if !path.exists() {
            return Err(HelmPipelineError::Config(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            }));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            HelmPipelineError::Config(ConfigError::ParseError {
                message: format!("Failed to read file: {e}"),
                location: Some(path.display().to_string()),
            })
        })?;

        self.parse_yaml(&content, Some(path))
    }

    /// Parses configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid or fails validation.
    pub fn parse_yaml(&self, content: &str, source: Option<&Path>) -> Result<PipelineConfig> {
        debug!("Parsing YAML configuration");

        let config: PipelineConfig = serde_yaml::from_str(content).map_err(|e| {
            let location = source.map(|p| p.display().to_string());
            HelmPipelineError::Config(ConfigError::ParseError {
                message: format!("YAML parse error: {e}"),
                location,
            })
        })?;

        finalize(config)
    }

    /// Loads configuration from the `CONFIG_GROUPS` JSON variable or, if it
    /// is unset, from positional `CONFIG_GROUP_<i>_*` variables.
    ///
    /// # Errors
    ///
    /// Returns an error if no valid configuration is present.
    pub fn load_from_vars(vars: &HashMap<String, String>) -> Result<PipelineConfig> {
        if let Some(json) = vars.get(CONFIG_GROUPS_VAR).filter(|v| !v.trim().is_empty()) {
            return Self::parse_groups_json(json);
        }

        match Self::parse_prefixed_vars(vars) {
            Ok(config) if !config.groups.is_empty() => Ok(config),
            Ok(_) => Err(no_env_config()),
            Err(e) => {
                debug!("Prefixed environment configuration rejected: {e}");
                Err(no_env_config())
            }
        }
    }

    /// Parses a JSON array of groups.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is invalid or fails validation.
    pub fn parse_groups_json(json: &str) -> Result<PipelineConfig> {
        let groups: Vec<ConfigGroup> = serde_json::from_str(json).map_err(|e| {
            HelmPipelineError::Config(ConfigError::ParseError {
                message: format!("Failed to parse {CONFIG_GROUPS_VAR} JSON: {e}"),
                location: Some(String::from(CONFIG_GROUPS_VAR)),
            })
        })?;

        finalize(PipelineConfig { groups })
    }

    /// Parses groups from positional variables.
    ///
    /// `CONFIG_GROUP_1_NAME`, `CONFIG_GROUP_1_VALUES_REPO_1`, ... and
    /// `CONFIG_GROUP_1_OUTPUT_REPO`; numbering stops at the first gap.
    ///
    /// # Errors
    ///
    /// Returns an error if a source string is malformed or validation fails.
    pub fn parse_prefixed_vars(vars: &HashMap<String, String>) -> Result<PipelineConfig> {
        let mut groups = Vec::new();

        for i in 1.. {
            let prefix = format!("CONFIG_GROUP_{i}_");
            let Some(name) = vars.get(&format!("{prefix}NAME")).filter(|v| !v.is_empty()) else {
                break;
            };

            let mut values_sources = Vec::new();
            for j in 1.. {
                let Some(spec) = vars
                    .get(&format!("{prefix}VALUES_REPO_{j}"))
                    .filter(|v| !v.is_empty())
                else {
                    break;
                };
                values_sources.push(parse_values_source(spec)?);
            }

            let output_target = match vars.get(&format!("{prefix}OUTPUT_REPO")).filter(|v| !v.is_empty()) {
                Some(spec) => parse_output_target(spec)?,
                None => OutputTarget {
                    owner: String::new(),
                    repo: String::new(),
                    path: String::new(),
                    filename: String::new(),
                    branch: String::new(),
                },
            };

            groups.push(ConfigGroup {
                name: name.clone(),
                values_sources,
                output_target,
            });
        }

        finalize(PipelineConfig { groups })
    }

    /// Loads the .env file if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the .env file exists but cannot be loaded.
    pub fn load_dotenv(&self) -> Result<()> {
        let env_path = self
            .base_path
            .as_ref()
            .map_or_else(|| PathBuf::from(".env"), |p| p.join(".env"));

        if env_path.exists() {
            info!("Loading environment from: {}", env_path.display());
            dotenvy::from_path(&env_path).map_err(|e| {
                HelmPipelineError::Config(ConfigError::ParseError {
                    message: format!("Failed to load .env file: {e}"),
                    location: Some(env_path.display().to_string()),
                })
            })?;
        } else {
            debug!(".env file not found at: {}", env_path.display());
        }

        Ok(())
    }

    /// Resolves the configuration file path against the base path.
    fn resolve_path(&self, path: Option<&Path>) -> PathBuf {
        let path = path.map_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE), Path::to_path_buf);
        match &self.base_path {
            Some(base) if path.is_relative() => base.join(path),
            _ => path,
        }
    }
}

/// Applies defaults and validates, logging any warnings.
fn finalize(mut config: PipelineConfig) -> Result<PipelineConfig> {
    ConfigValidator::apply_defaults(&mut config);
    let result = ConfigValidator::new().validate(&config)?;
    for warning in &result.warnings {
        warn!("{warning}");
    }
    Ok(config)
}

fn no_env_config() -> HelmPipelineError {
    HelmPipelineError::Config(ConfigError::validation_general(
        "No valid configuration found in environment variables",
    ))
}

/// Splits `owner/repo` into its parts.
fn split_repository(repository: &str, spec: &str) -> Result<(String, String)> {
    match repository.split('/').collect::<Vec<_>>().as_slice() {
        [owner, repo] if !owner.is_empty() && !repo.is_empty() => {
            Ok(((*owner).to_string(), (*repo).to_string()))
        }
        _ => Err(HelmPipelineError::Config(ConfigError::invalid_source(
            spec,
            format!("invalid repository format: {repository}"),
        ))),
    }
}

/// Parses `owner/repo:path[:branch]`.
///
/// # Errors
///
/// Returns an error if the string has fewer than two parts or the repository
/// is not `owner/repo`.
pub fn parse_values_source(spec: &str) -> Result<ValuesSource> {
    let parts: Vec<&str> = spec.split(':').collect();
    if parts.len() < 2 {
        return Err(HelmPipelineError::Config(ConfigError::invalid_source(
            spec,
            "expected owner/repo:path[:branch]",
        )));
    }

    let (owner, repo) = split_repository(parts[0], spec)?;

    Ok(ValuesSource {
        owner,
        repo,
        path: parts[1].to_string(),
        branch: parts
            .get(2)
            .map_or_else(|| String::from(DEFAULT_BRANCH), |b| (*b).to_string()),
    })
}

/// Parses `owner/repo:dir/filename[:branch]`.
///
/// # Errors
///
/// Returns an error if the string has fewer than two parts or the repository
/// is not `owner/repo`.
pub fn parse_output_target(spec: &str) -> Result<OutputTarget> {
    let parts: Vec<&str> = spec.split(':').collect();
    if parts.len() < 2 {
        return Err(HelmPipelineError::Config(ConfigError::invalid_source(
            spec,
            "expected owner/repo:dir/filename[:branch]",
        )));
    }

    let (owner, repo) = split_repository(parts[0], spec)?;

    let (path, filename) = parts[1].rsplit_once('/').unwrap_or(("", parts[1]));

    Ok(OutputTarget {
        owner,
        repo,
        path: path.to_string(),
        filename: filename.to_string(),
        branch: parts
            .get(2)
            .map_or_else(|| String::from(DEFAULT_BRANCH), |b| (*b).to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_parse_minimal_config() {
        let yaml = r"
groups:
  - name: prod
    values_repos:
      - owner: acme
        repo: values
        path: prod/values.yaml
    output_repo:
      owner: acme
      repo: manifests
      path: clusters/prod
";
        let config = ConfigParser::new()
            .parse_yaml(yaml, None)
            .expect("config should parse");

        assert_eq!(config.groups.len(), 1);
        let group = &config.groups[0];
        assert_eq!(group.name, "prod");
        assert_eq!(group.values_sources[0].branch, "main");
        assert_eq!(group.output_target.filename, "generated.yaml");
    }

    #[test]
    fn test_parse_new_field_names() {
        let yaml = r"
groups:
  - name: staging
    values_sources:
      - owner: acme
        repo: values
        path: base.yaml
        branch: develop
      - owner: acme
        repo: values
        path: staging.yaml
    output_target:
      owner: acme
      repo: manifests
      filename: staging.yaml
      branch: release
";
        let config = ConfigParser::new()
            .parse_yaml(yaml, None)
            .expect("config should parse");

        let group = &config.groups[0];
        assert_eq!(group.values_sources.len(), 2);
        assert_eq!(group.values_sources[0].branch, "develop");
        assert_eq!(group.output_target.branch, "release");
    }

    #[test]
    fn test_parse_invalid_yaml() {
        let result = ConfigParser::new().parse_yaml("groups: [", None);
        assert!(matches!(
            result,
            Err(HelmPipelineError::Config(ConfigError::ParseError { .. }))
        ));
    }

    #[test]
    fn test_parse_groups_json_applies_defaults() {
        let json = r#"[{"name":"prod","values_repos":[{"owner":"acme","repo":"values","path":"v.yaml","branch":""}],"output_repo":{"owner":"acme","repo":"out","path":"","filename":"","branch":""}}]"#;
        let config = ConfigParser::parse_groups_json(json).expect("json should parse");

        let group = &config.groups[0];
        assert_eq!(group.values_sources[0].branch, "main");
        assert_eq!(group.output_target.filename, "generated.yaml");
        assert_eq!(group.output_target.branch, "main");
    }

    #[test]
    fn test_parse_prefixed_vars() {
        let vars = vars(&[
            ("CONFIG_GROUP_1_NAME", "prod"),
            ("CONFIG_GROUP_1_VALUES_REPO_1", "acme/values:base.yaml"),
            ("CONFIG_GROUP_1_VALUES_REPO_2", "acme/values:prod.yaml:release"),
            ("CONFIG_GROUP_1_OUTPUT_REPO", "acme/manifests:clusters/prod/app.yaml"),
            ("CONFIG_GROUP_2_NAME", "dev"),
            ("CONFIG_GROUP_2_VALUES_REPO_1", "acme/values:dev.yaml"),
            ("CONFIG_GROUP_2_OUTPUT_REPO", "acme/manifests:dev.yaml:dev"),
            // Ignored: numbering stops at the first gap.
            ("CONFIG_GROUP_4_NAME", "orphan"),
        ]);

        let config = ConfigParser::load_from_vars(&vars).expect("env config should parse");
        assert_eq!(config.group_names(), vec!["prod", "dev"]);

        let prod = config.group("prod").expect("prod group");
        assert_eq!(prod.values_sources.len(), 2);
        assert_eq!(prod.values_sources[1].branch, "release");
        assert_eq!(prod.output_target.path, "clusters/prod");
        assert_eq!(prod.output_target.filename, "app.yaml");

        let dev = config.group("dev").expect("dev group");
        assert_eq!(dev.output_target.path, "");
        assert_eq!(dev.output_target.branch, "dev");
    }

    #[test]
    fn test_json_takes_precedence_over_prefixed() {
        let vars = vars(&[
            (
                "CONFIG_GROUPS",
                r#"[{"name":"json","values_sources":[{"owner":"a","repo":"b","path":"c"}],"output_target":{"owner":"a","repo":"d"}}]"#,
            ),
            ("CONFIG_GROUP_1_NAME", "prefixed"),
        ]);

        let config = ConfigParser::load_from_vars(&vars).expect("env config should parse");
        assert_eq!(config.group_names(), vec!["json"]);
    }

    #[test]
    fn test_empty_env_is_error() {
        assert!(ConfigParser::load_from_vars(&HashMap::new()).is_err());
    }

    #[test]
    fn test_load_prefers_file() {
        let dir = TempDir::new().expect("temp dir");
        std::fs::write(
            dir.path().join("config.yaml"),
            "groups:\n  - name: file\n    values_sources:\n      - {owner: a, repo: b, path: c}\n    output_target: {owner: a, repo: d}\n",
        )
        .expect("write config");

        let vars = vars(&[("CONFIG_GROUP_1_NAME", "env")]);
        let config = ConfigParser::new()
            .with_base_path(dir.path())
            .load(None, &vars)
            .expect("config should load");
        assert_eq!(config.group_names(), vec!["file"]);
    }

    #[test]
    fn test_load_falls_back_to_env() {
        let dir = TempDir::new().expect("temp dir");
        let vars = vars(&[
            ("CONFIG_GROUP_1_NAME", "env"),
            ("CONFIG_GROUP_1_VALUES_REPO_1", "acme/values:v.yaml"),
            ("CONFIG_GROUP_1_OUTPUT_REPO", "acme/out:out.yaml"),
        ]);

        let config = ConfigParser::new()
            .with_base_path(dir.path())
            .load(None, &vars)
            .expect("config should load");
        assert_eq!(config.group_names(), vec!["env"]);
    }

    #[test]
    fn test_load_reports_rejected_file() {
        let dir = TempDir::new().expect("temp dir");
        std::fs::write(dir.path().join("config.yaml"), "groups: [\n").expect("write config");

        let err = ConfigParser::new()
            .with_base_path(dir.path())
            .load(None, &HashMap::new())
            .unwrap_err();
        assert!(err.to_string().contains("YAML parse error"), "{err}");
    }

    #[test]
    fn test_load_missing_file_reports_env_error() {
        let dir = TempDir::new().expect("temp dir");
        let err = ConfigParser::new()
            .with_base_path(dir.path())
            .load(None, &HashMap::new())
            .unwrap_err();
        assert!(err.to_string().contains("environment variables"), "{err}");
    }

    #[test]
    fn test_parse_source_strings() {
        let source = parse_values_source("acme/values:path/to/values.yaml").expect("valid source");
        assert_eq!(source.owner, "acme");
        assert_eq!(source.repo, "values");
        assert_eq!(source.path, "path/to/values.yaml");
        assert_eq!(source.branch, "main");

        assert!(parse_values_source("acme/values").is_err());
        assert!(parse_values_source("acme:values.yaml").is_err());
        assert!(parse_output_target("a/b/c:out.yaml").is_err());
    }
}
