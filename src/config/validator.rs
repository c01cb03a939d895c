//! Configuration validation for group definitions.
//!
//! This module checks the loaded group set against its invariants and fills
//! in the defaults that the loaders may have left blank.

use crate::error::{ConfigError, HelmPipelineError, Result};
use std::collections::{HashMap, HashSet};
use tracing::debug;

use super::spec::{ConfigGroup, DEFAULT_BRANCH, DEFAULT_FILENAME, PipelineConfig};

/// Validator for pipeline configurations.
#[derive(Debug, Default)]
pub struct ConfigValidator;

/// Validation result containing all errors found.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// List of validation errors.
    pub errors: Vec<ValidationError>,
    /// List of warnings (non-fatal issues).
    pub warnings: Vec<String>,
}

/// A single validation error.
#[derive(Debug)]
pub struct ValidationError {
    /// The field path that failed validation.
    pub field: String,
    /// The error message.
    pub message: String,
}

impl ConfigValidator {
    /// Creates a new validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Fills blank branches and filenames with their defaults.
    ///
    /// Loaders that bypass serde defaults (JSON with explicit empty strings,
    /// positional environment variables) rely on this.
    pub fn apply_defaults(config: &mut PipelineConfig) {
        for group in &mut config.groups {
            for source in &mut group.values_sources {
                if source.branch.trim().is_empty() {
                    source.branch = String::from(DEFAULT_BRANCH);
                }
            }
            if group.output_target.filename.trim().is_empty() {
                group.output_target.filename = String::from(DEFAULT_FILENAME);
            }
            if group.output_target.branch.trim().is_empty() {
                group.output_target.branch = String::from(DEFAULT_BRANCH);
            }
        }
    }

    /// Validates a pipeline configuration.
    ///
    /// # Errors
    ///
    /// Returns the first error found if validation fails.
    pub fn validate(&self, config: &PipelineConfig) -> Result<ValidationResult> {
        let mut result = ValidationResult::default();

        if config.groups.is_empty() {
            return Err(HelmPipelineError::Config(ConfigError::validation(
                "No configuration groups defined",
                "groups",
            )));
        }

        let mut seen_names = HashSet::new();
        for (i, group) in config.groups.iter().enumerate() {
            if !group.name.is_empty() && !seen_names.insert(group.name.as_str()) {
                return Err(HelmPipelineError::Config(ConfigError::DuplicateName {
                    name: group.name.clone(),
                }));
            }
            Self::validate_group(group, i, &mut result);
        }

        Self::check_shared_targets(config, &mut result);

        if result.errors.is_empty() {
            debug!("Configuration validation passed for {} groups", config.groups.len());
            Ok(result)
        } else {
            let first_error = &result.errors[0];
            Err(HelmPipelineError::Config(ConfigError::ValidationError {
                message: first_error.message.clone(),
                field: Some(first_error.field.clone()),
            }))
        }
    }

    /// Validates a single group.
    fn validate_group(group: &ConfigGroup, index: usize, result: &mut ValidationResult) {
        let prefix = format!("groups[{index}]");

        if group.name.trim().is_empty() {
            result.errors.push(ValidationError {
                field: format!("{prefix}.name"),
                message: format!("Group {} has no name", index + 1),
            });
            return;
        }

        if group.values_sources.is_empty() {
            result.errors.push(ValidationError {
                field: format!("{prefix}.values_sources"),
                message: format!("Group {} has no values repositories", group.name),
            });
        }

        for (j, source) in group.values_sources.iter().enumerate() {
            if source.owner.is_empty() || source.repo.is_empty() || source.path.is_empty() {
                result.errors.push(ValidationError {
                    field: format!("{prefix}.values_sources[{j}]"),
                    message: format!(
                        "Group {}, values repo {} has missing fields",
                        group.name,
                        j + 1
                    ),
                });
            } else if source.path.starts_with('/') {
                result.warnings.push(format!(
                    "{prefix}.values_sources[{j}].path: '{}' is resolved relative to the repository root",
                    source.path
                ));
            }
        }

        let target = &group.output_target;
        if target.owner.is_empty() || target.repo.is_empty() {
            result.errors.push(ValidationError {
                field: format!("{prefix}.output_target"),
                message: format!("Group {} has invalid output repository", group.name),
            });
        }

        if target.filename.contains('/') {
            result.errors.push(ValidationError {
                field: format!("{prefix}.output_target.filename"),
                message: format!(
                    "Group {} output filename must not contain '/': {}",
                    group.name, target.filename
                ),
            });
        }
    }

    /// Warns when two groups write the same file on the same branch.
    fn check_shared_targets(config: &PipelineConfig, result: &mut ValidationResult) {
        let mut targets: HashMap<(String, String, std::path::PathBuf), &str> = HashMap::new();

        for group in &config.groups {
            let target = &group.output_target;
            let key = (target.repository(), target.branch.clone(), target.relative_file());
            if let Some(other) = targets.insert(key, &group.name) {
                result.warnings.push(format!(
                    "Groups {other} and {} write the same output file {} on branch {}",
                    group.name,
                    target.relative_file().display(),
                    target.branch
                ));
            }
        }
    }
}

impl ValidationResult {
    /// Returns true if validation passed (no errors).
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the number of warnings.
    #[must_use]
    pub const fn warning_count(&self) -> usize {
        self.warnings.len()
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}
