//! Output formatting for CLI commands.
//!
//! This module provides formatting utilities for displaying
//! information to the user in various formats.

use colored::Colorize;
use serde_json::json;
use std::collections::BTreeMap;
use std::fmt::Write;
use tabled::{Table, Tabled};

use crate::config::{PipelineConfig, ValidationResult};
use crate::extractor::ChangeKind;
use crate::pipeline::PipelineResult;

use super::commands::OutputFormat;

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Group row for table display.
#[derive(Tabled)]
struct GroupRow {
    #[tabled(rename = "Group")]
    name: String,
    #[tabled(rename = "Values")]
    values: usize,
    #[tabled(rename = "Output")]
    output: String,
    #[tabled(rename = "Branch")]
    branch: String,
}

/// Result row for table display.
#[derive(Tabled)]
struct ResultRow {
    #[tabled(rename = "Group")]
    group: String,
    #[tabled(rename = "Outcome")]
    outcome: String,
    #[tabled(rename = "Detail")]
    detail: String,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats configured groups.
    #[must_use]
    pub fn format_groups(&self, config: &PipelineConfig) -> String {
        match self.format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(&json!({ "groups": config.group_names() }))
                    .unwrap_or_default()
            }
            OutputFormat::Text => {
                if config.groups.is_empty() {
                    return String::from("No groups configured.\n");
                }
                let rows: Vec<GroupRow> = config
                    .groups
                    .iter()
                    .map(|g| GroupRow {
                        name: g.name.clone(),
                        values: g.values_sources.len(),
                        output: format!(
                            "{}:{}",
                            g.output_target.repository(),
                            g.output_target.relative_file().display()
                        ),
                        branch: g.output_target.branch.clone(),
                    })
                    .collect();
                format!("{}\n", Table::new(rows))
            }
        }
    }

    /// Formats a validation outcome with a configuration summary.
    #[must_use]
    pub fn format_validation(
        &self,
        config: &PipelineConfig,
        result: &ValidationResult,
        show_warnings: bool,
    ) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(&json!({
                "valid": result.is_valid(),
                "groups": config.group_names(),
                "valuesSources": config.groups.iter().map(|g| g.values_sources.len()).sum::<usize>(),
                "warnings": result.warnings,
            }))
            .unwrap_or_default(),
            OutputFormat::Text => {
                let mut output = format!("{} Configuration is valid!\n", "✓".green());

                if show_warnings && !result.warnings.is_empty() {
                    let _ = write!(output, "\n{} Warnings:\n", "⚠".yellow());
                    for warning in &result.warnings {
                        let _ = writeln!(output, "   - {warning}");
                    }
                }

                output.push_str("\nConfiguration summary:\n");
                let _ = writeln!(output, "   Groups: {}", config.groups.len());
                let _ = writeln!(
                    output,
                    "   Values sources: {}",
                    config.groups.iter().map(|g| g.values_sources.len()).sum::<usize>()
                );
                let _ = writeln!(output, "   Warnings: {}", result.warning_count());
                output
            }
        }
    }

    /// Formats branch names.
    #[must_use]
    pub fn format_branches(&self, branches: &[String]) -> String {
        match self.format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(&json!({ "branches": branches })).unwrap_or_default()
            }
            OutputFormat::Text => {
                let mut output = String::new();
                for branch in branches {
                    let _ = writeln!(output, "{branch}");
                }
                output
            }
        }
    }

    /// Formats per-group pipeline results.
    #[must_use]
    pub fn format_results(&self, branch: &str, results: &BTreeMap<String, PipelineResult>) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(&json!({
                "branch": branch,
                "generatedAt": chrono::Utc::now(),
                "results": results,
            }))
            .unwrap_or_default(),
            OutputFormat::Text => Self::format_results_text(branch, results),
        }
    }

    fn format_results_text(branch: &str, results: &BTreeMap<String, PipelineResult>) -> String {
        let mut output = format!("\nBranch: {branch}\n\n");

        let rows: Vec<ResultRow> = results
            .iter()
            .map(|(group, result)| {
                let (outcome, detail) = Self::summarize(result);
                ResultRow {
                    group: group.clone(),
                    outcome,
                    detail,
                }
            })
            .collect();
        output.push_str(&Table::new(rows).to_string());
        output.push('\n');

        for (group, result) in results {
            let lines = Self::detail_lines(result);
            if lines.is_empty() {
                continue;
            }
            let _ = write!(output, "\n{group}:\n");
            for line in lines {
                let _ = writeln!(output, "   {line}");
            }
        }

        let failed = results.values().filter(|r| r.is_failed()).count();
        if failed > 0 {
            let _ = write!(output, "\n{} {failed} group(s) failed\n", "✗".red());
        }
        output
    }

    fn summarize(result: &PipelineResult) -> (String, String) {
        match result {
            PipelineResult::Failed { error } => ("failed".red().to_string(), Self::truncate(error, 60)),
            PipelineResult::NewFile { keys, .. } => (
                "new file".green().to_string(),
                format!("{} key(s)", keys.leaf_paths().len()),
            ),
            PipelineResult::Changes { diff } if diff.is_empty() => {
                ("unchanged".dimmed().to_string(), String::new())
            }
            PipelineResult::Changes { diff } => (
                "changes".yellow().to_string(),
                format!(
                    "{} added, {} changed, {} removed",
                    diff.count(ChangeKind::Added),
                    diff.count(ChangeKind::Changed),
                    diff.count(ChangeKind::Removed)
                ),
            ),
            PipelineResult::Committed {
                message,
                content_changed,
            } => {
                let outcome = if *content_changed {
                    "committed".green().to_string()
                } else {
                    "no changes".dimmed().to_string()
                };
                (outcome, message.clone())
            }
        }
    }

    fn detail_lines(result: &PipelineResult) -> Vec<String> {
        match result {
            PipelineResult::NewFile { keys, .. } => keys
                .leaf_paths()
                .into_iter()
                .map(|path| format!("{} {path}", "+".green()))
                .collect(),
            PipelineResult::Changes { diff } => diff
                .iter()
                .map(|(path, kind)| match kind {
                    ChangeKind::Added => format!("{} {path}", "+".green()),
                    ChangeKind::Changed => format!("{} {path}", "~".yellow()),
                    ChangeKind::Removed => format!("{} {path}", "-".red()),
                })
                .collect(),
            PipelineResult::Failed { error } if error.chars().count() > 60 => vec![error.clone()],
            _ => Vec::new(),
        }
    }

    /// Truncates a string to a maximum number of characters.
    fn truncate(s: &str, max_len: usize) -> String {
        if s.chars().count() <= max_len {
            s.to_string()
        } else {
            let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
            format!("{head}...")
        }
    }
}
