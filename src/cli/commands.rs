//! CLI command definitions.
//!
//! This module defines all CLI commands and their arguments using clap.
//! Runtime settings fall back to environment variables (and `.env`).

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{
    DEFAULT_AUTHOR_EMAIL, DEFAULT_AUTHOR_NAME, DEFAULT_HOST, DEFAULT_PORT,
    DEFAULT_REQUEST_TIMEOUT_SECS, Settings, SourceRepository,
};

/// Helm pipeline - render charts, preview key changes, commit the output.
#[derive(Parser, Debug)]
#[command(name = "helm-pipeline")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the group configuration file.
    #[arg(short, long, global = true, env = "CONFIG_PATH")]
    pub config: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Output format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP server.
    Serve(ServeArgs),

    /// Validate the group configuration.
    Validate {
        /// Show all warnings, not just errors.
        #[arg(short, long)]
        warnings: bool,
    },

    /// List configured groups.
    Groups,

    /// Preview key changes for a branch.
    Preview {
        /// Repository and tool settings.
        #[command(flatten)]
        repo: RepoArgs,

        /// Chart source branch.
        #[arg(short, long)]
        branch: String,

        /// Group to run (repeatable; defaults to all groups).
        #[arg(short, long = "group")]
        groups: Vec<String>,
    },

    /// Render, commit, and push the output for a branch.
    Commit {
        /// Repository and tool settings.
        #[command(flatten)]
        repo: RepoArgs,

        /// Chart source branch.
        #[arg(short, long)]
        branch: String,

        /// Commit message.
        #[arg(short, long)]
        message: String,

        /// Group to run (repeatable; defaults to all groups).
        #[arg(short, long = "group")]
        groups: Vec<String>,
    },

    /// List branches of the chart source repository.
    Branches {
        /// Repository and tool settings.
        #[command(flatten)]
        repo: RepoArgs,
    },
}

/// Chart source, credentials, and external tools.
#[derive(Args, Debug, Clone)]
pub struct RepoArgs {
    /// GitHub access token.
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: String,

    /// Owner of the chart source repository.
    #[arg(long, env = "REPO_OWNER")]
    pub repo_owner: String,

    /// Name of the chart source repository.
    #[arg(long, env = "REPO_NAME")]
    pub repo_name: String,

    /// Chart directory inside the source repository.
    #[arg(long, env = "CHART_PATH", default_value = ".")]
    pub chart_path: PathBuf,

    /// Root directory for checkouts (defaults to the system temp dir).
    #[arg(long, env = "WORK_DIR")]
    pub work_dir: Option<PathBuf>,

    /// Helm executable.
    #[arg(long, env = "HELM_BIN", default_value = "helm")]
    pub helm_bin: PathBuf,

    /// Git executable.
    #[arg(long, env = "GIT_BIN", default_value = "git")]
    pub git_bin: PathBuf,

    /// Commit author name.
    #[arg(long, env = "GIT_AUTHOR_NAME", default_value = DEFAULT_AUTHOR_NAME)]
    pub author_name: String,

    /// Commit author email.
    #[arg(long, env = "GIT_AUTHOR_EMAIL", default_value = DEFAULT_AUTHOR_EMAIL)]
    pub author_email: String,
}

/// Arguments of `serve`.
#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Repository and tool settings.
    #[command(flatten)]
    pub repo: RepoArgs,

    /// Bind host.
    #[arg(long, env = "HOST", default_value = DEFAULT_HOST)]
    pub host: String,

    /// Bind port.
    #[arg(short, long, env = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Directory with the built frontend.
    #[arg(long, env = "FRONTEND_DIR", default_value = "frontend/dist")]
    pub frontend_dir: PathBuf,

    /// Per-request timeout in seconds.
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS)]
    pub request_timeout_secs: u64,
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

impl Cli {
    /// Parses CLI arguments from the command line.
    #[must_use]
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl RepoArgs {
    /// Builds runtime settings with default server values.
    #[must_use]
    pub fn settings(&self) -> Settings {
        let source = SourceRepository::new(&self.repo_owner, &self.repo_name)
            .with_chart_path(&self.chart_path);

        let mut settings = Settings::new(&self.github_token, source);
        if let Some(work_dir) = &self.work_dir {
            settings.work_dir.clone_from(work_dir);
        }
        settings.helm_bin.clone_from(&self.helm_bin);
        settings.git_bin.clone_from(&self.git_bin);
        settings.author_name.clone_from(&self.author_name);
        settings.author_email.clone_from(&self.author_email);
        settings
    }
}

impl ServeArgs {
    /// Builds runtime settings including the server values.
    #[must_use]
    pub fn settings(&self) -> Settings {
        let mut settings = self.repo.settings();
        settings.host.clone_from(&self.host);
        settings.port = self.port;
        settings.frontend_dir.clone_from(&self.frontend_dir);
        settings.request_timeout_secs = self.request_timeout_secs;
        settings
    }
}
