//! Helm pipeline CLI entrypoint.
//!
//! This is the main entrypoint for the helm-pipeline server and
//! command-line tool.

use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use helm_pipeline::api::{AppState, build_router};
use helm_pipeline::cli::{Cli, Commands, OutputFormatter, RepoArgs};
use helm_pipeline::config::{ConfigParser, ConfigValidator, PipelineConfig, Settings};
use helm_pipeline::error::{HelmPipelineError, Result};
use helm_pipeline::git::GitCli;
use helm_pipeline::github::{GitHubApi, GitHubClient};
use helm_pipeline::helm::HelmRenderer;
use helm_pipeline::pipeline::{Pipeline, PipelineMode};

use clap::Parser;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Main entrypoint.
fn main() -> ExitCode {
    // Loaded before parsing so clap's env fallbacks see the values.
    let dotenv = ConfigParser::new().load_dotenv();

    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose, cli.log_json);
    if let Err(e) = dotenv {
        warn!("{e}");
    }

    // Run async runtime
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system.
///
/// `--verbose` forces debug; otherwise `RUST_LOG` applies, defaulting to info.
fn init_logging(verbose: bool, json: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Main async entry point.
async fn run(cli: Cli) -> Result<()> {
    let formatter = OutputFormatter::new(cli.output);
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Serve(args) => cmd_serve(load_config(config_path)?, args.settings()).await,
        Commands::Validate { warnings } => cmd_validate(config_path, warnings, &formatter),
        Commands::Groups => {
            let config = load_config(config_path)?;
            emit(&formatter.format_groups(&config));
            Ok(())
        }
        Commands::Preview {
            repo,
            branch,
            groups,
        } => cmd_run(config_path, &repo, &branch, &groups, PipelineMode::Preview, &formatter).await,
        Commands::Commit {
            repo,
            branch,
            message,
            groups,
        } => {
            let mode = PipelineMode::Commit { message };
            cmd_run(config_path, &repo, &branch, &groups, mode, &formatter).await
        }
        Commands::Branches { repo } => cmd_branches(&repo, &formatter).await,
    }
}

/// Run the HTTP server.
async fn cmd_serve(config: PipelineConfig, settings: Settings) -> Result<()> {
    debug!("Runtime settings: {settings:?}");
    info!(
        "Loaded {} group(s) for {}",
        config.groups.len(),
        settings.source.full_name()
    );

    let github = GitHubClient::new(
        &settings.github_token,
        &settings.source.owner,
        &settings.source.repo,
    )?;
    let state = AppState::new(build_pipeline(config, &settings), Arc::new(github));
    let router = build_router(
        state,
        Some(&settings.frontend_dir),
        Duration::from_secs(settings.request_timeout_secs),
    );

    let address = settings.bind_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!("Server starting on {address}");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Validate configuration.
fn cmd_validate(
    config_path: Option<&Path>,
    show_warnings: bool,
    formatter: &OutputFormatter,
) -> Result<()> {
    let config = load_config(config_path)?;
    let result = ConfigValidator::new().validate(&config)?;
    emit(&formatter.format_validation(&config, &result, show_warnings));
    Ok(())
}

/// Run the pipeline once from the terminal.
async fn cmd_run(
    config_path: Option<&Path>,
    repo: &RepoArgs,
    branch: &str,
    groups: &[String],
    mode: PipelineMode,
    formatter: &OutputFormatter,
) -> Result<()> {
    let config = load_config(config_path)?;
    let pipeline = build_pipeline(config, &repo.settings());

    let results = pipeline.run_many(branch, groups, &mode).await?;
    emit(&formatter.format_results(branch, &results));

    let failed = results.values().filter(|r| r.is_failed()).count();
    if failed > 0 {
        return Err(HelmPipelineError::internal(format!(
            "{failed} of {} group(s) failed",
            results.len()
        )));
    }
    Ok(())
}

/// List source branches.
async fn cmd_branches(repo: &RepoArgs, formatter: &OutputFormatter) -> Result<()> {
    let github = GitHubClient::new(&repo.github_token, &repo.repo_owner, &repo.repo_name)?;
    let branches = github.list_branches().await?;
    emit(&formatter.format_branches(&branches));
    Ok(())
}

/// Loads group configuration from the file or the environment.
fn load_config(config_path: Option<&Path>) -> Result<PipelineConfig> {
    let vars: HashMap<String, String> = std::env::vars().collect();
    ConfigParser::new().load(config_path, &vars)
}

/// Wires the production collaborators into a pipeline.
fn build_pipeline(config: PipelineConfig, settings: &Settings) -> Pipeline {
    let accessor = GitCli::new(&settings.github_token, &settings.work_dir)
        .with_binary(&settings.git_bin)
        .with_author(&settings.author_name, &settings.author_email);
    let renderer = HelmRenderer::new(&settings.helm_bin);

    Pipeline::new(
        Arc::new(config),
        settings.source.clone(),
        Arc::new(accessor),
        Arc::new(renderer),
    )
}

/// Writes command output to stdout.
fn emit(output: &str) {
    let mut stdout = std::io::stdout().lock();
    if let Err(e) = stdout.write_all(output.as_bytes()).and_then(|()| stdout.flush()) {
        debug!("Failed to write output: {e}");
    }
}

/// Resolves when the process receives Ctrl+C.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
