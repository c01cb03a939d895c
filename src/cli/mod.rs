//! CLI module for the Helm pipeline.
//!
//! This module provides the command-line interface for serving the HTTP
//! API and for running the pipeline from a terminal.

mod commands;
mod output;

pub use commands::{Cli, Commands, OutputFormat, RepoArgs, ServeArgs};
pub use output::OutputFormatter;
