// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![warn(dead_code)]                   // Unused code is reported
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![warn(unused_imports)]              // Unused imports are reported
#![deny(unused_variables)]            // Unused variables are forbidden
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # Helm Pipeline
//!
//! Renders a Helm chart against layered values files, previews which
//! configuration keys would change without ever exposing their values, and
//! commits the rendered YAML to a target repository.
//!
//! ## Overview
//!
//! Work is organised in **groups**. A group pairs one or more values files
//! (each living in its own repository and branch) with one output target.
//! For a chosen chart branch, every selected group is:
//!
//! 1. **Rendered**: the chart and the values files are checked out and
//!    passed to `helm template`
//! 2. **Previewed**: the output is reduced to a redacted key skeleton, or
//!    diffed key-by-key against the file already in the output repository
//! 3. **Committed** (optionally): the output is written, committed, and pushed
//!
//! A failing group never stops the others; its error is reported alongside
//! the successful results.
//!
//! ## Modules
//!
//! - [`config`]: Group configuration loading, validation, and runtime settings
//! - [`extractor`]: Key skeleton extraction and structural YAML diff
//! - [`helm`]: Chart rendering
//! - [`git`]: Repository checkout, commit, and push
//! - [`github`]: GitHub REST API client
//! - [`pipeline`]: Per-group orchestration
//! - [`api`]: HTTP request layer
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```yaml
//! groups:
//!   - name: prod
//!     values_sources:
//!       - owner: acme
//!         repo: helm-values
//!         path: prod/values.yaml
//!     output_target:
//!       owner: acme
//!       repo: manifests
//!       path: deploy/prod
//!       filename: app.yaml
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod extractor;
pub mod git;
pub mod github;
pub mod helm;
pub mod pipeline;

// ============================================================================
// Re-exports
// ============================================================================

pub use api::{AppState, build_router};
pub use cli::{Cli, Commands, OutputFormatter};
pub use config::{ConfigParser, ConfigValidator, PipelineConfig, Settings};
pub use error::{HelmPipelineError, Result};
pub use extractor::{KeyDiff, KeyTree, compare_yaml, extract_keys};
pub use git::{GitCli, RepositoryAccessor};
pub use github::{GitHubApi, GitHubClient};
pub use helm::{HelmRenderer, Renderer};
pub use pipeline::{Pipeline, PipelineMode, PipelineResult};
