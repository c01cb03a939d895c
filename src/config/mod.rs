//! Configuration module for the Helm pipeline.
//!
//! This module handles all configuration-related functionality:
//! - Parsing group definitions from a file or the environment
//! - Validation of group invariants and defaulting
//! - Runtime settings assembled once at startup

mod parser;
mod settings;
mod spec;
mod validator;

pub use parser::{
    CONFIG_GROUPS_VAR, ConfigParser, DEFAULT_CONFIG_FILE, parse_output_target, parse_values_source,
};
pub use settings::{
    DEFAULT_AUTHOR_EMAIL, DEFAULT_AUTHOR_NAME, DEFAULT_HOST, DEFAULT_PORT, DEFAULT_REQUEST_TIMEOUT_SECS,
    Settings, SourceRepository,
};
pub use spec::{ConfigGroup, DEFAULT_BRANCH, DEFAULT_FILENAME, OutputTarget, PipelineConfig, ValuesSource};
pub use validator::{ConfigValidator, ValidationResult};
