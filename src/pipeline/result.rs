//! Per-group pipeline outcomes.

use serde::Serialize;

use crate::extractor::{KeyDiff, KeyTree};

/// Message reported when a commit changed the output file.
pub const COMMITTED_MESSAGE: &str = "Changes committed and pushed successfully";

/// Message reported when the rendered output matched the existing file.
pub const UNCHANGED_MESSAGE: &str =
    "No changes detected. The generated content is identical to the existing file.";

/// What a run does after rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineMode {
    /// Report the key skeleton or key diff without writing anything.
    Preview,
    /// Write, commit, and push the rendered output.
    Commit {
        /// Commit message supplied by the caller.
        message: String,
    },
}

impl PipelineMode {
    /// Returns a short name for logging.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Preview => "preview",
            Self::Commit { .. } => "commit",
        }
    }
}

/// Outcome of running one group.
///
/// Serialized without a tag, so each variant is recognised by its fields.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum PipelineResult {
    /// The group failed; the message carries the cause.
    Failed {
        /// Human readable error.
        error: String,
    },
    /// Preview of a target file that does not exist yet.
    NewFile {
        /// Always true for this variant.
        #[serde(rename = "allNew")]
        all_new: bool,
        /// Key skeleton of the rendered output.
        keys: KeyTree,
    },
    /// Preview against an existing target file.
    Changes {
        /// Changed key paths.
        diff: KeyDiff,
    },
    /// Commit outcome.
    Committed {
        /// Human readable outcome.
        message: String,
        /// Whether the written bytes differ from what was there before.
        #[serde(rename = "contentChanged")]
        content_changed: bool,
    },
}

impl PipelineResult {
    /// Creates a preview result for a new target file.
    #[must_use]
    pub const fn new_file(keys: KeyTree) -> Self {
        Self::NewFile { all_new: true, keys }
    }

    /// Creates a commit result.
    #[must_use]
    pub fn committed(content_changed: bool) -> Self {
        let message = if content_changed {
            COMMITTED_MESSAGE
        } else {
            UNCHANGED_MESSAGE
        };
        Self::Committed {
            message: message.to_string(),
            content_changed,
        }
    }

    /// Returns the error message if the group failed.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Failed { error } => Some(error),
            _ => None,
        }
    }

    /// Returns true if the group failed.
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}
