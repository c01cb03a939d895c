//! Structural inspection of rendered YAML.
//!
//! This module never returns values from the documents it reads:
//! - [`extract_keys`] builds a redacted key skeleton
//! - [`compare_yaml`] reports which key paths were added, changed, or removed

mod diff;
mod keys;
mod tree;

pub use diff::{ChangeKind, KeyDiff, compare_yaml, diff_mappings, diff_streams};
pub use keys::{KeyNode, KeyTree, SCALAR_MARKER, SEQUENCE_MARKER, extract_keys};
pub use tree::{Mapping, Scalar, YamlNode, parse_documents, parse_root, parse_stream};
