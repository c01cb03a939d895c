//! Key skeleton extraction.
//!
//! A [`KeyTree`] keeps the keys of a document and replaces every value with a
//! presence marker. Nothing from a scalar or sequence element is ever copied
//! into it.

use serde::ser::{Serialize, Serializer};
use std::collections::BTreeMap;

use crate::error::Result;

use super::tree::{Mapping, YamlNode, parse_root};

/// Marker stored for a sequence value.
pub const SEQUENCE_MARKER: &str = "[...]";

/// Marker stored for a scalar or null value.
pub const SCALAR_MARKER: &str = "...";

/// A node of the key skeleton.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyNode {
    /// A nested mapping.
    Nested(KeyTree),
    /// A sequence is present.
    Sequence,
    /// A scalar or null is present.
    Scalar,
}

/// The redacted structural shape of a YAML document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyTree(BTreeMap<String, KeyNode>);

impl KeyTree {
    /// Builds the skeleton of a parsed mapping.
    #[must_use]
    pub fn from_mapping(mapping: &Mapping) -> Self {
        Self(
            mapping
                .iter()
                .map(|(key, value)| {
                    let node = match value {
                        YamlNode::Mapping(nested) => KeyNode::Nested(Self::from_mapping(nested)),
                        YamlNode::Sequence(_) => KeyNode::Sequence,
                        YamlNode::Scalar(_) | YamlNode::Null => KeyNode::Scalar,
                    };
                    (key.clone(), node)
                })
                .collect(),
        )
    }

    /// Returns the node stored under a key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&KeyNode> {
        self.0.get(key)
    }

    /// Returns the number of top-level keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the tree has no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the top-level entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &KeyNode)> {
        self.0.iter()
    }

    /// Returns the dotted path of every leaf, in key order.
    #[must_use]
    pub fn leaf_paths(&self) -> Vec<String> {
        let mut paths = Vec::new();
        self.collect_paths("", &mut paths);
        paths
    }

    fn collect_paths(&self, prefix: &str, paths: &mut Vec<String>) {
        for (key, node) in &self.0 {
            let path = join_path(prefix, key);
            match node {
                KeyNode::Nested(tree) if !tree.is_empty() => tree.collect_paths(&path, paths),
                _ => paths.push(path),
            }
        }
    }
}

impl Serialize for KeyNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Nested(tree) => tree.serialize(serializer),
            Self::Sequence => serializer.serialize_str(SEQUENCE_MARKER),
            Self::Scalar => serializer.serialize_str(SCALAR_MARKER),
        }
    }
}

impl Serialize for KeyTree {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

/// Joins a dotted path prefix and a key.
pub(crate) fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

/// Extracts the key skeleton of a YAML document.
///
/// # Errors
///
/// Returns a parse error if the bytes are not YAML with a mapping at the top
/// level.
pub fn extract_keys(yaml: &[u8]) -> Result<KeyTree> {
    let root = parse_root(yaml)?;
    Ok(KeyTree::from_mapping(&root))
}
