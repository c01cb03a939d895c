//! Structural diff between two YAML documents.
//!
//! The diff reports dotted key paths with the kind of change only. Values
//! are compared but never copied into the result.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::error::{HelmPipelineError, PipelineError, Result};

use super::keys::join_path;
use super::tree::{Mapping, YamlNode, document_key, parse_stream};

/// Kind of change at a key path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// Present in the new document only.
    Added,
    /// Present in both with different content or type.
    Changed,
    /// Present in the old document only.
    Removed,
}

/// The set of changed key paths, each appearing once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyDiff(BTreeMap<String, ChangeKind>);

impl KeyDiff {
    /// Returns the change recorded for a path.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<ChangeKind> {
        self.0.get(path).copied()
    }

    /// Returns true if nothing changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of changed paths.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns the number of paths with the given kind of change.
    #[must_use]
    pub fn count(&self, kind: ChangeKind) -> usize {
        self.0.values().filter(|k| **k == kind).count()
    }

    /// Iterates over the changes in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ChangeKind)> {
        self.0.iter()
    }

    /// Returns the paths with the given kind of change, in path order.
    #[must_use]
    pub fn paths(&self, kind: ChangeKind) -> Vec<&str> {
        self.0
            .iter()
            .filter(|(_, k)| **k == kind)
            .map(|(p, _)| p.as_str())
            .collect()
    }
}

/// Compares two parsed mappings.
#[must_use]
pub fn diff_mappings(old: &Mapping, new: &Mapping) -> KeyDiff {
    let mut changes = BTreeMap::new();
    walk(old, new, "", &mut changes);
    KeyDiff(changes)
}

fn walk(old: &Mapping, new: &Mapping, prefix: &str, changes: &mut BTreeMap<String, ChangeKind>) {
    for (key, new_value) in new {
        let path = join_path(prefix, key);

        let Some(old_value) = old.get(key) else {
            changes.insert(path, ChangeKind::Added);
            continue;
        };

        match (old_value, new_value) {
            (YamlNode::Mapping(old_nested), YamlNode::Mapping(new_nested)) => {
                walk(old_nested, new_nested, &path, changes);
            }
            _ => {
                if !old_value.equivalent(new_value) {
                    changes.insert(path, ChangeKind::Changed);
                }
            }
        }
    }

    for key in old.keys() {
        if !new.contains_key(key) {
            changes.insert(join_path(prefix, key), ChangeKind::Removed);
        }
    }
}

/// Compares two document streams.
///
/// Documents are aligned by content first, so inserting or removing one
/// document yields one entry instead of shifting every later position.
/// Unaligned documents between the same anchors are paired in order and
/// diffed under the new document's key.
#[must_use]
pub fn diff_streams(old: &[Mapping], new: &[Mapping]) -> KeyDiff {
    let mut changes = BTreeMap::new();
    let mut cursor = (0, 0);

    for (old_anchor, new_anchor) in align(old, new) {
        let old_gap = cursor.0..old_anchor;
        let new_gap = cursor.1..new_anchor;
        let paired = old_gap.len().min(new_gap.len());

        for (o, n) in old_gap.clone().zip(new_gap.clone()) {
            walk(&old[o], &new[n], &document_key(n), &mut changes);
        }
        for n in new_gap.skip(paired) {
            record(&mut changes, document_key(n), ChangeKind::Added);
        }
        for o in old_gap.skip(paired) {
            record(&mut changes, document_key(o), ChangeKind::Removed);
        }

        cursor = (old_anchor + 1, new_anchor + 1);
    }

    KeyDiff(changes)
}

/// Returns index pairs of equivalent documents along a longest common
/// subsequence, terminated by `(old.len(), new.len())`.
fn align(old: &[Mapping], new: &[Mapping]) -> Vec<(usize, usize)> {
    let (n, m) = (old.len(), new.len());
    let mut table = vec![vec![0usize; m + 1]; n + 1];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            table[i][j] = if same_document(&old[i], &new[j]) {
                table[i + 1][j + 1] + 1
            } else {
                table[i + 1][j].max(table[i][j + 1])
            };
        }
    }

    let mut anchors = Vec::with_capacity(table[0][0] + 1);
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if same_document(&old[i], &new[j]) {
            anchors.push((i, j));
            i += 1;
            j += 1;
        } else if table[i + 1][j] >= table[i][j + 1] {
            i += 1;
        } else {
            j += 1;
        }
    }
    anchors.push((n, m));
    anchors
}

fn same_document(a: &Mapping, b: &Mapping) -> bool {
    a.len() == b.len() && a.iter().all(|(k, v)| b.get(k).is_some_and(|other| v.equivalent(other)))
}

/// A slot that is both added and removed held something else before.
fn record(changes: &mut BTreeMap<String, ChangeKind>, path: String, kind: ChangeKind) {
    let kind = match changes.get(&path) {
        Some(existing) if *existing != kind => ChangeKind::Changed,
        _ => kind,
    };
    changes.insert(path, kind);
}

/// Compares two YAML documents and returns the changed key paths.
///
/// Single documents are compared directly. When either side holds several
/// documents the streams are compared with [`diff_streams`].
///
/// # Errors
///
/// Returns a parse error naming the side that is not YAML with a mapping at
/// the top level.
pub fn compare_yaml(old: &[u8], new: &[u8]) -> Result<KeyDiff> {
    let mut old_docs = parse_stream(old).map_err(|e| side_error("existing", &e))?;
    let mut new_docs = parse_stream(new).map_err(|e| side_error("rendered", &e))?;

    let diff = if old_docs.len() <= 1 && new_docs.len() <= 1 {
        diff_mappings(
            &old_docs.pop().unwrap_or_default(),
            &new_docs.pop().unwrap_or_default(),
        )
    } else {
        diff_streams(&old_docs, &new_docs)
    };
    debug!(
        "Computed diff: {} added, {} changed, {} removed",
        diff.count(ChangeKind::Added),
        diff.count(ChangeKind::Changed),
        diff.count(ChangeKind::Removed)
    );
    Ok(diff)
}

fn side_error(side: &str, err: &HelmPipelineError) -> HelmPipelineError {
    match err {
        HelmPipelineError::Pipeline(PipelineError::Parse { message }) => {
            HelmPipelineError::Pipeline(PipelineError::parse(format!("{side} document: {message}")))
        }
        other => HelmPipelineError::Pipeline(PipelineError::parse(format!("{side} document: {other}"))),
    }
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Added => "added",
            Self::Changed => "changed",
            Self::Removed => "removed",
        };
        write!(f, "{s}")
    }
}
