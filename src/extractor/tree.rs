//! Typed YAML tree used by key extraction and diffing.
//!
//! Rendered output is parsed into [`YamlNode`] so the extraction and diff
//! walks can match exhaustively on mapping, sequence, scalar, and null.

use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::debug;

use crate::error::{HelmPipelineError, PipelineError, Result};

/// A mapping level of a parsed document.
pub type Mapping = BTreeMap<String, YamlNode>;

/// A parsed YAML value.
#[derive(Debug, Clone, PartialEq)]
pub enum YamlNode {
    /// A mapping with string keys.
    Mapping(Mapping),
    /// An ordered sequence.
    Sequence(Vec<YamlNode>),
    /// A scalar value.
    Scalar(Scalar),
    /// An explicit or implicit null.
    Null,
}

/// A YAML scalar.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    /// Boolean.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Unsigned integer beyond `i64::MAX`.
    UInt(u64),
    /// Floating point number.
    Float(f64),
    /// String.
    String(String),
}

/// Largest float magnitude that still has an exact integer representation.
const MAX_EXACT_FLOAT: f64 = 9_007_199_254_740_992.0;

impl Scalar {
    /// Returns the canonical form used for equality.
    ///
    /// Numbers compare by value, so `1` and `1.0` are equal; a string never
    /// equals a number or boolean with the same spelling.
    #[must_use]
    pub fn canonical(&self) -> String {
        match self {
            Self::Bool(b) => format!("b:{b}"),
            Self::Int(i) => format!("n:{i}"),
            Self::UInt(u) => format!("n:{u}"),
            Self::Float(f) => {
                if f.is_finite() && f.fract() == 0.0 && f.abs() <= MAX_EXACT_FLOAT {
                    #[allow(clippy::cast_possible_truncation)]
                    let whole = *f as i64;
                    format!("n:{whole}")
                } else {
                    format!("n:{f}")
                }
            }
            Self::String(s) => format!("s:{s}"),
        }
    }
}

impl YamlNode {
    /// Converts a `serde_yaml` value, unwrapping tags and stringifying
    /// scalar mapping keys.
    ///
    /// # Errors
    ///
    /// Returns a parse error if a mapping key is itself a mapping or sequence.
    pub fn from_value(value: serde_yaml::Value) -> Result<Self> {
        use serde_yaml::Value;

        Ok(match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Scalar(Scalar::Bool(b)),
            Value::Number(n) => Self::Scalar(number_scalar(&n)),
            Value::String(s) => Self::Scalar(Scalar::String(s)),
            Value::Sequence(items) => Self::Sequence(
                items
                    .into_iter()
                    .map(Self::from_value)
                    .collect::<Result<Vec<_>>>()?,
            ),
            Value::Mapping(entries) => {
                let mut mapping = Mapping::new();
                for (key, value) in entries {
                    mapping.insert(mapping_key(key)?, Self::from_value(value)?);
                }
                Self::Mapping(mapping)
            }
            Value::Tagged(tagged) => Self::from_value(tagged.value)?,
        })
    }

    /// Returns true if the two nodes hold equal content.
    ///
    /// Sequences are order sensitive; scalars compare by canonical form.
    #[must_use]
    pub fn equivalent(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Mapping(a), Self::Mapping(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .all(|(k, v)| b.get(k).is_some_and(|other| v.equivalent(other)))
            }
            (Self::Sequence(a), Self::Sequence(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.equivalent(y))
            }
            (Self::Scalar(a), Self::Scalar(b)) => a.canonical() == b.canonical(),
            (Self::Null, Self::Null) => true,
            _ => false,
        }
    }

    /// Returns the mapping if this node is one.
    #[must_use]
    pub const fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Self::Mapping(m) => Some(m),
            _ => None,
        }
    }

    /// Returns the string if this node is a string scalar.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Scalar(Scalar::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Returns a short type name for diagnostics.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Mapping(_) => "mapping",
            Self::Sequence(_) => "sequence",
            Self::Scalar(_) => "scalar",
            Self::Null => "null",
        }
    }
}

fn number_scalar(n: &serde_yaml::Number) -> Scalar {
    if let Some(i) = n.as_i64() {
        Scalar::Int(i)
    } else if let Some(u) = n.as_u64() {
        Scalar::UInt(u)
    } else {
        Scalar::Float(n.as_f64().unwrap_or(f64::NAN))
    }
}

fn mapping_key(key: serde_yaml::Value) -> Result<String> {
    use serde_yaml::Value;

    match key {
        Value::String(s) => Ok(s),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(String::from("null")),
        Value::Tagged(tagged) => mapping_key(tagged.value),
        Value::Sequence(_) | Value::Mapping(_) => Err(HelmPipelineError::Pipeline(
            PipelineError::parse("complex mapping keys are not supported"),
        )),
    }
}

/// Parses every document in a YAML stream, skipping empty documents.
///
/// # Errors
///
/// Returns a parse error if any document is malformed.
pub fn parse_documents(bytes: &[u8]) -> Result<Vec<YamlNode>> {
    let mut documents = Vec::new();

    for document in serde_yaml::Deserializer::from_slice(bytes) {
        let value = serde_yaml::Value::deserialize(document)
            .map_err(|e| HelmPipelineError::Pipeline(PipelineError::parse(e.to_string())))?;
        match YamlNode::from_value(value)? {
            YamlNode::Null => {}
            node => documents.push(node),
        }
    }

    Ok(documents)
}

/// Returns the key of the document at `index` in a stream.
///
/// Keys are positional only; nothing inside a document is read.
pub(crate) fn document_key(index: usize) -> String {
    format!("document-{}", index + 1)
}

/// Parses a YAML stream into its top-level mappings, in stream order.
///
/// # Errors
///
/// Returns a parse error if the input is not valid YAML or a document is not
/// a mapping.
pub fn parse_stream(bytes: &[u8]) -> Result<Vec<Mapping>> {
    parse_documents(bytes)?
        .into_iter()
        .enumerate()
        .map(|(index, document)| match document {
            YamlNode::Mapping(m) => Ok(m),
            other => Err(HelmPipelineError::Pipeline(PipelineError::parse(format!(
                "document {} is a {}, expected a mapping at the top level",
                index + 1,
                other.type_name()
            )))),
        })
        .collect()
}

/// Parses a YAML stream into one top-level mapping.
///
/// A single document is used as-is. Several documents are keyed by position
/// (`document-1`, `document-2`, ...). An empty stream yields an empty mapping.
///
/// # Errors
///
/// Returns a parse error if the input is not valid YAML or a document is not
/// a mapping.
pub fn parse_root(bytes: &[u8]) -> Result<Mapping> {
    let mut documents = parse_stream(bytes)?;
    if documents.len() <= 1 {
        return Ok(documents.pop().unwrap_or_default());
    }

    debug!("Combining {} YAML documents by position", documents.len());
    Ok(documents
        .into_iter()
        .enumerate()
        .map(|(index, mapping)| (document_key(index), YamlNode::Mapping(mapping)))
        .collect())
}
