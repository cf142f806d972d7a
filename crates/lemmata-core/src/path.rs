//! Dotted library paths, node identities, and version tags.
//!
//! Every node is addressed by the module path it lives in followed by the
//! names of its enclosing blocks and its own name, e.g.
//! `algebra.groups.Thm.Pf.C1`. Paths are compared segment-wise, so the
//! ordering of a `BTreeMap<NodePath, _>` is stable across runs.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A semantic version tag of a module or library.
pub type Version = semver::Version;

/// Errors produced while parsing paths or version tags.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("empty path")]
    Empty,

    #[error("invalid segment '{segment}' in path '{path}'")]
    InvalidSegment { path: String, segment: String },

    #[error("invalid version tag '{tag}': {reason}")]
    InvalidVersion { tag: String, reason: String },
}

/// Parse a version tag. Accepts both `1.2.3` and the release-tag form `v1.2.3`.
pub fn parse_version(tag: &str) -> Result<Version, PathError> {
    let trimmed = tag.trim();
    let bare = trimmed.strip_prefix('v').unwrap_or(trimmed);
    Version::parse(bare).map_err(|e| PathError::InvalidVersion {
        tag: tag.to_string(),
        reason: e.to_string(),
    })
}

/// Whether `s` is a legal path segment: an identifier starting with a letter
/// or underscore, followed by letters, digits, or underscores.
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// A fully-qualified, non-empty dotted path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NodePath(Vec<String>);

impl NodePath {
    /// Parse a dotted path such as `a.b.Thm`.
    pub fn parse(s: &str) -> Result<Self, PathError> {
        if s.is_empty() {
            return Err(PathError::Empty);
        }
        let segments: Vec<String> = s.split('.').map(str::to_string).collect();
        for segment in &segments {
            if !is_identifier(segment) {
                return Err(PathError::InvalidSegment {
                    path: s.to_string(),
                    segment: segment.clone(),
                });
            }
        }
        Ok(Self(segments))
    }

    /// Build a path from already-validated segments.
    ///
    /// Returns `None` if `segments` is empty or any segment is not an identifier.
    pub fn from_segments<I, S>(segments: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() || !segments.iter().all(|s| is_identifier(s)) {
            return None;
        }
        Some(Self(segments))
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false: paths have at least one segment.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The last segment.
    pub fn name(&self) -> &str {
        self.0.last().map(String::as_str).unwrap_or_default()
    }

    /// The path with its last segment removed, or `None` for a single-segment path.
    pub fn parent(&self) -> Option<NodePath> {
        if self.0.len() <= 1 {
            None
        } else {
            Some(Self(self.0[..self.0.len() - 1].to_vec()))
        }
    }

    /// Append a single identifier segment.
    pub fn child(&self, name: &str) -> NodePath {
        let mut segments = self.0.clone();
        segments.push(name.to_string());
        Self(segments)
    }

    /// Append all segments of `rest`.
    pub fn join(&self, rest: &NodePath) -> NodePath {
        let mut segments = self.0.clone();
        segments.extend(rest.0.iter().cloned());
        Self(segments)
    }

    /// Whether `prefix` is a (non-strict) segment-wise prefix of this path.
    pub fn starts_with(&self, prefix: &NodePath) -> bool {
        self.0.len() >= prefix.0.len() && self.0[..prefix.0.len()] == prefix.0[..]
    }

    /// The segments after `prefix`, if `prefix` is a strict prefix.
    pub fn strip_prefix(&self, prefix: &NodePath) -> Option<NodePath> {
        if self.0.len() > prefix.0.len() && self.starts_with(prefix) {
            Some(Self(self.0[prefix.0.len()..].to_vec()))
        } else {
            None
        }
    }

    /// The first `n` segments, or `None` if `n` is zero or exceeds the length.
    pub fn prefix(&self, n: usize) -> Option<NodePath> {
        if n == 0 || n > self.0.len() {
            None
        } else {
            Some(Self(self.0[..n].to_vec()))
        }
    }

    /// Drop the first `n` segments. Returns `None` if nothing would remain.
    pub fn skip(&self, n: usize) -> Option<NodePath> {
        if n >= self.0.len() {
            None
        } else {
            Some(Self(self.0[n..].to_vec()))
        }
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

impl FromStr for NodePath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for NodePath {
    type Error = PathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<NodePath> for String {
    fn from(path: NodePath) -> Self {
        path.to_string()
    }
}

/// The identity of a node across versions: its path plus the version of the
/// module it was compiled from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeRef {
    pub path: NodePath,
    #[serde(with = "version_tag")]
    pub version: Version,
}

impl NodeRef {
    pub fn new(path: NodePath, version: Version) -> Self {
        Self { path, version }
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.path, self.version)
    }
}

/// Serde adapter that writes plain semver strings and reads both `1.2.3`
/// and `v1.2.3`.
pub mod version_tag {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::{parse_version, Version};

    pub fn serialize<S: Serializer>(version: &Version, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(version)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Version, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_version(&raw).map_err(serde::de::Error::custom)
    }
}
