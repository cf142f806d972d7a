//! Author-supplied change logs.
//!
//! A change log acknowledges that a node disappears, moves, or is
//! retargeted in a new library version. It is read from TOML:
//!
//! ```toml
//! [[entry]]
//! path = "alg.groups.Thm.C"
//! version = "v2.0.0"
//! justification = "Merged into Thm.C2"
//! replacement = "alg.groups.Thm.C2"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::path::{NodePath, Version};

/// Errors while reading or writing change logs.
#[derive(Debug, Error)]
pub enum ChangeLogError {
    #[error("failed to read change log {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid change log: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize change log: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("change log entry for {path} has an empty justification")]
    EmptyJustification { path: NodePath },
}

/// One acknowledged change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeLogEntry {
    /// The node that disappears or whose expansion is retargeted.
    pub path: NodePath,
    /// The library version this entry belongs to.
    #[serde(with = "crate::path::version_tag")]
    pub version: Version,
    pub justification: String,
    /// Where the node now lives, if it moved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replacement: Option<NodePath>,
}

impl ChangeLogEntry {
    pub fn new(path: NodePath, version: Version, justification: impl Into<String>) -> Self {
        Self {
            path,
            version,
            justification: justification.into(),
            replacement: None,
        }
    }

    pub fn with_replacement(mut self, replacement: NodePath) -> Self {
        self.replacement = Some(replacement);
        self
    }
}

/// The change log of a library, possibly spanning several versions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeLog {
    #[serde(rename = "entry", default)]
    entries: Vec<ChangeLogEntry>,
}

impl ChangeLog {
    pub fn new(entries: Vec<ChangeLogEntry>) -> Self {
        Self { entries }
    }

    /// Parse a change log from TOML text.
    pub fn parse_toml(text: &str) -> Result<Self, ChangeLogError> {
        let log: ChangeLog = toml::from_str(text)?;
        if let Some(entry) = log
            .entries
            .iter()
            .find(|e| e.justification.trim().is_empty())
        {
            return Err(ChangeLogError::EmptyJustification {
                path: entry.path.clone(),
            });
        }
        Ok(log)
    }

    /// Load a change log from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ChangeLogError> {
        let text = std::fs::read_to_string(path).map_err(|source| ChangeLogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse_toml(&text)
    }

    pub fn to_toml(&self) -> Result<String, ChangeLogError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn entries(&self) -> &[ChangeLogEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn push(&mut self, entry: ChangeLogEntry) {
        self.entries.push(entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[[entry]]
path = "alg.Thm.C"
version = "v2.0.0"
justification = "Superseded by Thm2"

[[entry]]
path = "alg.Pf"
version = "1.1.0"
justification = "Old release"
replacement = "alg.Pf2"
"#;

    #[test]
    fn parse_entries() {
        let log = ChangeLog::parse_toml(SAMPLE).unwrap();
        assert_eq!(log.entries().len(), 2);
        let first = &log.entries()[0];
        assert_eq!(first.path, NodePath::parse("alg.Thm.C").unwrap());
        assert_eq!(first.version, Version::new(2, 0, 0));
        let moved = &log.entries()[1];
        assert_eq!(moved.replacement.as_ref().unwrap().to_string(), "alg.Pf2");
    }

    #[test]
    fn empty_log() {
        let log = ChangeLog::parse_toml("").unwrap();
        assert!(log.is_empty());
    }

    #[test]
    fn rejects_blank_justification() {
        let text = r#"
[[entry]]
path = "alg.Thm.C"
version = "2.0.0"
justification = "  "
"#;
        assert!(matches!(
            ChangeLog::parse_toml(text),
            Err(ChangeLogError::EmptyJustification { .. })
        ));
    }

    #[test]
    fn rejects_bad_path() {
        let text = r#"
[[entry]]
path = "alg..C"
version = "2.0.0"
justification = "x"
"#;
        assert!(matches!(ChangeLog::parse_toml(text), Err(ChangeLogError::Parse(_))));
    }

    #[test]
    fn toml_round_trip() {
        let log = ChangeLog::parse_toml(SAMPLE).unwrap();
        let text = log.to_toml().unwrap();
        assert_eq!(ChangeLog::parse_toml(&text).unwrap(), log);
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("changes.toml");
        std::fs::write(&file, SAMPLE).unwrap();
        let log = ChangeLog::load(&file).unwrap();
        assert_eq!(log.entries().len(), 2);
        assert!(matches!(
            ChangeLog::load(&dir.path().join("missing.toml")),
            Err(ChangeLogError::Io { .. })
        ));
    }
}
