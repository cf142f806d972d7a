//! Import tables: local names bound to paths in other modules.
//!
//! Entries come from two places: `import`/`from` statements in the module
//! source, and the build orchestrator, which knows which version of each
//! dependency a library was built against. Orchestrator entries win.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::path::{NodePath, Version};

/// The target of an import: a fully-qualified path, optionally pinned to a
/// version of the module that contains it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportTarget {
    pub path: NodePath,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[serde(with = "optional_version")]
    pub version: Option<Version>,
}

impl ImportTarget {
    pub fn new(path: NodePath) -> Self {
        Self {
            path,
            version: None,
        }
    }

    pub fn pinned(path: NodePath, version: Version) -> Self {
        Self {
            path,
            version: Some(version),
        }
    }
}

/// Local name → import target, plus wildcard (`from m import *`) imports.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportTable {
    #[serde(default)]
    names: BTreeMap<String, ImportTarget>,
    #[serde(default)]
    globs: Vec<ImportTarget>,
}

impl ImportTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `local` to `target`, returning the previous binding if any.
    pub fn insert(&mut self, local: impl Into<String>, target: ImportTarget) -> Option<ImportTarget> {
        self.names.insert(local.into(), target)
    }

    /// Record a wildcard import of every top-level name in `target`'s module.
    pub fn insert_glob(&mut self, target: ImportTarget) {
        if !self.globs.contains(&target) {
            self.globs.push(target);
        }
    }

    pub fn get(&self, local: &str) -> Option<&ImportTarget> {
        self.names.get(local)
    }

    pub fn names(&self) -> impl Iterator<Item = (&str, &ImportTarget)> {
        self.names.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Wildcard imports in declaration order.
    pub fn globs(&self) -> &[ImportTarget] {
        &self.globs
    }

    pub fn len(&self) -> usize {
        self.names.len() + self.globs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty() && self.globs.is_empty()
    }

    /// Layer `overrides` on top of this table. Named entries in `overrides`
    /// replace ours; a versionless entry of ours whose path matches an
    /// override's path picks up the override's version pin.
    pub fn merged_with(&self, overrides: &ImportTable) -> ImportTable {
        let mut out = self.clone();
        for (local, target) in &overrides.names {
            out.names.insert(local.clone(), target.clone());
        }
        for glob in &overrides.globs {
            out.insert_glob(glob.clone());
        }
        for target in out.names.values_mut().chain(out.globs.iter_mut()) {
            if target.version.is_none() {
                if let Some(pin) = overrides
                    .names
                    .values()
                    .filter(|o| o.version.is_some())
                    .find(|o| target.path.starts_with(&o.path) || o.path.starts_with(&target.path))
                {
                    target.version = pin.version.clone();
                }
            }
        }
        out
    }
}

mod optional_version {
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::path::{parse_version, Version};

    pub fn serialize<S: Serializer>(
        version: &Option<Version>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match version {
            Some(v) => serializer.collect_str(v),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Version>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        raw.map(|s| parse_version(&s).map_err(serde::de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> NodePath {
        NodePath::parse(s).unwrap()
    }

    #[test]
    fn insert_and_lookup() {
        let mut table = ImportTable::new();
        assert!(table.is_empty());
        table.insert("T", ImportTarget::new(p("lib.alg.Thm")));
        table.insert_glob(ImportTarget::new(p("lib.alg")));
        table.insert_glob(ImportTarget::new(p("lib.alg")));
        assert_eq!(table.len(), 2);
        assert_eq!(table.get("T").unwrap().path, p("lib.alg.Thm"));
        assert!(table.get("U").is_none());
    }

    #[test]
    fn overrides_win_and_pin_versions() {
        let mut source = ImportTable::new();
        source.insert("T", ImportTarget::new(p("lib.alg.Thm")));
        source.insert("L", ImportTarget::new(p("lib.top.Lem")));

        let mut caller = ImportTable::new();
        caller.insert("L", ImportTarget::pinned(p("lib.top2.Lem"), Version::new(2, 0, 0)));
        caller.insert("alg", ImportTarget::pinned(p("lib.alg"), Version::new(1, 3, 0)));

        let merged = source.merged_with(&caller);
        assert_eq!(merged.get("L").unwrap().path, p("lib.top2.Lem"));
        assert_eq!(
            merged.get("T").unwrap().version,
            Some(Version::new(1, 3, 0))
        );
    }

    #[test]
    fn toml_round_trip() {
        let text = r#"
            [names.T]
            path = "lib.alg.Thm"
            version = "v1.0.0"
        "#;
        let table: ImportTable = toml::from_str(text).unwrap();
        assert_eq!(table.get("T").unwrap().version, Some(Version::new(1, 0, 0)));
    }
}
