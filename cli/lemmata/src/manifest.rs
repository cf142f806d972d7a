//! `lemmata.toml` manifest parsing and library configuration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use lemmata_build::{ModuleLibrary, ModuleSource};
use lemmata_core::{
    parse_version, ChangeLog, ImportTable, ImportTarget, NodePath, Snapshot, SnapshotFile, Version,
};
use lemmata_validate::ValidationConfig;
use serde::{Deserialize, Serialize};

pub const MANIFEST_FILE: &str = "lemmata.toml";

/// The top-level manifest structure for a Lemmata library.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LemmataManifest {
    /// Library metadata (required).
    pub library: LibraryConfig,
    /// Module path to source file, relative to the manifest directory.
    #[serde(default)]
    pub modules: BTreeMap<String, String>,
    /// Import bindings supplied to every module. The key `*` is a wildcard
    /// import.
    #[serde(default)]
    pub imports: BTreeMap<String, ImportSpec>,
    /// Other libraries: name to snapshot file.
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
    #[serde(default)]
    pub validation: ValidationConfig,
    #[serde(default)]
    pub history: HistoryConfig,
}

/// Library metadata section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryConfig {
    pub name: String,
    #[serde(default = "default_version")]
    pub version: String,
}

fn default_version() -> String {
    "0.1.0".to_string()
}

/// An import binding.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ImportSpec {
    /// Plain dotted path, resolved against the highest available version.
    Path(String),
    /// Path pinned to a version.
    Pinned {
        path: String,
        #[serde(default)]
        version: Option<String>,
    },
}

/// Where the previous version and the change log live.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Snapshot file of the previous published version.
    #[serde(default)]
    pub previous: Option<String>,
    /// Change log TOML file.
    #[serde(default)]
    pub changelog: Option<String>,
}

impl LemmataManifest {
    /// Search upward from `start_dir` for a `lemmata.toml` file, parse and
    /// return it along with the directory it was found in.
    pub fn find_and_load(start_dir: &Path) -> Result<Option<(Self, PathBuf)>> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let candidate = dir.join(MANIFEST_FILE);
            if candidate.is_file() {
                return Self::load(&candidate).map(Some);
            }
            if !dir.pop() {
                break;
            }
        }
        Ok(None)
    }

    /// Load the manifest at `path`; the library root is its directory.
    pub fn load(path: &Path) -> Result<(Self, PathBuf)> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let manifest: LemmataManifest =
            toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
        let dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Ok((manifest, dir))
    }

    /// Parse a manifest from a TOML string.
    #[cfg(test)]
    pub fn from_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("parsing lemmata.toml")
    }

    pub fn version(&self) -> Result<Version> {
        parse_version(&self.library.version)
            .with_context(|| format!("[library] version of {}", self.library.name))
    }

    /// Read every module source listed in `[modules]`.
    pub fn sources(&self, project_dir: &Path) -> Result<Vec<ModuleSource>> {
        let version = self.version()?;
        self.modules
            .iter()
            .map(|(module, file)| {
                let path = NodePath::parse(module)
                    .with_context(|| format!("[modules] entry '{module}'"))?;
                let file = project_dir.join(file);
                let text = std::fs::read_to_string(&file)
                    .with_context(|| format!("reading {}", file.display()))?;
                Ok(ModuleSource::new(path, version.clone(), text))
            })
            .collect()
    }

    pub fn import_table(&self) -> Result<ImportTable> {
        let mut table = ImportTable::new();
        for (local, spec) in &self.imports {
            let (path, version) = match spec {
                ImportSpec::Path(path) => (path, None),
                ImportSpec::Pinned { path, version } => (path, version.as_deref()),
            };
            let path = NodePath::parse(path).with_context(|| format!("[imports] entry '{local}'"))?;
            let target = match version {
                Some(tag) => ImportTarget::pinned(
                    path,
                    parse_version(tag).with_context(|| format!("[imports] entry '{local}'"))?,
                ),
                None => ImportTarget::new(path),
            };
            if local == "*" {
                table.insert_glob(target);
            } else {
                table.insert(local.clone(), target);
            }
        }
        Ok(table)
    }

    /// Compiled modules of every dependency snapshot.
    pub fn dependency_library(&self, project_dir: &Path) -> Result<ModuleLibrary> {
        let mut library = ModuleLibrary::new();
        for (name, file) in &self.dependencies {
            let path = project_dir.join(file);
            let loaded = SnapshotFile::load(&path)
                .with_context(|| format!("loading dependency '{name}' from {}", path.display()))?;
            library.add_snapshot(&loaded.snapshot);
        }
        Ok(library)
    }

    /// The change log, or an empty one if none is configured.
    pub fn changelog(&self, project_dir: &Path) -> Result<ChangeLog> {
        match &self.history.changelog {
            Some(file) => {
                let path = project_dir.join(file);
                ChangeLog::load(&path).with_context(|| format!("loading {}", path.display()))
            }
            None => Ok(ChangeLog::default()),
        }
    }

    /// The previous version's snapshot, if one is configured.
    pub fn previous_snapshot(&self, project_dir: &Path) -> Result<Option<Snapshot>> {
        let Some(file) = &self.history.previous else {
            return Ok(None);
        };
        let path = project_dir.join(file);
        let loaded = SnapshotFile::load(&path)
            .with_context(|| format!("loading previous snapshot {}", path.display()))?;
        Ok(Some(loaded.snapshot))
    }

    /// Default snapshot output path: `target/<name>-<version>.lms`.
    pub fn default_output(&self, project_dir: &Path) -> PathBuf {
        project_dir
            .join("target")
            .join(format!("{}-{}.lms", self.library.name, self.library.version))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
[library]
name = "alg"
version = "2.1.0"

[modules]
"alg.groups" = "src/groups.lem"
"alg.rings" = "src/rings.lem"

[imports]
base = "other.base"
Lem = { path = "other.lemmas.Lem", version = "1.2.0" }
"*" = "other.prelude"

[dependencies]
other = "deps/other-1.2.0.lms"

[validation]
warn_unused_assertions = false

[history]
previous = "snapshots/alg-2.0.0.lms"
changelog = "CHANGES.toml"
"#;

    #[test]
    fn parse_full_manifest() {
        let m = LemmataManifest::from_str(FULL).unwrap();
        assert_eq!(m.library.name, "alg");
        assert_eq!(m.version().unwrap(), Version::new(2, 1, 0));
        assert_eq!(m.modules.len(), 2);
        assert!(!m.validation.warn_unused_assertions);
        assert!(m.validation.require_major_bump);
        assert_eq!(m.history.changelog.as_deref(), Some("CHANGES.toml"));

        let table = m.import_table().unwrap();
        assert_eq!(table.get("base").unwrap().path.to_string(), "other.base");
        assert_eq!(
            table.get("Lem").unwrap().version,
            Some(Version::new(1, 2, 0))
        );
        assert_eq!(table.globs().len(), 1);
        assert_eq!(m.dependencies["other"], "deps/other-1.2.0.lms");
    }

    #[test]
    fn minimal_manifest_defaults() {
        let m = LemmataManifest::from_str("[library]\nname = \"tiny\"\n").unwrap();
        assert_eq!(m.library.version, "0.1.0");
        assert!(m.modules.is_empty());
        assert!(m.history.previous.is_none());
        assert_eq!(m.validation, ValidationConfig::default());
    }

    #[test]
    fn find_manifest_upward() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(MANIFEST_FILE), "[library]\nname = \"up\"\n").unwrap();
        let nested = dir.path().join("src").join("deep");
        std::fs::create_dir_all(&nested).unwrap();
        let (m, root) = LemmataManifest::find_and_load(&nested).unwrap().unwrap();
        assert_eq!(m.library.name, "up");
        assert_eq!(root, dir.path());
    }

    #[test]
    fn missing_sources_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let m = LemmataManifest::from_str(FULL).unwrap();
        let err = m.sources(dir.path()).unwrap_err();
        assert!(format!("{err:#}").contains("groups.lem"));
    }

    #[test]
    fn bad_import_path_is_reported() {
        let m = LemmataManifest::from_str("[library]\nname = \"x\"\n[imports]\nbad = \"a..b\"\n")
            .unwrap();
        let err = m.import_table().unwrap_err();
        assert!(format!("{err:#}").contains("bad"));
    }
}
