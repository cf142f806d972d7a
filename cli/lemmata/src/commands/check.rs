//! `lemmata check`: parse, build, and resolve a single module.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use lemmata_build::{
    assemble_snapshot, compile_module, ModuleLibrary, ModuleSource, ResolveContext,
};
use lemmata_core::{parse_version, ChangeLog, ImportTable, NodePath, SnapshotFile, Version};
use lemmata_validate::{validate, ValidationConfig};

use crate::commands::print_compile_error;

/// Check `file` as module `module`, resolving against the given library
/// snapshots.
pub fn run(file: &Path, module: &str, version: Option<&str>, libraries: &[PathBuf]) -> Result<()> {
    let text = fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
    let path = NodePath::parse(module).with_context(|| format!("module path '{module}'"))?;
    let version = match version {
        Some(tag) => parse_version(tag).with_context(|| format!("version '{tag}'"))?,
        None => Version::new(0, 1, 0),
    };

    let mut library = ModuleLibrary::new();
    for snapshot in libraries {
        let loaded = SnapshotFile::load(snapshot)
            .with_context(|| format!("loading {}", snapshot.display()))?;
        library.add_snapshot(&loaded.snapshot);
    }
    let imports = ImportTable::new();
    let ctx = ResolveContext {
        library: &library,
        imports: &imports,
        previous: None,
    };

    let source = ModuleSource::new(path, version.clone(), text);
    let resolved = match compile_module(&source, ctx) {
        Ok(resolved) => resolved,
        Err(error) => {
            print_compile_error(&error);
            bail!("{} failed to check", file.display());
        }
    };

    let snapshot = assemble_snapshot(module, version, [&resolved])
        .context("assembling module snapshot")?;
    let report = validate(&snapshot, None, &ChangeLog::default(), &ValidationConfig::default());
    for diag in &report.diagnostics {
        println!("{diag}");
    }
    if !report.passed {
        bail!("{} has {} error(s)", file.display(), report.error_count());
    }
    println!(
        "ok: {module}@{}: {} nodes, {} edges, {} warning(s)",
        snapshot.version(),
        snapshot.node_count(),
        snapshot.edge_count(),
        report.warning_count()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_valid_module() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("m.lem");
        fs::write(
            &file,
            "deduc Thm { asrt C { en = \"c\" } }\ndeduc Pf of Thm.C { narration = \"Thm.C.\" }\n",
        )
        .unwrap();
        run(&file, "m", Some("1.0.0"), &[]).unwrap();
    }

    #[test]
    fn check_reports_syntax_errors() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("m.lem");
        fs::write(&file, "deduc Thm {").unwrap();
        assert!(run(&file, "m", None, &[]).is_err());
    }

    #[test]
    fn check_rejects_bad_module_path() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("m.lem");
        fs::write(&file, "deduc Thm {}").unwrap();
        let err = run(&file, "not..valid", None, &[]).unwrap_err();
        assert!(format!("{err:#}").contains("module path"));
    }
}
