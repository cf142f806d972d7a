//! `lemmata build`: compile every module of a library into a snapshot.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use lemmata_build::{assemble_snapshot, compile_batch};
use lemmata_core::{Snapshot, SnapshotFile};

use crate::commands::print_compile_error;
use crate::manifest::{LemmataManifest, MANIFEST_FILE};

/// Compile the library described by `manifest`.
///
/// `previous` enables ghost detection for references that only resolve in
/// the previous version.
pub fn compile_library(
    project_dir: &Path,
    manifest: &LemmataManifest,
    previous: Option<&Snapshot>,
) -> Result<Snapshot> {
    let sources = manifest.sources(project_dir)?;
    if sources.is_empty() {
        bail!("no modules listed under [modules] in {MANIFEST_FILE}");
    }
    let imports = manifest.import_table()?;
    let library = manifest.dependency_library(project_dir)?;

    let out = compile_batch(&sources, library, &imports, previous);
    if !out.is_success() {
        let mut failed = 0;
        for (_, error) in out.errors() {
            print_compile_error(error);
            failed += 1;
        }
        bail!("{failed} of {} module(s) failed to compile", sources.len());
    }

    assemble_snapshot(&manifest.library.name, manifest.version()?, out.resolved())
        .context("assembling library snapshot")
}

/// Build the library and write its snapshot.
pub fn run(project_dir: &Path, manifest: &LemmataManifest, out: Option<&Path>) -> Result<()> {
    let previous = manifest.previous_snapshot(project_dir)?;
    let snapshot = compile_library(project_dir, manifest, previous.as_ref())?;

    let out_path = match out {
        Some(path) => path.to_path_buf(),
        None => manifest.default_output(project_dir),
    };
    if let Some(parent) = out_path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }
    let (nodes, edges) = (snapshot.node_count(), snapshot.edge_count());
    SnapshotFile::new(snapshot)
        .save(&out_path)
        .with_context(|| format!("writing {}", out_path.display()))?;

    println!(
        "Built {} {}: {nodes} nodes, {edges} edges -> {}",
        manifest.library.name,
        manifest.library.version,
        out_path.display()
    );
    Ok(())
}
