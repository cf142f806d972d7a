//! `lemmata validate`: compile the library and check it against its
//! previous version and change log.

use std::path::Path;

use anyhow::{bail, Result};
use lemmata_validate::{validate, ValidationReport};

use crate::commands::build::compile_library;
use crate::manifest::LemmataManifest;

pub fn run(project_dir: &Path, manifest: &LemmataManifest, report_format: Option<&str>) -> Result<()> {
    let previous = manifest.previous_snapshot(project_dir)?;
    let changelog = manifest.changelog(project_dir)?;
    let current = compile_library(project_dir, manifest, previous.as_ref())?;

    let report = validate(&current, previous.as_ref(), &changelog, &manifest.validation);

    match report_format {
        Some("json") => println!("{}", serde_json::to_string_pretty(&report_json(&report))?),
        Some("human") | None => print!("{report}"),
        Some(other) => bail!("unknown report format: '{other}'. Choose: human, json"),
    }

    if !report.passed {
        bail!(
            "validation failed: {} error(s) block publication of {} {}",
            report.error_count(),
            report.library,
            report.version
        );
    }
    Ok(())
}

fn report_json(report: &ValidationReport) -> serde_json::Value {
    serde_json::json!({
        "library": report.library,
        "version": report.version.to_string(),
        "previous": report.previous.as_ref().map(ToString::to_string),
        "passed": report.passed,
        "change": report.change_kind.map(|k| k.required_bump()),
        "diagnostics": report.diagnostics,
        "ghost_edges": report.ghost_edges,
    })
}
