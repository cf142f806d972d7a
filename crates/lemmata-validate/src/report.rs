//! Validation report with summary counts and diagnostics.

use std::fmt;

use lemmata_core::{Edge, Version};

use crate::diagnostic::{Severity, ValidationDiagnostic};
use crate::version::ChangeKind;

/// The complete outcome of validating one library version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    pub library: String,
    pub version: Version,
    /// `None` when validating a library's first version.
    pub previous: Option<Version>,
    /// Sorted by check, then path.
    pub diagnostics: Vec<ValidationDiagnostic>,
    /// Ghost edges synthesized from the history plus those the resolver
    /// recorded.
    pub ghost_edges: Vec<Edge>,
    pub change_kind: Option<ChangeKind>,
    pub passed: bool,
}

impl ValidationReport {
    pub fn errors(&self) -> impl Iterator<Item = &ValidationDiagnostic> {
        self.diagnostics.iter().filter(|d| d.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ValidationDiagnostic> {
        self.diagnostics.iter().filter(|d| d.severity == Severity::Warning)
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings().count()
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.previous {
            Some(previous) => writeln!(
                f,
                "=== Validation Report ({} {previous} -> {}) ===",
                self.library, self.version
            )?,
            None => writeln!(
                f,
                "=== Validation Report ({} {}, first version) ===",
                self.library, self.version
            )?,
        }
        writeln!(
            f,
            "Result: {} | Errors: {} | Warnings: {} | Ghost edges: {} | Change: {}",
            if self.passed { "PASS" } else { "FAIL" },
            self.error_count(),
            self.warning_count(),
            self.ghost_edges.len(),
            self.change_kind.map_or("n/a", |k| k.required_bump()),
        )?;

        if self.diagnostics.is_empty() {
            writeln!(f, "No diagnostics.")?;
        } else {
            writeln!(f, "--- Diagnostics ---")?;
            for diag in &self.diagnostics {
                writeln!(f, "{diag}")?;
            }
        }
        if !self.ghost_edges.is_empty() {
            writeln!(f, "--- Ghost edges ---")?;
            for edge in &self.ghost_edges {
                writeln!(f, "{edge}")?;
            }
        }
        Ok(())
    }
}
