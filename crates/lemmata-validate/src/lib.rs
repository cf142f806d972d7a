//! Invariant and change-log validation for Lemmata library versions.
//!
//! [`validate`] compares the snapshot of the version being published with
//! the snapshot of its predecessor and the author's change log, and returns
//! every finding at once. It is a pure function of its inputs: no I/O, and
//! the diagnostics come out in a fixed order.
//!
//! The checks, in order:
//!
//! 1. a retargeted expansion needs a change log entry;
//! 2. an expansion target that vanished (a ghost) needs a change log entry;
//! 3. every edge endpoint resolves, or is a logged ghost;
//! 4. no node expands, or is expanded, more than once;
//! 5. every assertion is concluded in its own deduction or proved;
//! 6. change log entries are current, used, and name existing replacements;
//! 7. the version increases, by a major bump for breaking changes;
//! 8. a narrated deduction concludes all of its declared targets.

mod checks;
pub mod config;
pub mod diagnostic;
pub mod report;
pub mod version;

pub use config::ValidationConfig;
pub use diagnostic::{DiagnosticKind, Origin, Severity, ValidationDiagnostic};
pub use report::ValidationReport;
pub use version::ChangeKind;

use lemmata_core::{ChangeLog, Snapshot};

use crate::checks::{History, LogIndex};

/// Validate `current` against `previous` (absent for a first version).
pub fn validate(
    current: &Snapshot,
    previous: Option<&Snapshot>,
    changelog: &ChangeLog,
    config: &ValidationConfig,
) -> ValidationReport {
    if let Some(prev) = previous {
        if prev.library() != current.library() {
            tracing::warn!(
                previous = prev.library(),
                current = current.library(),
                "validating against a snapshot of a different library"
            );
        }
    }

    let log = LogIndex::new(changelog, current.version());
    let history = match previous {
        Some(prev) => History::compute(prev, current, &log),
        None => History::default(),
    };

    let mut diagnostics = Vec::new();
    checks::check_integrity(current, &mut diagnostics);
    history.report(&mut diagnostics);
    let (recorded_ghosts, tolerated) =
        checks::check_references(current, &log, &history, &mut diagnostics);
    checks::check_multiple_expansion(current, &mut diagnostics);
    if config.warn_unused_assertions {
        checks::check_unused_assertions(current, &mut diagnostics);
    }
    checks::check_changelog(current, &log, &history, &tolerated, &mut diagnostics);
    let change_kind = previous.map(|prev| {
        version::check_policy(prev, current, history.is_breaking(), config, &mut diagnostics);
        version::classify(prev, current, history.is_breaking())
    });
    checks::check_undelivered_targets(current, &mut diagnostics);

    diagnostics.sort();
    diagnostics.dedup();
    let passed = !diagnostics.iter().any(ValidationDiagnostic::is_error);

    let mut ghost_edges = history.edges.clone();
    ghost_edges.extend(recorded_ghosts);

    tracing::debug!(
        library = current.library(),
        version = %current.version(),
        diagnostics = diagnostics.len(),
        ghosts = ghost_edges.len(),
        passed,
        "validated snapshot"
    );

    ValidationReport {
        library: current.library().to_string(),
        version: current.version().clone(),
        previous: previous.map(|p| p.version().clone()),
        diagnostics,
        ghost_edges,
        change_kind,
        passed,
    }
}
