//! Check 6: change log hygiene.

use std::collections::BTreeSet;

use lemmata_core::{NodePath, Snapshot};

use super::{History, LogIndex};
use crate::diagnostic::{DiagnosticKind, ValidationDiagnostic};

pub(crate) fn check_changelog(
    current: &Snapshot,
    log: &LogIndex<'_>,
    history: &History<'_>,
    tolerated: &BTreeSet<&NodePath>,
    out: &mut Vec<ValidationDiagnostic>,
) {
    for entry in log.stale() {
        out.push(ValidationDiagnostic::at(
            DiagnosticKind::StaleChangeLogEntry,
            &entry.path,
            format!(
                "entry is for version {} and does not apply to {}",
                entry.version,
                current.version()
            ),
        ));
    }

    let touched = history.touched();
    for entry in log.current() {
        if !touched.contains(&entry.path) && !tolerated.contains(&entry.path) {
            out.push(ValidationDiagnostic::at(
                DiagnosticKind::UnusedChangeLogEntry,
                &entry.path,
                "no disappearance or retarget matches this entry",
            ));
        }
        if let Some(replacement) = &entry.replacement {
            if !current.contains(replacement) {
                out.push(ValidationDiagnostic::at(
                    DiagnosticKind::InvalidReplacement,
                    &entry.path,
                    format!("replacement {replacement} does not exist in version {}", current.version()),
                ));
            }
        }
    }
}
