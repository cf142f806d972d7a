//! Check 4: at most one expansion per source and per target, library-wide.

use std::collections::BTreeMap;

use lemmata_core::{NodePath, Snapshot};

use super::list;
use crate::diagnostic::{DiagnosticKind, ValidationDiagnostic};

pub(crate) fn check_multiple_expansion(current: &Snapshot, out: &mut Vec<ValidationDiagnostic>) {
    let mut per_source: BTreeMap<&NodePath, usize> = BTreeMap::new();
    for edge in current.edges().iter().filter(|e| e.is_expansion()) {
        *per_source.entry(&edge.source().path).or_default() += 1;
    }
    for (source, count) in per_source.into_iter().filter(|(_, n)| *n > 1) {
        out.push(ValidationDiagnostic::at(
            DiagnosticKind::MultipleExpansion,
            source,
            format!("source of {count} expansion edges"),
        ));
    }

    for (target, sources) in current.expanders() {
        if sources.len() > 1 {
            out.push(ValidationDiagnostic::at(
                DiagnosticKind::MultipleExpansion,
                target,
                format!("expanded by {}", list(sources)),
            ));
        }
    }
}
