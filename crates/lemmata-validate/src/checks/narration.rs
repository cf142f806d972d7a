//! Narration completeness (check 5) and undelivered targets (check 8).

use std::collections::BTreeSet;

use lemmata_core::{NodeKind, NodePath, Snapshot};

use crate::diagnostic::{DiagnosticKind, ValidationDiagnostic};

/// Assertions that no narration of their own deduction concludes and no
/// deduction expands.
///
/// The narrations that count for an assertion are those of its top-level
/// deduction and of every sub-deduction inside it.
pub(crate) fn check_unused_assertions(current: &Snapshot, out: &mut Vec<ValidationDiagnostic>) {
    let expanded = current.expanders();
    let concluded: Vec<(&NodePath, BTreeSet<&NodePath>)> = current
        .narrations()
        .map(|(owner, steps)| {
            let paths = steps
                .iter()
                .flat_map(|step| step.conclusions.iter().map(|r| &r.path))
                .collect();
            (owner, paths)
        })
        .collect();

    for node in current.nodes() {
        if node.kind != NodeKind::Assertion || expanded.contains_key(&node.path) {
            continue;
        }
        let Some(scope) = top_level_deduction(current, &node.path) else {
            continue;
        };
        let used = concluded
            .iter()
            .any(|(owner, paths)| owner.starts_with(&scope) && paths.contains(&node.path));
        if !used {
            out.push(ValidationDiagnostic::at(
                DiagnosticKind::UnusedAssertion,
                &node.path,
                format!("never concluded in the narration of {scope} nor proved by a deduction"),
            ));
        }
    }
}

fn top_level_deduction(current: &Snapshot, path: &NodePath) -> Option<NodePath> {
    let module = current.module_of(path)?;
    path.prefix(module.len() + 1)
}

/// Deductions whose narration never reaches one of their declared targets.
pub(crate) fn check_undelivered_targets(current: &Snapshot, out: &mut Vec<ValidationDiagnostic>) {
    for (owner, steps) in current.narrations() {
        if steps.is_empty() {
            continue;
        }
        let concluded: BTreeSet<&NodePath> = steps
            .iter()
            .flat_map(|s| s.conclusions.iter().map(|r| &r.path))
            .collect();
        for edge in current.expansions_from(owner) {
            for target in edge.targets() {
                if !concluded.contains(&target.path) {
                    out.push(ValidationDiagnostic::at(
                        DiagnosticKind::UndeliveredTarget,
                        owner,
                        format!("narration never concludes declared target {}", target.path),
                    ));
                }
            }
        }
    }
}
