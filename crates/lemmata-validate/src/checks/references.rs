//! Check 3: every edge endpoint resolves, or is a ghost the change log covers.

use std::collections::BTreeSet;

use lemmata_core::{Edge, GhostRole, NodePath, NodeRef, Snapshot};

use super::{History, LogIndex};
use crate::diagnostic::{DiagnosticKind, ValidationDiagnostic};

fn role_word(role: GhostRole) -> &'static str {
    match role {
        GhostRole::Expansion => "expansion",
        GhostRole::Narration => "narration",
        GhostRole::Contradiction => "contra",
        GhostRole::AlternativeCase => "versus",
        GhostRole::Annotation => "annotation",
        GhostRole::Retarget => "retargeted expansion",
    }
}

/// Whether `source` expanded `target`, an unlogged ghost the history
/// check reports.
fn expanded_vanished_target(history: &History<'_>, source: &NodePath, target: &NodePath) -> bool {
    history
        .ghosts
        .get(target)
        .is_some_and(|g| !g.covered && g.expanders.contains(&source))
}

/// Returns the ghost edges found in the snapshot, and the targets of those
/// the change log tolerates.
pub(crate) fn check_references<'a>(
    current: &'a Snapshot,
    log: &LogIndex<'_>,
    history: &History<'_>,
    out: &mut Vec<ValidationDiagnostic>,
) -> (Vec<Edge>, BTreeSet<&'a NodePath>) {
    let mut ghost_edges = Vec::new();
    let mut tolerated: BTreeSet<&NodePath> = BTreeSet::new();
    let mut reported: BTreeSet<(&NodePath, &NodeRef)> = BTreeSet::new();

    for edge in current.edges() {
        let source = &edge.source().path;
        match edge {
            Edge::GhostReference { target, role, .. } => {
                ghost_edges.push(edge.clone());
                if log.names(&target.path) || history.covers(&target.path) {
                    if tolerated.insert(&target.path) && !history.ghosts.contains_key(&target.path)
                    {
                        out.push(ValidationDiagnostic::at(
                            DiagnosticKind::LoggedGhost,
                            &target.path,
                            format!(
                                "{} reference from {source} to {target}, which no longer exists; acknowledged in the change log",
                                role_word(*role)
                            ),
                        ));
                    }
                } else if !expanded_vanished_target(history, source, &target.path)
                    && reported.insert((source, target))
                {
                    out.push(ValidationDiagnostic::at(
                        DiagnosticKind::DanglingReference,
                        source,
                        format!(
                            "{} reference to {target}, which no longer exists and no change log entry names it",
                            role_word(*role)
                        ),
                    ));
                }
            }
            _ => {
                for endpoint in edge.endpoints() {
                    if !current.resolves(endpoint) && reported.insert((source, endpoint)) {
                        out.push(ValidationDiagnostic::at(
                            DiagnosticKind::DanglingReference,
                            source,
                            format!("{} edge endpoint {endpoint} does not resolve", edge.kind()),
                        ));
                    }
                }
            }
        }
    }
    (ghost_edges, tolerated)
}
