//! Checks 1 and 2: retargeted expansions and ghost nodes.

use std::collections::{BTreeMap, BTreeSet};

use lemmata_core::{Edge, GhostRole, NodePath, NodeRef, Snapshot};

use super::{list, LogIndex};
use crate::diagnostic::{DiagnosticKind, ValidationDiagnostic};

/// A source whose expansion no longer reaches some of its previous targets.
#[derive(Debug)]
pub(crate) struct Retarget<'a> {
    pub source: &'a NodePath,
    /// Previous targets the source no longer expands.
    pub removed: Vec<&'a NodePath>,
    /// What the source expands now.
    pub now: Vec<&'a NodePath>,
    pub covered: bool,
}

/// A previous expansion target that vanished or lost its expander.
#[derive(Debug)]
pub(crate) struct Ghost<'a> {
    /// Sources that expanded the target in the previous version.
    pub expanders: Vec<&'a NodePath>,
    /// The node no longer exists at all.
    pub vanished: bool,
    pub covered: bool,
}

/// What changed in the expansion structure since the previous version.
#[derive(Debug, Default)]
pub(crate) struct History<'a> {
    pub retargets: Vec<Retarget<'a>>,
    pub ghosts: BTreeMap<&'a NodePath, Ghost<'a>>,
    /// Ghost edges synthesized for every ghost.
    pub edges: Vec<Edge>,
}

impl<'a> History<'a> {
    pub(crate) fn compute(previous: &'a Snapshot, current: &'a Snapshot, log: &LogIndex<'_>) -> Self {
        let before = previous.expansion_map();
        let after = current.expansion_map();

        let mut retargets = Vec::new();
        for (&source, old) in &before {
            let Some(new) = after.get(source) else {
                continue;
            };
            let removed: BTreeSet<&NodePath> =
                old.iter().copied().filter(|t| !new.contains(t)).collect();
            if removed.is_empty() {
                continue;
            }
            let covered = log.names(source) || removed.iter().all(|t| log.names(t));
            retargets.push(Retarget {
                source,
                removed: removed.into_iter().collect(),
                now: new.clone(),
                covered,
            });
        }

        let mut ghosts = BTreeMap::new();
        for (&target, sources) in &previous.expanders() {
            let vanished = previous.owns(target) && !current.contains(target);
            let retargeted = retargets.iter().any(|r| r.removed.contains(&target));
            if !vanished && !retargeted {
                continue;
            }
            let covered = log.names(target)
                || retargets
                    .iter()
                    .any(|r| r.covered && r.removed.contains(&target));
            ghosts.insert(
                target,
                Ghost {
                    expanders: sources.iter().copied().collect(),
                    vanished,
                    covered,
                },
            );
        }

        let mut history = Self {
            retargets,
            ghosts,
            edges: Vec::new(),
        };
        history.edges = history.synthesize_edges(previous, current);
        history
    }

    /// Ghosts or retargets make the new version a breaking change.
    pub(crate) fn is_breaking(&self) -> bool {
        !self.retargets.is_empty() || !self.ghosts.is_empty()
    }

    fn retarget_of(&self, source: &NodePath) -> Option<&Retarget<'a>> {
        self.retargets.iter().find(|r| r.source == source)
    }

    /// Whether `target` is a ghost the change log accounts for.
    pub(crate) fn covers(&self, target: &NodePath) -> bool {
        self.ghosts.get(target).is_some_and(|g| g.covered)
    }

    /// Paths the history touched; change log entries naming anything else
    /// are unused.
    pub(crate) fn touched(&self) -> BTreeSet<&'a NodePath> {
        let mut paths: BTreeSet<&NodePath> = self.ghosts.keys().copied().collect();
        for r in &self.retargets {
            paths.insert(r.source);
            paths.extend(r.removed.iter().copied());
        }
        paths
    }

    fn synthesize_edges(&self, previous: &Snapshot, current: &Snapshot) -> Vec<Edge> {
        let mut edges = Vec::new();
        for (&target, ghost) in &self.ghosts {
            for &source in &ghost.expanders {
                let version = if current.contains(source) {
                    current.version()
                } else {
                    previous.version()
                };
                let role = match self.retarget_of(source) {
                    Some(r) if r.removed.contains(&target) => GhostRole::Retarget,
                    _ => GhostRole::Expansion,
                };
                edges.push(Edge::GhostReference {
                    source: NodeRef::new(source.clone(), version.clone()),
                    target: NodeRef::new(target.clone(), previous.version().clone()),
                    role,
                });
            }
        }
        edges
    }

    pub(crate) fn report(&self, out: &mut Vec<ValidationDiagnostic>) {
        for r in self.retargets.iter().filter(|r| !r.covered) {
            let now = if r.now.is_empty() {
                "nothing".to_string()
            } else {
                list(r.now.iter().copied())
            };
            out.push(ValidationDiagnostic::at(
                DiagnosticKind::IllegalRetarget,
                r.source,
                format!(
                    "expansion retargeted from {} to {now} without a change log entry",
                    list(r.removed.iter().copied())
                ),
            ));
        }

        for (&target, ghost) in &self.ghosts {
            let what = if ghost.vanished {
                "no longer exists"
            } else {
                "is no longer expanded"
            };
            let expanders = list(ghost.expanders.iter().copied());
            if ghost.covered {
                out.push(ValidationDiagnostic::at(
                    DiagnosticKind::LoggedGhost,
                    target,
                    format!("expansion target of {expanders} {what}; acknowledged in the change log"),
                ));
                continue;
            }
            let already_reported = ghost.expanders.iter().all(|s| {
                self.retarget_of(s)
                    .is_some_and(|r| !r.covered && r.removed.contains(&target))
            });
            if !already_reported {
                out.push(ValidationDiagnostic::at(
                    DiagnosticKind::UnloggedDisappearance,
                    target,
                    format!("expansion target of {expanders} {what} and no change log entry names it"),
                ));
            }
        }
    }
}
