//! The individual validation checks.
//!
//! Each check appends to a shared diagnostic list; none of them stops the
//! others. [`History`] is computed once from the two snapshots and the
//! change log and feeds the checks that look backward.

mod changelog;
mod expansion;
mod history;
mod narration;
mod references;

use std::collections::BTreeMap;

use lemmata_core::{ChangeLog, ChangeLogEntry, NodePath, Snapshot, Version};

use crate::diagnostic::{DiagnosticKind, ValidationDiagnostic};

pub(crate) use changelog::check_changelog;
pub(crate) use expansion::check_multiple_expansion;
pub(crate) use history::History;
pub(crate) use narration::{check_undelivered_targets, check_unused_assertions};
pub(crate) use references::check_references;

/// The change log entries that apply to one version, indexed by path.
pub(crate) struct LogIndex<'a> {
    current: Vec<&'a ChangeLogEntry>,
    stale: Vec<&'a ChangeLogEntry>,
    by_path: BTreeMap<&'a NodePath, &'a ChangeLogEntry>,
}

impl<'a> LogIndex<'a> {
    pub(crate) fn new(log: &'a ChangeLog, version: &Version) -> Self {
        let (current, stale): (Vec<_>, Vec<_>) =
            log.entries().iter().partition(|e| &e.version == version);
        let mut by_path = BTreeMap::new();
        for entry in current.iter().copied() {
            by_path.entry(&entry.path).or_insert(entry);
        }
        Self {
            current,
            stale,
            by_path,
        }
    }

    /// Whether some applicable entry names `path`.
    pub(crate) fn names(&self, path: &NodePath) -> bool {
        self.by_path.contains_key(path)
    }

    pub(crate) fn current(&self) -> &[&'a ChangeLogEntry] {
        &self.current
    }

    pub(crate) fn stale(&self) -> &[&'a ChangeLogEntry] {
        &self.stale
    }
}

/// Structural defects in the snapshot itself.
pub(crate) fn check_integrity(current: &Snapshot, out: &mut Vec<ValidationDiagnostic>) {
    for issue in current.check_integrity() {
        out.push(ValidationDiagnostic::at(
            DiagnosticKind::InternalInvariant,
            &issue.path,
            issue.message,
        ));
    }
}

/// Comma-separated list of paths, for messages.
pub(crate) fn list<'p>(paths: impl IntoIterator<Item = &'p NodePath>) -> String {
    paths
        .into_iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
