//! Version policy between consecutive library snapshots.
//!
//! Expansion targets are the public surface of a library: other libraries
//! cite them by path. Losing or retargeting one is therefore a breaking
//! change, and the policy demands a major version bump for it (a minor bump
//! while the library is still below 1.0.0).

use std::collections::{BTreeMap, BTreeSet};

use lemmata_core::{EdgeKind, Node, NodePath, Snapshot, Version};
use serde::{Deserialize, Serialize};

use crate::config::ValidationConfig;
use crate::diagnostic::{DiagnosticKind, ValidationDiagnostic};

/// The kind of change between two library versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ChangeKind {
    /// No change.
    None,
    /// Content of existing nodes changed; the set of paths did not.
    Patch,
    /// Nodes or expansion targets added, or non-target nodes removed.
    Minor,
    /// Expansion targets lost or retargeted.
    Major,
}

impl ChangeKind {
    /// Return the minimum version bump required for this kind of change.
    pub fn required_bump(&self) -> &'static str {
        match self {
            ChangeKind::None => "none",
            ChangeKind::Patch => "patch",
            ChangeKind::Minor => "minor",
            ChangeKind::Major => "major",
        }
    }
}

/// Compute the smallest version allowed after `current` for a change of `kind`.
pub fn bump(current: &Version, kind: ChangeKind) -> Version {
    match kind {
        ChangeKind::None => current.clone(),
        ChangeKind::Patch => Version::new(current.major, current.minor, current.patch + 1),
        ChangeKind::Minor => Version::new(current.major, current.minor + 1, 0),
        ChangeKind::Major if current.major == 0 => Version::new(0, current.minor + 1, 0),
        ChangeKind::Major => Version::new(current.major + 1, 0, 0),
    }
}

/// Whether moving from `previous` to `next` is a large enough bump for `kind`.
pub fn satisfies(previous: &Version, next: &Version, kind: ChangeKind) -> bool {
    next >= &bump(previous, kind)
}

/// Classify the change from `previous` to `current`.
///
/// `breaking` is the validator's verdict on ghosts and retargets; everything
/// else is derived from the two snapshots.
pub fn classify(previous: &Snapshot, current: &Snapshot, breaking: bool) -> ChangeKind {
    if breaking {
        return ChangeKind::Major;
    }
    let before: BTreeSet<&NodePath> = previous.nodes().map(|n| &n.path).collect();
    let after: BTreeSet<&NodePath> = current.nodes().map(|n| &n.path).collect();
    if before != after || expansion_sets(previous) != expansion_sets(current) {
        return ChangeKind::Minor;
    }
    let content_changed = current.nodes().any(|node| {
        previous
            .node(&node.path)
            .is_some_and(|old| !same_content(old, node))
    });
    if content_changed || edge_shapes(previous) != edge_shapes(current) {
        return ChangeKind::Patch;
    }
    ChangeKind::None
}

fn same_content(a: &Node, b: &Node) -> bool {
    a.kind == b.kind
        && a.fields == b.fields
        && a.children == b.children
        && a.narration == b.narration
        && a.wolog == b.wolog
}

fn expansion_sets(snapshot: &Snapshot) -> BTreeMap<&NodePath, BTreeSet<&NodePath>> {
    snapshot
        .expansion_map()
        .into_iter()
        .map(|(source, targets)| (source, targets.into_iter().collect()))
        .collect()
}

/// Edges with versions stripped, so that a plain version bump compares equal.
fn edge_shapes(snapshot: &Snapshot) -> BTreeSet<(EdgeKind, Vec<&NodePath>)> {
    snapshot
        .edges()
        .iter()
        .map(|e| (e.kind(), e.endpoints().into_iter().map(|r| &r.path).collect()))
        .collect()
}

/// Check 7: the version must increase, and breaking changes need a major bump.
pub(crate) fn check_policy(
    previous: &Snapshot,
    current: &Snapshot,
    breaking: bool,
    config: &ValidationConfig,
    out: &mut Vec<ValidationDiagnostic>,
) {
    let (before, after) = (previous.version(), current.version());
    if after <= before {
        out.push(ValidationDiagnostic::new(
            DiagnosticKind::VersionNotIncreased,
            None,
            format!("version {after} does not follow previous version {before}"),
        ));
        return;
    }
    if config.require_major_bump && breaking && !satisfies(before, after, ChangeKind::Major) {
        out.push(ValidationDiagnostic::new(
            DiagnosticKind::DisallowedBreakingChange,
            None,
            format!(
                "expansion targets were lost or retargeted; version {after} must be at least {}",
                bump(before, ChangeKind::Major)
            ),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn version_bump() {
        let base = v("1.2.3");
        assert_eq!(bump(&base, ChangeKind::Patch), v("1.2.4"));
        assert_eq!(bump(&base, ChangeKind::Minor), v("1.3.0"));
        assert_eq!(bump(&base, ChangeKind::Major), v("2.0.0"));
        assert_eq!(bump(&base, ChangeKind::None), base);
    }

    #[test]
    fn pre_one_major_is_minor() {
        assert_eq!(bump(&v("0.3.1"), ChangeKind::Major), v("0.4.0"));
        assert!(satisfies(&v("0.3.1"), &v("0.4.0"), ChangeKind::Major));
        assert!(!satisfies(&v("0.3.1"), &v("0.3.9"), ChangeKind::Major));
        assert!(satisfies(&v("1.9.0"), &v("2.0.0"), ChangeKind::Major));
        assert!(!satisfies(&v("1.9.0"), &v("1.10.0"), ChangeKind::Major));
    }

    #[test]
    fn change_kind_labels() {
        assert_eq!(ChangeKind::None.required_bump(), "none");
        assert_eq!(ChangeKind::Major.required_bump(), "major");
        assert!(ChangeKind::Major > ChangeKind::Patch);
    }

    #[test]
    fn identical_snapshots_do_not_change() {
        let a = Snapshot::new("alg", v("1.0.0"));
        let b = Snapshot::new("alg", v("1.0.1"));
        assert_eq!(classify(&a, &b, false), ChangeKind::None);
        assert_eq!(classify(&a, &b, true), ChangeKind::Major);
    }

    #[test]
    fn policy_flags_missing_major_bump() {
        let prev = Snapshot::new("alg", v("1.4.0"));
        let config = ValidationConfig::default();

        let mut out = Vec::new();
        check_policy(&prev, &Snapshot::new("alg", v("1.5.0")), true, &config, &mut out);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].kind, DiagnosticKind::DisallowedBreakingChange);

        let mut out = Vec::new();
        check_policy(&prev, &Snapshot::new("alg", v("1.4.0")), false, &config, &mut out);
        assert_eq!(out[0].kind, DiagnosticKind::VersionNotIncreased);

        let mut out = Vec::new();
        let relaxed = ValidationConfig {
            require_major_bump: false,
            ..config
        };
        check_policy(&prev, &Snapshot::new("alg", v("1.5.0")), true, &relaxed, &mut out);
        assert!(out.is_empty());
    }
}
