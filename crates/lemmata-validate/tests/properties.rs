//! Property tests: validation is deterministic, and every lost expansion
//! target is reported exactly once unless the change log names it.

use std::collections::{BTreeMap, BTreeSet};

use lemmata_core::graph::node::FIELD_EN;
use lemmata_core::{
    ChangeLog, ChangeLogEntry, Edge, ExpansionOrigin, ModuleGraph, Node, NodeKind, NodePath,
    NodeRef, Snapshot, Version,
};
use lemmata_validate::{validate, DiagnosticKind, ValidationConfig};
use proptest::prelude::*;

fn p(s: &str) -> NodePath {
    NodePath::parse(s).unwrap()
}

fn claim(i: usize) -> NodePath {
    p(&format!("gen.Thm.C{i}"))
}

fn proof(i: usize) -> NodePath {
    p(&format!("gen.Pf{i}"))
}

/// Theorem `Thm` with the given conclusions; `Pf{i}` expands `C{j}` for
/// each `(i, j)` in `proofs`.
fn release(version: Version, claims: &[usize], proofs: &[(usize, usize)]) -> Snapshot {
    let mut g = ModuleGraph::new(p("gen"), version.clone());
    g.add_node(Node::new(NodeKind::Deduction, p("gen.Thm"), version.clone()), None)
        .unwrap();
    for &i in claims {
        g.add_node(
            Node::new(NodeKind::Assertion, claim(i), version.clone()).with_field(FIELD_EN, "c"),
            Some(&p("gen.Thm")),
        )
        .unwrap();
    }
    for &(i, j) in proofs {
        g.add_node(Node::new(NodeKind::Deduction, proof(i), version.clone()), None)
            .unwrap();
        g.add_edge(Edge::Expansion {
            source: NodeRef::new(proof(i), version.clone()),
            targets: vec![NodeRef::new(claim(j), version.clone())],
            origin: ExpansionOrigin::Declared,
        })
        .unwrap();
    }
    let mut snapshot = Snapshot::new("gen", version);
    snapshot
        .add_module(&g, &BTreeMap::new(), Vec::new())
        .unwrap();
    snapshot
}

/// `n` conclusions each proved by its own deduction, then for the next
/// version: which conclusions survive, and where each deduction points now.
fn evolution() -> impl Strategy<Value = (usize, Vec<bool>, Vec<Option<usize>>)> {
    (1usize..6).prop_flat_map(|n| {
        (
            Just(n),
            prop::collection::vec(any::<bool>(), n),
            prop::collection::vec(prop::option::of(0..n), n),
        )
    })
}

struct Versions {
    previous: Snapshot,
    current: Snapshot,
    /// Conclusions whose expander moved elsewhere.
    retargeted: BTreeSet<usize>,
    /// Conclusions that vanished without their expander moving.
    vanished: BTreeSet<usize>,
}

fn versions(n: usize, keep: &[bool], moves: &[Option<usize>]) -> Versions {
    let all: Vec<usize> = (0..n).collect();
    let identity: Vec<(usize, usize)> = all.iter().map(|&i| (i, i)).collect();
    let previous = release(Version::new(1, 0, 0), &all, &identity);

    let kept: Vec<usize> = all.iter().copied().filter(|&i| keep[i]).collect();
    let proofs: Vec<(usize, usize)> = moves
        .iter()
        .enumerate()
        .filter_map(|(i, to)| to.filter(|&j| keep[j]).map(|j| (i, j)))
        .collect();
    let current = release(Version::new(2, 0, 0), &kept, &proofs);

    let retargeted: BTreeSet<usize> = proofs
        .iter()
        .filter(|(i, j)| i != j)
        .map(|&(i, _)| i)
        .collect();
    let vanished = all
        .iter()
        .copied()
        .filter(|&i| !keep[i] && !retargeted.contains(&i))
        .collect();
    Versions {
        previous,
        current,
        retargeted,
        vanished,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn validation_is_deterministic((n, keep, moves) in evolution(), logged in prop::collection::vec(any::<bool>(), 6)) {
        let v = versions(n, &keep, &moves);
        let entries: Vec<ChangeLogEntry> = (0..n)
            .filter(|&i| logged[i])
            .map(|i| ChangeLogEntry::new(claim(i), Version::new(2, 0, 0), "acknowledged"))
            .collect();
        let forward = ChangeLog::new(entries.clone());
        let backward = ChangeLog::new(entries.into_iter().rev().collect());
        let config = ValidationConfig::default();

        let first = validate(&v.current, Some(&v.previous), &forward, &config);
        let again = validate(&v.current, Some(&v.previous), &forward, &config);
        let reversed = validate(&v.current, Some(&v.previous), &backward, &config);
        prop_assert_eq!(&first, &again);
        prop_assert_eq!(&first, &reversed);
        prop_assert_eq!(first.to_string(), again.to_string());
    }

    #[test]
    fn lost_targets_are_reported_once((n, keep, moves) in evolution()) {
        let v = versions(n, &keep, &moves);
        let config = ValidationConfig::default();

        let report = validate(&v.current, Some(&v.previous), &ChangeLog::default(), &config);
        let mut expected: BTreeSet<(DiagnosticKind, NodePath)> = BTreeSet::new();
        for &i in &v.retargeted {
            expected.insert((DiagnosticKind::IllegalRetarget, proof(i)));
        }
        for &i in &v.vanished {
            expected.insert((DiagnosticKind::UnloggedDisappearance, claim(i)));
        }
        let reported: Vec<(DiagnosticKind, NodePath)> = report
            .diagnostics
            .iter()
            .filter(|d| matches!(d.kind, DiagnosticKind::IllegalRetarget | DiagnosticKind::UnloggedDisappearance))
            .filter_map(|d| d.path.clone().map(|path| (d.kind, path)))
            .collect();
        prop_assert_eq!(reported.len(), expected.len());
        prop_assert_eq!(reported.into_iter().collect::<BTreeSet<_>>(), expected);

        let log = ChangeLog::new(
            (0..n)
                .map(|i| ChangeLogEntry::new(claim(i), Version::new(2, 0, 0), "acknowledged"))
                .collect(),
        );
        let report = validate(&v.current, Some(&v.previous), &log, &config);
        prop_assert!(!report.diagnostics.iter().any(|d| matches!(
            d.kind,
            DiagnosticKind::IllegalRetarget | DiagnosticKind::UnloggedDisappearance
        )));
    }
}
