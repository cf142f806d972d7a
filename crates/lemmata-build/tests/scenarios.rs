//! End-to-end compilation of small libraries.

use lemmata_build::{
    assemble_snapshot, compile_batch, CompileError, ModuleLibrary, ModuleSource, ResolveError,
};
use lemmata_core::graph::node::FIELD_BODY;
use lemmata_core::{Edge, EdgeKind, ImportTable, NodePath, Snapshot, Version};

fn p(s: &str) -> NodePath {
    NodePath::parse(s).unwrap()
}

fn v1() -> Version {
    Version::new(1, 0, 0)
}

fn build(modules: &[(&str, &str)]) -> Result<Snapshot, Vec<CompileError>> {
    let sources: Vec<ModuleSource> = modules
        .iter()
        .map(|(path, text)| ModuleSource::new(p(path), v1(), *text))
        .collect();
    let out = compile_batch(&sources, ModuleLibrary::new(), &ImportTable::new(), None);
    if !out.is_success() {
        return Err(out.errors().map(|(_, e)| e.clone()).collect());
    }
    Ok(assemble_snapshot("demo", v1(), out.resolved()).unwrap())
}

fn edges(snapshot: &Snapshot, kind: EdgeKind) -> Vec<&Edge> {
    snapshot.edges().iter().filter(|e| e.kind() == kind).collect()
}

#[test]
fn multi_conclusion_theorem_across_modules() {
    let snapshot = build(&[
        (
            "alg.thms",
            r#"
            deduc Thm {
                asrt C1 { en = "G is abelian" }
                asrt C2 { sy = "|G| = p^2" }
                asrt C3 { en = "G has a subgroup of order p" }
            }
            "#,
        ),
        (
            "alg.proofs",
            r#"
            from alg.thms import Thm
            deduc Pf13 of Thm.C1, Thm.C3 {
                asrt A { en = "the center is nontrivial" }
                narration = "From A get Thm.C1. Thm.C3 by A."
            }
            deduc Pf2 of Thm.C2 {
                narration = "Thm.C2."
            }
            "#,
        ),
    ])
    .unwrap();

    let expansions = edges(&snapshot, EdgeKind::Expansion);
    assert_eq!(expansions.len(), 2);
    let pf13 = expansions
        .iter()
        .find(|e| e.source().path == p("alg.proofs.Pf13"))
        .unwrap();
    assert_eq!(pf13.targets().len(), 2);
    assert!(snapshot.check_integrity().is_empty());
}

#[test]
fn versus_cases_with_contradictions() {
    let snapshot = build(&[(
        "nt",
        r#"
        deduc Thm { asrt C { en = "n^2 + n is even" } }
        deduc Pf of Thm.C {
            supp Even versus Odd wolog { en = "n is even" }
            supp Odd { en = "n is odd" }
            flse F1 contra Even {}
            flse F2 contra Odd {}
            narration = "Suppose Even. Then F1. Suppose Odd. Then F2. Therefore Thm.C."
        }
        "#,
    )])
    .unwrap();
    let versus = edges(&snapshot, EdgeKind::AlternativeCase);
    assert_eq!(versus.len(), 1);
    assert_eq!(versus[0].source().path, p("nt.Pf.Even"));
    assert_eq!(edges(&snapshot, EdgeKind::Contradiction).len(), 2);
    assert!(snapshot.node(&p("nt.Pf.Even")).unwrap().wolog);
}

#[test]
fn undeclared_narration_name() {
    let errors = build(&[(
        "m",
        r#"
        deduc Thm { asrt C { en = "c" } }
        deduc Pf of Thm.C {
            asrt A { en = "a" }
            narration = "From A and Lemma7 get Thm.C."
        }
        "#,
    )])
    .unwrap_err();
    match errors.as_slice() {
        [CompileError::Resolve { errors, .. }] => assert_eq!(
            errors,
            &vec![ResolveError::Unresolved {
                node: p("m.Pf"),
                name: p("Lemma7"),
            }]
        ),
        other => panic!("unexpected errors: {other:?}"),
    }
}

#[test]
fn annotation_body_survives_compilation() {
    let body = "\nSee <chart:\"Pf.A\"> and <link:alg.thms.Thm>.\n  $$\\sum_{i} x_i$$ # kept\n";
    let src = format!(
        "deduc Pf {{ asrt A {{ en = \"a\" }} }}\nanno Notes on Pf {{ body = @@@{body}@@@ }}\n"
    );
    let snapshot = build(&[("m", src.as_str())]).unwrap();
    assert_eq!(
        snapshot.node(&p("m.Notes")).unwrap().field(FIELD_BODY),
        Some(body)
    );
    assert_eq!(edges(&snapshot, EdgeKind::Annotates).len(), 1);
}
