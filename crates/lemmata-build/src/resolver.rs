//! Reference resolver.
//!
//! Links every symbolic name of a candidate graph to a concrete node, in
//! this module or in the [`ModuleLibrary`], and materializes the edges.
//! Lookup order for a name written at scope `S`:
//!
//! 1. `S.name`, then `A.name` for each enclosing block `A` of `S`, up to
//!    the module itself
//! 2. the import table: explicit names first, then `*` imports
//! 3. `name` as an absolute path
//!
//! A name that fails every step but existed in the previous snapshot
//! becomes a [`GhostReference`](Edge::GhostReference) edge; deciding
//! whether that is acceptable is the validator's business.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use lemmata_core::{
    Connective, Edge, ExpansionOrigin, GhostRole, ImportTable, ModuleGraph, NarrationStep, Node,
    NodeKind, NodePath, NodeRef, ResolvedStep, Snapshot, Version,
};

use crate::builder::{CandidateGraph, RefRole, SymbolicRef};
use crate::cycles::find_cycles;
use crate::error::ResolveError;
use crate::library::ModuleLibrary;

/// A module graph with every reference linked to a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedModule {
    pub graph: ModuleGraph,
    /// Resolved narration steps, keyed by owning deduction.
    pub narrations: BTreeMap<NodePath, Vec<ResolvedStep>>,
    /// Nodes of other modules this module refers to.
    pub external_refs: BTreeSet<NodeRef>,
    /// Suppositions linked by `versus`, grouped into alternative-case sets.
    pub case_groups: Vec<Vec<NodePath>>,
}

impl ResolvedModule {
    pub fn module(&self) -> &NodePath {
        self.graph.module()
    }

    pub fn version(&self) -> &Version {
        self.graph.version()
    }

    pub fn ghost_edges(&self) -> impl Iterator<Item = &Edge> {
        self.graph
            .edges()
            .iter()
            .filter(|e| matches!(e, Edge::GhostReference { .. }))
    }
}

/// What resolution may consult besides the module itself.
#[derive(Debug, Clone, Copy)]
pub struct ResolveContext<'a> {
    pub library: &'a ModuleLibrary,
    /// Caller-supplied imports; these override the module's own.
    pub imports: &'a ImportTable,
    /// The previous version of the library, for ghost detection.
    pub previous: Option<&'a Snapshot>,
}

/// Resolve a candidate graph. Every problem found is returned.
pub fn resolve(
    candidate: &CandidateGraph,
    ctx: ResolveContext<'_>,
) -> Result<ResolvedModule, Vec<ResolveError>> {
    let graph = &candidate.graph;
    let mut resolver = Resolver {
        graph,
        library: ctx.library,
        previous: ctx.previous,
        imports: candidate.imports.merged_with(ctx.imports),
        errors: Vec::new(),
        reported: BTreeSet::new(),
        edges: Vec::new(),
        external: BTreeSet::new(),
        narrations: BTreeMap::new(),
        claimed: BTreeMap::new(),
        versus: BTreeMap::new(),
    };

    let mut by_source: BTreeMap<&NodePath, Vec<&SymbolicRef>> = BTreeMap::new();
    for reference in &candidate.references {
        by_source.entry(&reference.source).or_default().push(reference);
    }

    for node in graph.walk() {
        let refs = by_source.get(&node.path).map(Vec::as_slice).unwrap_or_default();
        let steps = resolver.narration(node);
        resolver.clauses(node, refs, steps.as_deref());
        if let Some(steps) = steps {
            resolver.narrations.insert(node.path.clone(), steps);
        }
    }

    resolver.case_cycles();
    let case_groups = resolver.case_groups();
    resolver.finish(case_groups)
}

enum Lookup<'a> {
    Found(&'a Node),
    Ghost(NodeRef),
    Missing,
}

struct Resolver<'a> {
    graph: &'a ModuleGraph,
    library: &'a ModuleLibrary,
    previous: Option<&'a Snapshot>,
    imports: ImportTable,
    errors: Vec<ResolveError>,
    /// (node, name) pairs already reported as unresolved.
    reported: BTreeSet<(NodePath, NodePath)>,
    edges: Vec<Edge>,
    external: BTreeSet<NodeRef>,
    narrations: BTreeMap<NodePath, Vec<ResolvedStep>>,
    /// Expansion target → the deduction claiming it.
    claimed: BTreeMap<NodePath, NodePath>,
    /// Local `versus` declarations, source → targets.
    versus: BTreeMap<NodePath, Vec<NodePath>>,
}

impl<'a> Resolver<'a> {
    fn find(&self, path: &NodePath, pin: Option<&Version>) -> Option<&'a Node> {
        if let Some(node) = self.graph.get_node(path) {
            return Some(node);
        }
        self.library
            .owner(path, pin)
            .filter(|g| g.module() != self.graph.module())
            .and_then(|g| g.get_node(path))
    }

    fn lookup(&self, scope: &NodePath, name: &NodePath) -> Lookup<'a> {
        let module = self.graph.module();
        let mut tried = Vec::new();

        let mut current = Some(scope.clone());
        while let Some(dir) = current {
            let candidate = dir.join(name);
            if let Some(node) = self.graph.get_node(&candidate) {
                return Lookup::Found(node);
            }
            tried.push(candidate);
            if &dir == module {
                break;
            }
            current = dir.parent();
        }

        let head = &name.segments()[0];
        if let Some(target) = self.imports.get(head) {
            let path = match name.skip(1) {
                Some(rest) => target.path.join(&rest),
                None => target.path.clone(),
            };
            if let Some(node) = self.find(&path, target.version.as_ref()) {
                return Lookup::Found(node);
            }
            tried.push(path);
        }
        for glob in self.imports.globs() {
            let path = glob.path.join(name);
            if let Some(node) = self.find(&path, glob.version.as_ref()) {
                return Lookup::Found(node);
            }
            tried.push(path);
        }

        if let Some(node) = self.find(name, None) {
            return Lookup::Found(node);
        }
        tried.push(name.clone());

        match self.previous {
            Some(previous) => match tried.into_iter().find(|p| previous.contains(p)) {
                Some(path) => Lookup::Ghost(NodeRef::new(path, previous.version().clone())),
                None => Lookup::Missing,
            },
            None => Lookup::Missing,
        }
    }

    /// Resolve one name on behalf of `source`, recording ghosts and misses.
    fn reference(
        &mut self,
        source: &Node,
        scope: &NodePath,
        name: &NodePath,
        role: GhostRole,
    ) -> Option<&'a Node> {
        match self.lookup(scope, name) {
            Lookup::Found(node) => {
                if !self.graph.contains(&node.path) {
                    self.external.insert(node.node_ref());
                }
                Some(node)
            }
            Lookup::Ghost(target) => {
                tracing::warn!(
                    node = %source.path,
                    target = %target,
                    "reference only resolves in the previous version"
                );
                let edge = Edge::GhostReference {
                    source: source.node_ref(),
                    target,
                    role,
                };
                if !self.edges.contains(&edge) {
                    self.edges.push(edge);
                }
                None
            }
            Lookup::Missing => {
                if self.reported.insert((source.path.clone(), name.clone())) {
                    self.errors.push(ResolveError::Unresolved {
                        node: source.path.clone(),
                        name: name.clone(),
                    });
                }
                None
            }
        }
    }

    fn names(&mut self, owner: &Node, names: &[String]) -> Vec<&'a Node> {
        let mut out: Vec<&'a Node> = Vec::new();
        for name in names {
            let Ok(path) = NodePath::parse(name) else {
                continue;
            };
            if let Some(node) = self.reference(owner, &owner.path, &path, GhostRole::Narration) {
                if !out.iter().any(|n| n.path == node.path) {
                    out.push(node);
                }
            }
        }
        out
    }

    fn narration(&mut self, owner: &Node) -> Option<Vec<ResolvedStep>> {
        let steps = owner.narration.as_ref()?;
        let mut out = Vec::with_capacity(steps.len());
        for step in steps {
            let antecedents = self.names(owner, &step.antecedents);
            let conclusions = self.names(owner, &step.conclusions);
            for target in &conclusions {
                self.check_conclusion(owner, step, target);
            }
            let graph = self.graph;
            for from in antecedents.iter().filter(|n| graph.contains(&n.path)) {
                for to in &conclusions {
                    self.edges.push(Edge::Inference {
                        from: from.node_ref(),
                        to: to.node_ref(),
                        owner: owner.path.clone(),
                        step: step.index,
                    });
                }
            }
            out.push(ResolvedStep {
                index: step.index,
                connective: step.connective,
                antecedents: antecedents.iter().map(|n| n.node_ref()).collect(),
                conclusions: conclusions.iter().map(|n| n.node_ref()).collect(),
            });
        }
        Some(out)
    }

    fn check_conclusion(&mut self, owner: &Node, step: &NarrationStep, target: &Node) {
        if target.kind == NodeKind::SubDeduction {
            self.errors.push(ResolveError::ConcludesSubDeduction {
                node: owner.path.clone(),
                step: step.index,
                target: target.path.clone(),
            });
            return;
        }
        let supposing = step.connective == Connective::Suppose;
        let message = if supposing && !target.kind.is_modal() {
            format!(
                "only suppositions and introductions can be supposed, {} is a {}",
                target.path, target.kind
            )
        } else if !supposing && target.kind.is_modal() {
            format!(
                "{} {} is posited, it cannot be concluded",
                target.kind, target.path
            )
        } else {
            return;
        };
        self.errors.push(ResolveError::ModalMismatch {
            node: owner.path.clone(),
            step: step.index,
            target: target.path.clone(),
            message,
        });
    }

    fn clauses(&mut self, node: &'a Node, refs: &[&SymbolicRef], steps: Option<&[ResolvedStep]>) {
        let declared = refs.iter().filter(|r| r.role == RefRole::Expansion).count();
        let mut targets: Vec<&'a Node> = Vec::new();

        for reference in refs {
            let role = reference.role;
            let Some(target) =
                self.reference(node, &reference.scope, &reference.name, role.ghost_role())
            else {
                continue;
            };
            match role {
                RefRole::Expansion => {
                    self.check_expansion_target(node, target, declared);
                    if !targets.iter().any(|t| t.path == target.path) {
                        targets.push(target);
                    }
                }
                RefRole::Annotation => self.edges.push(Edge::Annotates {
                    source: node.node_ref(),
                    target: target.node_ref(),
                }),
                RefRole::AlternativeCase => {
                    if self.expect_supposition(node, role, target) {
                        self.edges.push(Edge::AlternativeCase {
                            source: node.node_ref(),
                            target: target.node_ref(),
                        });
                        if self.graph.contains(&target.path) {
                            self.versus
                                .entry(node.path.clone())
                                .or_default()
                                .push(target.path.clone());
                        }
                    }
                }
                RefRole::Contradiction => {
                    if self.expect_supposition(node, role, target) {
                        self.edges.push(Edge::Contradiction {
                            source: node.node_ref(),
                            target: target.node_ref(),
                        });
                    }
                }
            }
        }

        if !targets.is_empty() {
            self.expansion(node, &targets, steps);
        }
    }

    fn expect_supposition(&mut self, node: &Node, role: RefRole, target: &Node) -> bool {
        if target.kind == NodeKind::Supposition {
            return true;
        }
        self.errors.push(ResolveError::WrongTargetType {
            node: node.path.clone(),
            role: role.clause(),
            target: target.path.clone(),
            expected: "Supposition",
            found: target.kind,
        });
        false
    }

    fn check_expansion_target(&mut self, node: &Node, target: &Node, declared: usize) {
        let (ok, expected) = if declared > 1 {
            (target.kind == NodeKind::Assertion, "Assertion")
        } else {
            (
                matches!(
                    target.kind,
                    NodeKind::Assertion | NodeKind::Deduction | NodeKind::SubDeduction
                ),
                "Assertion or Deduction",
            )
        };
        if !ok {
            self.errors.push(ResolveError::WrongTargetType {
                node: node.path.clone(),
                role: RefRole::Expansion.clause(),
                target: target.path.clone(),
                expected,
                found: target.kind,
            });
        }
    }

    /// The top-level declaration containing `node`, in whichever graph owns it.
    fn top_level(&self, node: &Node) -> Option<NodePath> {
        let graph = if self.graph.contains(&node.path) {
            self.graph
        } else {
            self.library.owner(&node.path, Some(&node.version))?
        };
        graph.top_level_of(&node.path).map(|n| n.path.clone())
    }

    fn expansion(&mut self, node: &Node, targets: &[&'a Node], steps: Option<&[ResolvedStep]>) {
        if targets.len() > 1 {
            let tops: BTreeSet<Option<NodePath>> =
                targets.iter().map(|t| self.top_level(t)).collect();
            if tops.len() > 1 {
                self.errors.push(ResolveError::TargetsSpanDeductions {
                    node: node.path.clone(),
                    targets: targets.iter().map(|t| t.path.clone()).collect(),
                });
            }
        }

        for target in targets {
            let earlier = self.claimed.get(&target.path).cloned().or_else(|| {
                self.library
                    .expander_of(&target.path, self.graph.version(), self.graph.module())
                    .cloned()
            });
            match earlier {
                Some(first) => self.errors.push(ResolveError::DuplicateExpansion {
                    target: target.path.clone(),
                    first,
                    second: node.path.clone(),
                }),
                None => {
                    self.claimed.insert(target.path.clone(), node.path.clone());
                }
            }
        }

        let narrated = steps
            .into_iter()
            .flatten()
            .flat_map(|s| &s.conclusions)
            .any(|c| targets.iter().any(|t| t.path == c.path));
        self.edges.push(Edge::Expansion {
            source: node.node_ref(),
            targets: targets.iter().map(|t| t.node_ref()).collect(),
            origin: if narrated {
                ExpansionOrigin::Narrated
            } else {
                ExpansionOrigin::Declared
            },
        });
    }

    fn case_cycles(&mut self) {
        for cycle in find_cycles(&self.versus) {
            self.errors.push(ResolveError::CyclicCaseChain { cycle });
        }
    }

    /// Connected components of the symmetric `versus` relation.
    fn case_groups(&self) -> Vec<Vec<NodePath>> {
        let mut adjacency: BTreeMap<&NodePath, BTreeSet<&NodePath>> = BTreeMap::new();
        for (source, targets) in &self.versus {
            for target in targets {
                adjacency.entry(source).or_default().insert(target);
                adjacency.entry(target).or_default().insert(source);
            }
        }

        let mut seen: BTreeSet<&NodePath> = BTreeSet::new();
        let mut groups = Vec::new();
        for &start in adjacency.keys() {
            if !seen.insert(start) {
                continue;
            }
            let mut group = vec![start.clone()];
            let mut queue = VecDeque::from([start]);
            while let Some(next) = queue.pop_front() {
                for &neighbour in adjacency.get(next).into_iter().flatten() {
                    if seen.insert(neighbour) {
                        group.push(neighbour.clone());
                        queue.push_back(neighbour);
                    }
                }
            }
            group.sort();
            groups.push(group);
        }
        groups
    }

    fn finish(self, case_groups: Vec<Vec<NodePath>>) -> Result<ResolvedModule, Vec<ResolveError>> {
        let mut errors = self.errors;
        if !errors.is_empty() {
            return Err(errors);
        }

        let mut graph = self.graph.clone();
        for edge in self.edges {
            if let Err(e) = graph.add_edge(edge) {
                errors.push(e.into());
            }
        }
        if !errors.is_empty() {
            return Err(errors);
        }

        tracing::debug!(
            module = %graph.module(),
            version = %graph.version(),
            edges = graph.edge_count(),
            external = self.external.len(),
            "resolved module"
        );

        Ok(ResolvedModule {
            graph,
            narrations: self.narrations,
            external_refs: self.external,
            case_groups,
        })
    }
}
