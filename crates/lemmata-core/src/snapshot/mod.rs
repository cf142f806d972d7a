//! Library snapshots: the complete resolved graph of one library version.
//!
//! A snapshot is assembled once from the resolved module graphs of a build
//! and never mutated afterwards. The validator compares the snapshot of the
//! version being published against the snapshot of its predecessor.

pub mod format;

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::graph::edge::Edge;
use crate::graph::narration::ResolvedStep;
use crate::graph::node::Node;
use crate::graph::ModuleGraph;
use crate::path::{NodePath, NodeRef, Version};

pub use format::{SnapshotError, SnapshotFile};

/// A structural defect in data the toolchain itself assembled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrityIssue {
    pub path: NodePath,
    pub message: String,
}

/// The resolved graph of every module in one library version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    library: String,
    #[serde(with = "crate::path::version_tag")]
    version: Version,
    /// Module path → its top-level declarations, in source order.
    modules: BTreeMap<NodePath, Vec<NodePath>>,
    nodes: BTreeMap<NodePath, Node>,
    edges: Vec<Edge>,
    /// Resolved narration steps, keyed by owning deduction.
    #[serde(default)]
    narrations: BTreeMap<NodePath, Vec<ResolvedStep>>,
    /// Nodes of other libraries (or other versions) referenced by edges.
    #[serde(default)]
    external: BTreeSet<NodeRef>,
}

impl Snapshot {
    pub fn new(library: impl Into<String>, version: Version) -> Self {
        Self {
            library: library.into(),
            version,
            modules: BTreeMap::new(),
            nodes: BTreeMap::new(),
            edges: Vec::new(),
            narrations: BTreeMap::new(),
            external: BTreeSet::new(),
        }
    }

    /// Add the resolved graph of one module.
    ///
    /// Fails if the module was already added or if any of its node paths is
    /// already taken by another module.
    pub fn add_module(
        &mut self,
        graph: &ModuleGraph,
        narrations: &BTreeMap<NodePath, Vec<ResolvedStep>>,
        external: impl IntoIterator<Item = NodeRef>,
    ) -> Result<(), SnapshotError> {
        if self.modules.contains_key(graph.module()) {
            return Err(SnapshotError::DuplicatePath(graph.module().clone()));
        }
        if let Some(dup) = graph.nodes().find(|n| self.nodes.contains_key(&n.path)) {
            return Err(SnapshotError::DuplicatePath(dup.path.clone()));
        }
        self.modules
            .insert(graph.module().clone(), graph.roots().to_vec());
        for node in graph.nodes() {
            self.nodes.insert(node.path.clone(), node.clone());
        }
        self.edges.extend(graph.edges().iter().cloned());
        for (owner, steps) in narrations {
            self.narrations.insert(owner.clone(), steps.clone());
        }
        self.external.extend(external);
        Ok(())
    }

    pub fn library(&self) -> &str {
        &self.library
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    pub fn modules(&self) -> impl Iterator<Item = &NodePath> {
        self.modules.keys()
    }

    /// Restore the graph of one module.
    pub fn module_graph(&self, module: &NodePath) -> Option<ModuleGraph> {
        let roots = self.modules.get(module)?;
        let nodes = self
            .nodes
            .values()
            .filter(|n| self.module_of(&n.path) == Some(module))
            .cloned();
        let edges = self
            .edges
            .iter()
            .filter(|e| self.module_of(&e.source().path) == Some(module))
            .cloned()
            .collect();
        Some(ModuleGraph::from_parts(
            module.clone(),
            self.version.clone(),
            nodes,
            roots.clone(),
            edges,
        ))
    }

    /// The module owning `path`: the longest module path that prefixes it.
    pub fn module_of(&self, path: &NodePath) -> Option<&NodePath> {
        self.modules
            .keys()
            .filter(|m| path.strip_prefix(m).is_some())
            .max_by_key(|m| m.len())
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn node(&self, path: &NodePath) -> Option<&Node> {
        self.nodes.get(path)
    }

    pub fn contains(&self, path: &NodePath) -> bool {
        self.nodes.contains_key(path)
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn narration(&self, owner: &NodePath) -> Option<&[ResolvedStep]> {
        self.narrations.get(owner).map(Vec::as_slice)
    }

    pub fn narrations(&self) -> impl Iterator<Item = (&NodePath, &[ResolvedStep])> {
        self.narrations.iter().map(|(k, v)| (k, v.as_slice()))
    }

    pub fn external(&self) -> impl Iterator<Item = &NodeRef> {
        self.external.iter()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Whether `path` lies inside one of this snapshot's modules.
    pub fn owns(&self, path: &NodePath) -> bool {
        self.modules.keys().any(|m| path.starts_with(m))
    }

    /// Whether `node` names an existing node: either a local node of the
    /// same version or a recorded external node.
    pub fn resolves(&self, node: &NodeRef) -> bool {
        match self.nodes.get(&node.path) {
            Some(local) => local.version == node.version,
            None => !self.owns(&node.path) && self.external.contains(node),
        }
    }

    /// Expansion edges leaving `source`, in insertion order.
    pub fn expansions_from(&self, source: &NodePath) -> Vec<&Edge> {
        self.edges
            .iter()
            .filter(|e| e.is_expansion() && &e.source().path == source)
            .collect()
    }

    /// Source path → target paths of every expansion edge.
    pub fn expansion_map(&self) -> BTreeMap<&NodePath, Vec<&NodePath>> {
        let mut map: BTreeMap<&NodePath, Vec<&NodePath>> = BTreeMap::new();
        for edge in self.edges.iter().filter(|e| e.is_expansion()) {
            map.entry(&edge.source().path)
                .or_default()
                .extend(edge.targets().into_iter().map(|t| &t.path));
        }
        map
    }

    /// Target path → source paths of every expansion edge.
    pub fn expanders(&self) -> BTreeMap<&NodePath, BTreeSet<&NodePath>> {
        let mut map: BTreeMap<&NodePath, BTreeSet<&NodePath>> = BTreeMap::new();
        for edge in self.edges.iter().filter(|e| e.is_expansion()) {
            for target in edge.targets() {
                map.entry(&target.path)
                    .or_default()
                    .insert(&edge.source().path);
            }
        }
        map
    }

    /// Check structural integrity of the assembled data.
    ///
    /// None of these can be caused by source text; any issue found is a
    /// defect in the toolchain or a tampered snapshot.
    pub fn check_integrity(&self) -> Vec<IntegrityIssue> {
        let mut issues = Vec::new();
        let mut parents: BTreeMap<&NodePath, &NodePath> = BTreeMap::new();

        for (key, node) in &self.nodes {
            if key != &node.path {
                issues.push(IntegrityIssue {
                    path: key.clone(),
                    message: format!("stored under {key} but carries path {}", node.path),
                });
            }
            if !self.owns(key) {
                issues.push(IntegrityIssue {
                    path: key.clone(),
                    message: "node lies outside every module of the snapshot".to_string(),
                });
            }
            for child in &node.children {
                if !self.nodes.contains_key(child) {
                    issues.push(IntegrityIssue {
                        path: child.clone(),
                        message: format!("listed as a child of {key} but missing"),
                    });
                }
                if let Some(first) = parents.insert(child, key) {
                    issues.push(IntegrityIssue {
                        path: child.clone(),
                        message: format!("path assigned under both {first} and {key}"),
                    });
                }
            }
        }

        for edge in &self.edges {
            let source = &edge.source().path;
            if !self.nodes.contains_key(source) {
                issues.push(IntegrityIssue {
                    path: source.clone(),
                    message: format!("edge source missing: {edge}"),
                });
            }
        }

        issues.sort_by(|a, b| a.path.cmp(&b.path).then_with(|| a.message.cmp(&b.message)));
        issues
    }
}
