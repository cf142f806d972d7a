//! The read-only table of already-compiled module graphs.
//!
//! During a batch build each module's resolved graph is inserted once,
//! after its layer completes; resolution of later layers only reads.

use std::collections::BTreeMap;
use std::fmt;

use lemmata_core::{ModuleGraph, Node, NodePath, NodeRef, Snapshot, Version};

/// A module at a specific version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId {
    pub path: NodePath,
    pub version: Version,
}

impl ModuleId {
    pub fn new(path: NodePath, version: Version) -> Self {
        Self { path, version }
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.path, self.version)
    }
}

/// Compiled module graphs, keyed by module path and version.
#[derive(Debug, Clone, Default)]
pub struct ModuleLibrary {
    modules: BTreeMap<NodePath, BTreeMap<Version, ModuleGraph>>,
}

impl ModuleLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a compiled module graph, replacing any graph with the same id.
    pub fn insert(&mut self, graph: ModuleGraph) -> Option<ModuleGraph> {
        self.modules
            .entry(graph.module().clone())
            .or_default()
            .insert(graph.version().clone(), graph)
    }

    /// Add every module of a snapshot.
    pub fn add_snapshot(&mut self, snapshot: &Snapshot) {
        for module in snapshot.modules() {
            if let Some(graph) = snapshot.module_graph(module) {
                self.insert(graph);
            }
        }
    }

    pub fn get(&self, id: &ModuleId) -> Option<&ModuleGraph> {
        self.modules.get(&id.path)?.get(&id.version)
    }

    pub fn contains_module(&self, path: &NodePath) -> bool {
        self.modules.contains_key(path)
    }

    /// Versions of `path` present in the library, ascending.
    pub fn versions(&self, path: &NodePath) -> Vec<&Version> {
        self.modules
            .get(path)
            .map(|v| v.keys().collect())
            .unwrap_or_default()
    }

    /// The graph of `path` at `pin`, or at its highest version when unpinned.
    pub fn select(&self, path: &NodePath, pin: Option<&Version>) -> Option<&ModuleGraph> {
        let versions = self.modules.get(path)?;
        match pin {
            Some(v) => versions.get(v),
            None => versions.values().next_back(),
        }
    }

    /// The graph holding the node at `path`. The owning module is the
    /// longest prefix of `path` present in the library.
    pub fn owner(&self, path: &NodePath, pin: Option<&Version>) -> Option<&ModuleGraph> {
        (1..path.len())
            .rev()
            .filter_map(|n| path.prefix(n))
            .filter_map(|module| self.select(&module, pin))
            .find(|graph| graph.contains(path))
    }

    /// Find the node at a fully-qualified path.
    pub fn locate(&self, path: &NodePath, pin: Option<&Version>) -> Option<&Node> {
        self.owner(path, pin)?.get_node(path)
    }

    /// Like [`locate`](Self::locate), returning the node's identity.
    pub fn locate_ref(&self, path: &NodePath, pin: Option<&Version>) -> Option<NodeRef> {
        self.locate(path, pin).map(Node::node_ref)
    }

    /// The source of an expansion edge targeting `target`, among modules
    /// compiled at `version` other than `exclude`.
    pub fn expander_of(
        &self,
        target: &NodePath,
        version: &Version,
        exclude: &NodePath,
    ) -> Option<&NodePath> {
        self.modules
            .iter()
            .filter(|(path, _)| *path != exclude)
            .filter_map(|(_, versions)| versions.get(version))
            .flat_map(|graph| graph.edges())
            .filter(|e| e.is_expansion())
            .find(|e| e.targets().iter().any(|t| &t.path == target))
            .map(|e| &e.source().path)
    }

    pub fn len(&self) -> usize {
        self.modules.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModuleGraph> {
        self.modules.values().flat_map(BTreeMap::values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lemmata_core::graph::node::FIELD_EN;
    use lemmata_core::NodeKind;

    fn p(s: &str) -> NodePath {
        NodePath::parse(s).unwrap()
    }

    fn graph(module: &str, version: Version, thm: &str) -> ModuleGraph {
        let m = p(module);
        let mut g = ModuleGraph::new(m.clone(), version.clone());
        g.add_node(Node::new(NodeKind::Deduction, m.child(thm), version.clone()), None)
            .unwrap();
        g.add_node(
            Node::new(NodeKind::Assertion, m.child(thm).child("C"), version).with_field(FIELD_EN, "c"),
            Some(&m.child(thm)),
        )
        .unwrap();
        g
    }

    #[test]
    fn highest_version_wins_when_unpinned() {
        let mut lib = ModuleLibrary::new();
        lib.insert(graph("alg", Version::new(1, 0, 0), "Old"));
        lib.insert(graph("alg", Version::new(1, 10, 0), "New"));
        lib.insert(graph("alg", Version::new(1, 9, 0), "Mid"));
        assert_eq!(lib.len(), 3);
        assert_eq!(
            lib.select(&p("alg"), None).unwrap().version(),
            &Version::new(1, 10, 0)
        );
        assert!(lib.locate(&p("alg.New.C"), None).is_some());
        assert!(lib.locate(&p("alg.Old.C"), None).is_none());
        let pinned = lib.locate_ref(&p("alg.Old.C"), Some(&Version::new(1, 0, 0))).unwrap();
        assert_eq!(pinned.version, Version::new(1, 0, 0));
    }

    #[test]
    fn nested_module_paths() {
        let mut lib = ModuleLibrary::new();
        lib.insert(graph("a", Version::new(1, 0, 0), "T"));
        lib.insert(graph("a.b", Version::new(1, 0, 0), "U"));
        assert!(lib.locate(&p("a.b.U.C"), None).is_some());
        assert!(lib.locate(&p("a.T.C"), None).is_some());
        assert!(lib.locate(&p("a.b"), None).is_none());
    }
}
