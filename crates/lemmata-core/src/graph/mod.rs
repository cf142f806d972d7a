//! Module graphs: the nodes and edges compiled from one module version.
//!
//! A [`ModuleGraph`] owns every node declared in a module, keyed by path,
//! plus the edges whose source lies in that module. Containment is carried
//! by each node's `children` list; the top-level declarations are kept in
//! `roots`, in source order.

pub mod edge;
pub mod narration;
pub mod node;

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use self::edge::Edge;
use self::node::{Node, NodeKind};
use crate::path::{NodePath, Version};

/// Errors that can occur during graph construction or validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("node not found: {0}")]
    NodeNotFound(NodePath),

    #[error("duplicate node path: {0}")]
    DuplicatePath(NodePath),

    #[error("node {node} does not belong to module {module}")]
    ForeignNode { node: NodePath, module: NodePath },

    #[error("node {node} has version {found}, module is at {expected}")]
    VersionMismatch {
        node: NodePath,
        expected: Version,
        found: Version,
    },

    #[error("{kind} edge from {src} is dangling: {dst} is not a node of this module")]
    DanglingEdge {
        kind: String,
        src: NodePath,
        dst: NodePath,
    },

    #[error("node {0} is the source of more than one expansion edge")]
    MultipleExpansion(NodePath),

    #[error("{kind} {node} may not contain a {child} block")]
    IllegalNesting {
        node: NodePath,
        kind: NodeKind,
        child: NodeKind,
    },

    #[error("{kind} {node} has unknown field '{field}'")]
    UnknownField {
        node: NodePath,
        kind: NodeKind,
        field: String,
    },

    #[error("{kind} {node} requires at least one of the fields: {expected}")]
    MissingField {
        node: NodePath,
        kind: NodeKind,
        expected: String,
    },
}

/// The compiled graph of a single module version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleGraph {
    module: NodePath,
    #[serde(with = "crate::path::version_tag")]
    version: Version,
    nodes: BTreeMap<NodePath, Node>,
    /// Top-level declarations, in source order.
    roots: Vec<NodePath>,
    edges: Vec<Edge>,
}

impl ModuleGraph {
    /// Create an empty graph for `module` at `version`.
    pub fn new(module: NodePath, version: Version) -> Self {
        Self {
            module,
            version,
            nodes: BTreeMap::new(),
            roots: Vec::new(),
            edges: Vec::new(),
        }
    }

    /// Reassemble a graph from stored parts without re-checking them.
    /// Call [`validate`](Self::validate) on the result.
    pub fn from_parts(
        module: NodePath,
        version: Version,
        nodes: impl IntoIterator<Item = Node>,
        roots: Vec<NodePath>,
        edges: Vec<Edge>,
    ) -> Self {
        Self {
            module,
            version,
            nodes: nodes.into_iter().map(|n| (n.path.clone(), n)).collect(),
            roots,
            edges,
        }
    }

    pub fn module(&self) -> &NodePath {
        &self.module
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    /// Insert a node, nested under `parent` (or at top level when `None`).
    ///
    /// The node's path must lie inside the module, be unused, and match the
    /// parent's path plus one segment.
    pub fn add_node(&mut self, node: Node, parent: Option<&NodePath>) -> Result<(), GraphError> {
        let path = node.path.clone();
        if path.strip_prefix(&self.module).is_none() {
            return Err(GraphError::ForeignNode {
                node: path,
                module: self.module.clone(),
            });
        }
        if node.version != self.version {
            return Err(GraphError::VersionMismatch {
                node: path,
                expected: self.version.clone(),
                found: node.version.clone(),
            });
        }
        if self.nodes.contains_key(&path) {
            return Err(GraphError::DuplicatePath(path));
        }
        match parent {
            Some(parent_path) => {
                let parent_node = self
                    .nodes
                    .get_mut(parent_path)
                    .ok_or_else(|| GraphError::NodeNotFound(parent_path.clone()))?;
                if !parent_node.kind.may_contain(node.kind) {
                    return Err(GraphError::IllegalNesting {
                        node: parent_path.clone(),
                        kind: parent_node.kind,
                        child: node.kind,
                    });
                }
                parent_node.children.push(path.clone());
            }
            None => self.roots.push(path.clone()),
        }
        self.nodes.insert(path, node);
        Ok(())
    }

    /// Insert an edge. Its source must be a node of this module, and a node
    /// may be the source of at most one expansion edge.
    pub fn add_edge(&mut self, edge: Edge) -> Result<(), GraphError> {
        let source = &edge.source().path;
        if !self.nodes.contains_key(source) {
            return Err(GraphError::DanglingEdge {
                kind: edge.kind().to_string(),
                src: source.clone(),
                dst: source.clone(),
            });
        }
        if edge.is_expansion() && self.expansion_of(source).is_some() {
            return Err(GraphError::MultipleExpansion(source.clone()));
        }
        self.edges.push(edge);
        Ok(())
    }

    pub fn get_node(&self, path: &NodePath) -> Option<&Node> {
        self.nodes.get(path)
    }

    pub fn contains(&self, path: &NodePath) -> bool {
        self.nodes.contains_key(path)
    }

    /// Iterate over all nodes in path order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn roots(&self) -> &[NodePath] {
        &self.roots
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// The enclosing node, if `path` is nested.
    pub fn parent_of(&self, path: &NodePath) -> Option<&Node> {
        let parent = path.parent()?;
        self.nodes.get(&parent)
    }

    /// Enclosing nodes from the innermost outward.
    pub fn ancestors(&self, path: &NodePath) -> Vec<&Node> {
        let mut out = Vec::new();
        let mut current = path.parent();
        while let Some(p) = current {
            match self.nodes.get(&p) {
                Some(node) => out.push(node),
                None => break,
            }
            current = p.parent();
        }
        out
    }

    /// The nearest enclosing deduction or sub-deduction.
    pub fn enclosing_deduction(&self, path: &NodePath) -> Option<&Node> {
        self.ancestors(path)
            .into_iter()
            .find(|n| n.kind.is_deductive())
    }

    /// The top-level declaration containing `path` (or `path` itself).
    pub fn top_level_of(&self, path: &NodePath) -> Option<&Node> {
        let rel = path.strip_prefix(&self.module)?;
        self.nodes.get(&self.module.child(&rel.segments()[0]))
    }

    /// The expansion edge leaving `source`, if any.
    pub fn expansion_of(&self, source: &NodePath) -> Option<&Edge> {
        self.edges
            .iter()
            .find(|e| e.is_expansion() && &e.source().path == source)
    }

    /// All nodes in depth-first pre-order, following source order.
    pub fn walk(&self) -> Vec<&Node> {
        fn visit<'a>(graph: &'a ModuleGraph, path: &NodePath, out: &mut Vec<&'a Node>) {
            if let Some(node) = graph.nodes.get(path) {
                out.push(node);
                for child in &node.children {
                    visit(graph, child, out);
                }
            }
        }
        let mut out = Vec::with_capacity(self.nodes.len());
        for root in &self.roots {
            visit(self, root, &mut out);
        }
        out
    }

    /// Validate structural well-formedness.
    ///
    /// Checks:
    /// - Every node lies inside the module and carries the module version
    /// - Every child listed by a node exists and is reachable from the roots
    /// - Field schemas per variant
    /// - Edges with endpoints inside this module point at existing nodes
    /// - At most one expansion edge per source
    pub fn validate(&self) -> Result<(), Vec<GraphError>> {
        let mut errors = Vec::new();

        for node in self.nodes.values() {
            if node.path.strip_prefix(&self.module).is_none() {
                errors.push(GraphError::ForeignNode {
                    node: node.path.clone(),
                    module: self.module.clone(),
                });
            }
            if node.version != self.version {
                errors.push(GraphError::VersionMismatch {
                    node: node.path.clone(),
                    expected: self.version.clone(),
                    found: node.version.clone(),
                });
            }
            for child in &node.children {
                if !self.nodes.contains_key(child) {
                    errors.push(GraphError::NodeNotFound(child.clone()));
                }
            }
            errors.extend(check_fields(node));
        }

        let reachable = self.walk().len();
        if reachable != self.nodes.len() {
            let seen: BTreeSet<&NodePath> = self.walk().into_iter().map(|n| &n.path).collect();
            for path in self.nodes.keys().filter(|p| !seen.contains(p)) {
                errors.push(GraphError::NodeNotFound(path.clone()));
            }
        }

        let mut expanders = BTreeSet::new();
        for edge in &self.edges {
            for endpoint in edge.endpoints() {
                let local = endpoint.path.starts_with(&self.module)
                    && endpoint.version == self.version;
                if local
                    && edge.kind() != edge::EdgeKind::GhostReference
                    && !self.nodes.contains_key(&endpoint.path)
                {
                    errors.push(GraphError::DanglingEdge {
                        kind: edge.kind().to_string(),
                        src: edge.source().path.clone(),
                        dst: endpoint.path.clone(),
                    });
                }
            }
            if edge.is_expansion() && !expanders.insert(edge.source().path.clone()) {
                errors.push(GraphError::MultipleExpansion(edge.source().path.clone()));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Check a node's fields against its variant's schema.
pub fn check_fields(node: &Node) -> Vec<GraphError> {
    let mut errors: Vec<GraphError> = node
        .unknown_fields()
        .into_iter()
        .map(|field| GraphError::UnknownField {
            node: node.path.clone(),
            kind: node.kind,
            field: field.to_string(),
        })
        .collect();
    if !node.has_required_fields() {
        errors.push(GraphError::MissingField {
            node: node.path.clone(),
            kind: node.kind,
            expected: node.kind.required_fields().join(", "),
        });
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::edge::ExpansionOrigin;
    use crate::graph::node::FIELD_EN;
    use crate::path::NodeRef;

    fn p(s: &str) -> NodePath {
        NodePath::parse(s).unwrap()
    }

    fn v1() -> Version {
        Version::new(1, 0, 0)
    }

    fn theorem_graph() -> ModuleGraph {
        let mut g = ModuleGraph::new(p("m"), v1());
        g.add_node(Node::new(NodeKind::Deduction, p("m.Thm"), v1()), None)
            .unwrap();
        g.add_node(
            Node::new(NodeKind::Assertion, p("m.Thm.C"), v1()).with_field(FIELD_EN, "c"),
            Some(&p("m.Thm")),
        )
        .unwrap();
        g.add_node(Node::new(NodeKind::Deduction, p("m.Pf"), v1()), None)
            .unwrap();
        g
    }

    #[test]
    fn empty_graph() {
        let g = ModuleGraph::new(p("m"), v1());
        assert_eq!(g.node_count(), 0);
        assert_eq!(g.edge_count(), 0);
        assert!(g.validate().is_ok());
    }

    #[test]
    fn containment_and_walk_order() {
        let g = theorem_graph();
        assert_eq!(g.roots(), &[p("m.Thm"), p("m.Pf")]);
        let order: Vec<String> = g.walk().iter().map(|n| n.path.to_string()).collect();
        assert_eq!(order, vec!["m.Thm", "m.Thm.C", "m.Pf"]);
        assert_eq!(g.parent_of(&p("m.Thm.C")).unwrap().path, p("m.Thm"));
        assert_eq!(g.top_level_of(&p("m.Thm.C")).unwrap().path, p("m.Thm"));
        assert!(g.validate().is_ok());
    }

    #[test]
    fn duplicate_path_rejected() {
        let mut g = theorem_graph();
        let err = g
            .add_node(Node::new(NodeKind::Deduction, p("m.Thm"), v1()), None)
            .unwrap_err();
        assert_eq!(err, GraphError::DuplicatePath(p("m.Thm")));
    }

    #[test]
    fn foreign_and_misversioned_nodes_rejected() {
        let mut g = ModuleGraph::new(p("m"), v1());
        assert!(matches!(
            g.add_node(Node::new(NodeKind::Deduction, p("other.Thm"), v1()), None),
            Err(GraphError::ForeignNode { .. })
        ));
        assert!(matches!(
            g.add_node(
                Node::new(NodeKind::Deduction, p("m.Thm"), Version::new(2, 0, 0)),
                None
            ),
            Err(GraphError::VersionMismatch { .. })
        ));
    }

    #[test]
    fn illegal_nesting_rejected() {
        let mut g = theorem_graph();
        let err = g
            .add_node(
                Node::new(NodeKind::Assertion, p("m.Thm.C.D"), v1()).with_field(FIELD_EN, "d"),
                Some(&p("m.Thm.C")),
            )
            .unwrap_err();
        assert!(matches!(err, GraphError::IllegalNesting { .. }));
    }

    #[test]
    fn single_expansion_per_source() {
        let mut g = theorem_graph();
        let edge = Edge::Expansion {
            source: NodeRef::new(p("m.Pf"), v1()),
            targets: vec![NodeRef::new(p("m.Thm.C"), v1())],
            origin: ExpansionOrigin::Declared,
        };
        g.add_edge(edge.clone()).unwrap();
        assert_eq!(
            g.add_edge(edge).unwrap_err(),
            GraphError::MultipleExpansion(p("m.Pf"))
        );
        assert!(g.expansion_of(&p("m.Pf")).is_some());
        assert!(g.validate().is_ok());
    }

    #[test]
    fn validate_reports_missing_fields() {
        let mut g = theorem_graph();
        g.add_node(
            Node::new(NodeKind::Supposition, p("m.Thm.S"), v1()),
            Some(&p("m.Thm")),
        )
        .unwrap();
        let errors = g.validate().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("requires at least one of"));
    }

    #[test]
    fn validate_reports_dangling_local_edge() {
        let mut g = theorem_graph();
        g.add_edge(Edge::Expansion {
            source: NodeRef::new(p("m.Pf"), v1()),
            targets: vec![NodeRef::new(p("m.Thm.Missing"), v1())],
            origin: ExpansionOrigin::Declared,
        })
        .unwrap();
        let errors = g.validate().unwrap_err();
        assert!(matches!(errors[0], GraphError::DanglingEdge { .. }));
    }
}
