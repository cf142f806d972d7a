//! Typed edges between node identities.
//!
//! Containment is not stored as an edge; it is implied by
//! [`Node::children`](super::node::Node::children). Every other relation is
//! an explicit [`Edge`] whose endpoints are [`NodeRef`]s, so an edge may point
//! into another module or another version.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::path::{NodePath, NodeRef};

/// What supports an expansion edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpansionOrigin {
    /// Only the deduction's `of` clause.
    Declared,
    /// The `of` clause, confirmed by a narration step of the same
    /// deduction that concludes one of the declared targets.
    Narrated,
}

/// The role a reference played when it turned out to point at a node that
/// no longer exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GhostRole {
    Expansion,
    Narration,
    Contradiction,
    AlternativeCase,
    Annotation,
    /// Synthesized by the validator for a retargeted expansion.
    Retarget,
}

/// The discriminant of an [`Edge`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EdgeKind {
    Expansion,
    Contradiction,
    AlternativeCase,
    Annotates,
    Inference,
    GhostReference,
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EdgeKind::Expansion => "EXPANDS",
            EdgeKind::Contradiction => "CONTRADICTS",
            EdgeKind::AlternativeCase => "VERSUS",
            EdgeKind::Annotates => "ANNOTATES",
            EdgeKind::Inference => "IMPLIES",
            EdgeKind::GhostReference => "GHOST",
        };
        write!(f, "{name}")
    }
}

/// A directed, typed relation in a deduction graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Edge {
    /// Deduction `source` proves every node in `targets`.
    Expansion {
        source: NodeRef,
        targets: Vec<NodeRef>,
        origin: ExpansionOrigin,
    },
    /// A `flse` node contradicts the supposition `target`.
    Contradiction { source: NodeRef, target: NodeRef },
    /// Supposition `source` is declared `versus` supposition `target`.
    AlternativeCase { source: NodeRef, target: NodeRef },
    /// An annotation is attached to `target` via its `on` clause.
    Annotates { source: NodeRef, target: NodeRef },
    /// Narration step `step` of deduction `owner` infers `to` from `from`.
    Inference {
        from: NodeRef,
        to: NodeRef,
        owner: NodePath,
        step: usize,
    },
    /// A reference from `source` to a node that existed in a previous
    /// version but does not resolve in the current one.
    GhostReference {
        source: NodeRef,
        target: NodeRef,
        role: GhostRole,
    },
}

impl Edge {
    pub fn kind(&self) -> EdgeKind {
        match self {
            Edge::Expansion { .. } => EdgeKind::Expansion,
            Edge::Contradiction { .. } => EdgeKind::Contradiction,
            Edge::AlternativeCase { .. } => EdgeKind::AlternativeCase,
            Edge::Annotates { .. } => EdgeKind::Annotates,
            Edge::Inference { .. } => EdgeKind::Inference,
            Edge::GhostReference { .. } => EdgeKind::GhostReference,
        }
    }

    /// The tail of the edge.
    pub fn source(&self) -> &NodeRef {
        match self {
            Edge::Expansion { source, .. }
            | Edge::Contradiction { source, .. }
            | Edge::AlternativeCase { source, .. }
            | Edge::Annotates { source, .. }
            | Edge::GhostReference { source, .. } => source,
            Edge::Inference { from, .. } => from,
        }
    }

    /// The heads of the edge. Only expansions have more than one.
    pub fn targets(&self) -> Vec<&NodeRef> {
        match self {
            Edge::Expansion { targets, .. } => targets.iter().collect(),
            Edge::Contradiction { target, .. }
            | Edge::AlternativeCase { target, .. }
            | Edge::Annotates { target, .. }
            | Edge::GhostReference { target, .. } => vec![target],
            Edge::Inference { to, .. } => vec![to],
        }
    }

    /// Source followed by all targets.
    pub fn endpoints(&self) -> Vec<&NodeRef> {
        let mut out = vec![self.source()];
        out.extend(self.targets());
        out
    }

    pub fn is_expansion(&self) -> bool {
        matches!(self, Edge::Expansion { .. })
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let targets: Vec<String> = self.targets().iter().map(|t| t.to_string()).collect();
        write!(f, "{} -[{}]-> {}", self.source(), self.kind(), targets.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::Version;

    fn r(s: &str) -> NodeRef {
        NodeRef::new(NodePath::parse(s).unwrap(), Version::new(1, 0, 0))
    }

    #[test]
    fn expansion_endpoints() {
        let e = Edge::Expansion {
            source: r("m.Pf"),
            targets: vec![r("m.Thm.C1"), r("m.Thm.C3")],
            origin: ExpansionOrigin::Declared,
        };
        assert_eq!(e.kind(), EdgeKind::Expansion);
        assert_eq!(e.source(), &r("m.Pf"));
        assert_eq!(e.targets().len(), 2);
        assert_eq!(e.endpoints().len(), 3);
        assert_eq!(
            e.to_string(),
            "m.Pf@1.0.0 -[EXPANDS]-> m.Thm.C1@1.0.0, m.Thm.C3@1.0.0"
        );
    }

    #[test]
    fn serde_tagged_form() {
        let e = Edge::Contradiction {
            source: r("m.Thm.F"),
            target: r("m.Thm.S"),
        };
        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json["kind"], "contradiction");
        let back: Edge = serde_json::from_value(json).unwrap();
        assert_eq!(back, e);
    }
}
