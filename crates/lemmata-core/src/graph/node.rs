//! Node variants and the Node struct.
//!
//! A node is one declared block of a module: a deduction, a statement inside
//! it, or an annotation. Variants share the same structural shape (path,
//! fields, children) and differ only in which fields they accept and where
//! they may nest.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::narration::NarrationStep;
use crate::path::{NodePath, NodeRef, Version};

/// Natural-language text field.
pub const FIELD_EN: &str = "en";
/// Symbolic (typeset) text field.
pub const FIELD_SY: &str = "sy";
/// Proof narration field of deductions.
pub const FIELD_NARRATION: &str = "narration";
/// Raw annotation body.
pub const FIELD_BODY: &str = "body";

/// The closed set of node variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NodeKind {
    Deduction,
    SubDeduction,
    Assertion,
    Supposition,
    /// A `flse` node: the contradiction reached under one or more suppositions.
    Falsum,
    Existential,
    Introduction,
    Annotation,
}

impl NodeKind {
    pub const ALL: [NodeKind; 8] = [
        NodeKind::Deduction,
        NodeKind::SubDeduction,
        NodeKind::Assertion,
        NodeKind::Supposition,
        NodeKind::Falsum,
        NodeKind::Existential,
        NodeKind::Introduction,
        NodeKind::Annotation,
    ];

    /// The source keyword introducing a block of this kind.
    pub fn keyword(&self) -> &'static str {
        match self {
            NodeKind::Deduction => "deduc",
            NodeKind::SubDeduction => "subdeduc",
            NodeKind::Assertion => "asrt",
            NodeKind::Supposition => "supp",
            NodeKind::Falsum => "flse",
            NodeKind::Existential => "exis",
            NodeKind::Introduction => "intr",
            NodeKind::Annotation => "anno",
        }
    }

    pub fn from_keyword(word: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.keyword() == word)
    }

    /// Deductions and sub-deductions own children and a narration.
    pub fn is_deductive(&self) -> bool {
        matches!(self, NodeKind::Deduction | NodeKind::SubDeduction)
    }

    /// Suppositions and introductions are modal: they are posited, never concluded.
    pub fn is_modal(&self) -> bool {
        matches!(self, NodeKind::Supposition | NodeKind::Introduction)
    }

    /// Field names a block of this kind may carry.
    pub fn allowed_fields(&self) -> &'static [&'static str] {
        match self {
            NodeKind::Deduction | NodeKind::SubDeduction => &[FIELD_EN, FIELD_NARRATION],
            NodeKind::Annotation => &[FIELD_BODY],
            _ => &[FIELD_EN, FIELD_SY],
        }
    }

    /// At least one of these fields must be present (empty means no requirement).
    pub fn required_fields(&self) -> &'static [&'static str] {
        match self {
            NodeKind::Assertion | NodeKind::Supposition | NodeKind::Introduction => {
                &[FIELD_EN, FIELD_SY]
            }
            NodeKind::Annotation => &[FIELD_BODY],
            _ => &[],
        }
    }

    /// Whether a block of kind `child` may be declared directly inside this one.
    pub fn may_contain(&self, child: NodeKind) -> bool {
        match self {
            NodeKind::Deduction | NodeKind::SubDeduction => {
                !matches!(child, NodeKind::Deduction | NodeKind::Annotation)
            }
            NodeKind::Existential => matches!(
                child,
                NodeKind::Introduction
                    | NodeKind::Assertion
                    | NodeKind::Supposition
                    | NodeKind::Falsum
                    | NodeKind::Existential
            ),
            _ => false,
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeKind::Deduction => "Deduction",
            NodeKind::SubDeduction => "SubDeduction",
            NodeKind::Assertion => "Assertion",
            NodeKind::Supposition => "Supposition",
            NodeKind::Falsum => "Falsum",
            NodeKind::Existential => "Existential",
            NodeKind::Introduction => "Introduction",
            NodeKind::Annotation => "Annotation",
        };
        write!(f, "{name}")
    }
}

/// A node in a compiled module graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Fully-qualified path, unique within the module version.
    pub path: NodePath,
    /// Version of the owning module.
    #[serde(with = "crate::path::version_tag")]
    pub version: Version,
    pub kind: NodeKind,
    /// Field name to text content. Annotation bodies are kept verbatim.
    pub fields: BTreeMap<String, String>,
    /// Directly nested nodes, in declaration order.
    pub children: Vec<NodePath>,
    /// Parsed narration; present only on deductions that declare one.
    pub narration: Option<Vec<NarrationStep>>,
    /// "Without loss of generality" marker on suppositions.
    #[serde(default)]
    pub wolog: bool,
}

impl Node {
    pub fn new(kind: NodeKind, path: NodePath, version: Version) -> Self {
        Self {
            path,
            version,
            kind,
            fields: BTreeMap::new(),
            children: Vec::new(),
            narration: None,
            wolog: false,
        }
    }

    pub fn with_field(mut self, name: &str, value: impl Into<String>) -> Self {
        self.fields.insert(name.to_string(), value.into());
        self
    }

    pub fn with_narration(mut self, steps: Vec<NarrationStep>) -> Self {
        self.narration = Some(steps);
        self
    }

    pub fn with_wolog(mut self, wolog: bool) -> Self {
        self.wolog = wolog;
        self
    }

    /// The node's own name (last path segment).
    pub fn name(&self) -> &str {
        self.path.name()
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn node_ref(&self) -> NodeRef {
        NodeRef::new(self.path.clone(), self.version.clone())
    }

    /// Field names present on this node that its variant does not accept.
    pub fn unknown_fields(&self) -> Vec<&str> {
        let allowed = self.kind.allowed_fields();
        self.fields
            .keys()
            .map(String::as_str)
            .filter(|name| !allowed.contains(name))
            .collect()
    }

    /// Whether the variant's "at least one of" field requirement is met.
    pub fn has_required_fields(&self) -> bool {
        let required = self.kind.required_fields();
        required.is_empty() || required.iter().any(|f| self.fields.contains_key(*f))
    }
}
