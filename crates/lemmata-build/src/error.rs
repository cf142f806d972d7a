//! Build, resolution, and compilation error types.

use std::fmt;

use lemmata_core::{GraphError, NodeKind, NodePath, Version};
use lemmata_lang::{NarrationSyntaxError, SyntaxError};
use thiserror::Error;

/// A local structural problem found while building a candidate graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Narration(#[from] NarrationSyntaxError),

    #[error("'{clause}' clause of {node} names the node itself")]
    SelfReference { node: NodePath, clause: &'static str },

    #[error("{node} lists '{target}' more than once in its '{clause}' clause")]
    DuplicateTarget {
        node: NodePath,
        clause: &'static str,
        target: NodePath,
    },

    #[error("field '{field}' of {node} must be a '@@@' raw block")]
    BodyNotRaw { node: NodePath, field: String },

    #[error("relative import '{import}' in {module} climbs above the library root")]
    InvalidImport { module: NodePath, import: String },
}

/// Every local problem found in one module, reported together.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct GraphConstructionError {
    pub module: NodePath,
    pub errors: Vec<BuildError>,
}

impl fmt::Display for GraphConstructionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} construction error(s) in module {}",
            self.errors.len(),
            self.module
        )?;
        for e in &self.errors {
            write!(f, "\n  {e}")?;
        }
        Ok(())
    }
}

/// A reference that could not be linked to a node of the right kind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("unresolved reference '{name}' in {node}")]
    Unresolved { node: NodePath, name: NodePath },

    #[error("'{role}' target {target} of {node} is a {found}, expected {expected}")]
    WrongTargetType {
        node: NodePath,
        role: &'static str,
        target: NodePath,
        expected: &'static str,
        found: NodeKind,
    },

    #[error("targets of {node} belong to different deductions: {}", list(.targets))]
    TargetsSpanDeductions { node: NodePath, targets: Vec<NodePath> },

    #[error("narration of {node}, step {step}: {message}")]
    ModalMismatch {
        node: NodePath,
        step: usize,
        target: NodePath,
        message: String,
    },

    #[error("narration of {node}, step {step}: sub-deduction {target} cannot be concluded")]
    ConcludesSubDeduction {
        node: NodePath,
        step: usize,
        target: NodePath,
    },

    #[error("{target} is expanded by both {first} and {second}")]
    DuplicateExpansion {
        target: NodePath,
        first: NodePath,
        second: NodePath,
    },

    #[error("cyclic 'versus' chain: {}", join(.cycle))]
    CyclicCaseChain { cycle: Vec<NodePath> },

    #[error(transparent)]
    Graph(#[from] GraphError),
}

impl ResolveError {
    /// The node the error is reported against.
    pub fn node(&self) -> Option<&NodePath> {
        match self {
            ResolveError::Unresolved { node, .. }
            | ResolveError::WrongTargetType { node, .. }
            | ResolveError::TargetsSpanDeductions { node, .. }
            | ResolveError::ModalMismatch { node, .. }
            | ResolveError::ConcludesSubDeduction { node, .. } => Some(node),
            ResolveError::DuplicateExpansion { second, .. } => Some(second),
            ResolveError::CyclicCaseChain { cycle } => cycle.first(),
            ResolveError::Graph(_) => None,
        }
    }
}

/// Why one module of a batch failed to compile.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("{module}@{version}: {error}")]
    Syntax {
        module: NodePath,
        version: Version,
        error: SyntaxError,
    },

    #[error(transparent)]
    Construction(#[from] GraphConstructionError),

    #[error("{} resolution error(s) in module {module}", .errors.len())]
    Resolve {
        module: NodePath,
        errors: Vec<ResolveError>,
    },

    #[error("module {module} is part of an import cycle: {}", join(.cycle))]
    CyclicImport {
        module: NodePath,
        cycle: Vec<NodePath>,
    },

    #[error("module {module} imports {dependency}, which failed to compile")]
    DependencyFailed {
        module: NodePath,
        dependency: NodePath,
    },
}

fn list(paths: &[NodePath]) -> String {
    paths
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn join(paths: &[NodePath]) -> String {
    paths
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}
