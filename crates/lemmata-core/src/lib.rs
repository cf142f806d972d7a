//! Core data model for the Lemmata deduction language.
//!
//! A proof library is compiled module by module into immutable
//! [`ModuleGraph`]s: one node per declared block (deductions, assertions,
//! suppositions, ...), addressed by a fully-qualified dotted [`NodePath`]
//! and tagged with the module's version. Resolved module graphs of one
//! library version are collected into a [`Snapshot`], which is what gets
//! persisted and what the validator diffs against its predecessor.
//!
//! Nothing here is ever mutated after construction: a new version produces
//! a new snapshot, and the previous one is passed around by reference.

pub mod changelog;
pub mod graph;
pub mod import;
pub mod path;
pub mod snapshot;

pub use changelog::{ChangeLog, ChangeLogEntry, ChangeLogError};
pub use graph::edge::{Edge, EdgeKind, ExpansionOrigin, GhostRole};
pub use graph::narration::{Connective, NarrationStep, ResolvedStep};
pub use graph::node::{Node, NodeKind};
pub use graph::{GraphError, ModuleGraph};
pub use import::{ImportTable, ImportTarget};
pub use path::{parse_version, NodePath, NodeRef, PathError, Version};
pub use snapshot::{IntegrityIssue, Snapshot, SnapshotError, SnapshotFile};
