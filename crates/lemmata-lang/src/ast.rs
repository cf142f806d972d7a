//! Syntax tree of a module, as written.
//!
//! References in clauses are kept as written (relative dotted names); they
//! are resolved against the graph later.

use lemmata_core::{NodeKind, NodePath};
use serde::{Deserialize, Serialize};

use crate::span::Span;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub imports: Vec<Import>,
    pub blocks: Vec<Block>,
}

impl Module {
    /// Reset every span to the default, so trees can be compared by structure.
    pub fn erase_spans(&mut self) {
        for import in &mut self.imports {
            import.span = Span::default();
        }
        for block in &mut self.blocks {
            block.erase_spans();
        }
    }
}

/// A module path in an import, possibly relative (`..sibling.mod`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModulePath {
    /// Number of leading dots. One dot is the importing module's own package.
    pub dots: usize,
    /// Segments after the dots; empty only for `from . import x`.
    pub segments: Vec<String>,
}

impl std::fmt::Display for ModulePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", ".".repeat(self.dots), self.segments.join("."))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportName {
    pub name: String,
    pub alias: Option<String>,
}

impl ImportName {
    /// The name bound in the importing module.
    pub fn local(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImportKind {
    /// `import a.b.c [as x]`
    Module { alias: Option<String> },
    /// `from a.b import *`
    Glob,
    /// `from a.b import X [as Y], Z`
    Names(Vec<ImportName>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Import {
    pub module: ModulePath,
    pub kind: ImportKind,
    pub span: Span,
}

/// The optional clauses between a block's name and its body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clauses {
    pub of: Vec<NodePath>,
    pub on: Vec<NodePath>,
    pub versus: Vec<NodePath>,
    pub contra: Vec<NodePath>,
    pub wolog: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldValue {
    /// `"..."`, escapes already processed
    Quoted(String),
    /// `@@@...@@@`, verbatim
    Raw(String),
}

impl FieldValue {
    pub fn text(&self) -> &str {
        match self {
            FieldValue::Quoted(s) | FieldValue::Raw(s) => s,
        }
    }

    pub fn is_raw(&self) -> bool {
        matches!(self, FieldValue::Raw(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub value: FieldValue,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Item {
    Field(Field),
    Block(Block),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub kind: NodeKind,
    pub name: String,
    pub clauses: Clauses,
    /// Fields and nested blocks in source order.
    pub items: Vec<Item>,
    pub span: Span,
}

impl Block {
    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.items.iter().filter_map(|item| match item {
            Item::Field(f) => Some(f),
            Item::Block(_) => None,
        })
    }

    pub fn children(&self) -> impl Iterator<Item = &Block> {
        self.items.iter().filter_map(|item| match item {
            Item::Block(b) => Some(b),
            Item::Field(_) => None,
        })
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields().find(|f| f.name == name)
    }

    fn erase_spans(&mut self) {
        self.span = Span::default();
        for item in &mut self.items {
            match item {
                Item::Field(f) => f.span = Span::default(),
                Item::Block(b) => b.erase_spans(),
            }
        }
    }
}
