//! Source language front end for Lemmata.
//!
//! Module text is tokenized with logos and parsed by hand into a
//! [`Module`] syntax tree. Narration fields are a separate little language
//! with their own parser, invoked by the graph builder.

pub mod ast;
pub mod error;
pub mod lexer;
pub mod narration;
pub mod parser;
pub mod printer;
pub mod span;

pub use ast::{
    Block, Clauses, Field, FieldValue, Import, ImportKind, ImportName, Item, Module, ModulePath,
};
pub use error::{NarrationSyntaxError, SyntaxError};
pub use narration::{parse_narration, split_sentences};
pub use parser::parse_module;
pub use printer::print_module;
pub use span::Span;
