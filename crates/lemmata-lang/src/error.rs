use lemmata_core::NodePath;
use thiserror::Error;

/// Malformed module source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("syntax error at line {line}, column {col}: {message}")]
pub struct SyntaxError {
    pub line: u32,
    pub col: u32,
    pub message: String,
}

/// A narration sentence that matches none of the sentence forms.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("narration of {node}: {message} in sentence \"{sentence}\"")]
pub struct NarrationSyntaxError {
    /// The deduction owning the narration.
    pub node: NodePath,
    pub sentence: String,
    pub message: String,
}
