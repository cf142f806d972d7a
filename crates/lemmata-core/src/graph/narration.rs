//! Narration steps: the parsed form of a deduction's proof narration.
//!
//! The narration parser produces [`NarrationStep`]s holding names exactly as
//! written; the resolver turns them into [`ResolvedStep`]s holding node
//! identities.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::path::NodeRef;

/// How a narration sentence connects to what came before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Connective {
    /// "Suppose S." / "Let I."
    Suppose,
    /// "From A and B get C."
    FromGet,
    /// "Next C." / "Now C." / a bare "C."
    Next,
    /// "Therefore D." (inherits the previous step's conclusions as antecedents)
    Therefore,
    /// "C by A and B."
    By,
    /// "C using M."
    Using,
}

impl fmt::Display for Connective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let word = match self {
            Connective::Suppose => "suppose",
            Connective::FromGet => "from-get",
            Connective::Next => "next",
            Connective::Therefore => "therefore",
            Connective::By => "by",
            Connective::Using => "using",
        };
        write!(f, "{word}")
    }
}

/// One sentence of a narration, with names as written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NarrationStep {
    /// 1-based sentence index within the narration.
    pub index: usize,
    /// The sentence text, trimmed, without its terminal period.
    pub sentence: String,
    pub connective: Connective,
    pub antecedents: Vec<String>,
    pub conclusions: Vec<String>,
}

impl NarrationStep {
    /// All names referenced by this step, antecedents first, without repeats.
    pub fn references(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for name in self.antecedents.iter().chain(self.conclusions.iter()) {
            if !out.contains(&name.as_str()) {
                out.push(name);
            }
        }
        out
    }
}

/// A narration step whose names have been resolved to concrete nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedStep {
    pub index: usize,
    pub connective: Connective,
    pub antecedents: Vec<NodeRef>,
    pub conclusions: Vec<NodeRef>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn references_are_deduplicated_in_order() {
        let step = NarrationStep {
            index: 2,
            sentence: "From A and B get A2 by B".into(),
            connective: Connective::FromGet,
            antecedents: vec!["A".into(), "B".into()],
            conclusions: vec!["A2".into(), "B".into()],
        };
        assert_eq!(step.references(), vec!["A", "B", "A2"]);
    }
}
