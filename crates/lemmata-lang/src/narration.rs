//! Narration parser.
//!
//! A narration is a short prose account of a proof's logical flow:
//!
//! ```text
//! Suppose S. From A and B get C by Lem. Therefore D. E using M.
//! ```
//!
//! Each sentence becomes one [`NarrationStep`]. Names are kept as written;
//! the resolver maps them to nodes.

use lemmata_core::{Connective, NarrationStep, NodePath};
use logos::Logos;

use crate::error::NarrationSyntaxError;

#[derive(Logos, Debug, PartialEq, Clone, Copy)]
#[logos(skip r"\s+")]
enum Word<'a> {
    #[regex(r"[A-Za-z_][A-Za-z0-9_.]*", |lex| lex.slice())]
    Name(&'a str),

    #[regex(r"[,;]")]
    Sep,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kw {
    Suppose,
    From,
    Get,
    Therefore,
    Next,
    By,
    Using,
    And,
}

fn keyword(word: &str) -> Option<Kw> {
    let kw = match word.to_ascii_lowercase().as_str() {
        "suppose" | "let" => Kw::Suppose,
        "from" => Kw::From,
        "get" | "infer" | "obtain" => Kw::Get,
        "therefore" | "hence" | "thus" | "so" | "then" => Kw::Therefore,
        "next" | "now" => Kw::Next,
        "by" => Kw::By,
        "using" => Kw::Using,
        "and" => Kw::And,
        _ => return None,
    };
    Some(kw)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tok<'a> {
    Kw(Kw),
    Name(&'a str),
    Sep,
}

/// Split narration text into sentences. A sentence ends at a `.` followed
/// by whitespace or the end of the text; a trailing sentence without a
/// period is accepted.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let bytes = text.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if b == b'.' {
            let at_boundary = bytes
                .get(i + 1)
                .map(|next| next.is_ascii_whitespace())
                .unwrap_or(true);
            if at_boundary {
                out.push(text[start..i].trim());
                start = i + 1;
            }
        }
    }
    out.push(text[start..].trim());
    out.retain(|s| !s.is_empty());
    out
}

/// Parse the narration of the deduction at `owner`.
pub fn parse_narration(
    owner: &NodePath,
    text: &str,
) -> Result<Vec<NarrationStep>, NarrationSyntaxError> {
    let mut steps: Vec<NarrationStep> = Vec::new();
    for (i, sentence) in split_sentences(text).into_iter().enumerate() {
        let fail = |message: String| NarrationSyntaxError {
            node: owner.clone(),
            sentence: sentence.to_string(),
            message,
        };
        let tokens = tokenize(sentence).map_err(fail)?;
        let previous = steps.last().map(|s| s.conclusions.clone()).unwrap_or_default();
        let step = SentenceParser { tokens, pos: 0 }
            .sentence(i + 1, sentence, previous)
            .map_err(fail)?;
        steps.push(step);
    }
    tracing::debug!(owner = %owner, steps = steps.len(), "parsed narration");
    Ok(steps)
}

fn tokenize(sentence: &str) -> Result<Vec<Tok<'_>>, String> {
    let mut out = Vec::new();
    let mut lexer = Word::lexer(sentence);
    while let Some(result) = lexer.next() {
        match result {
            Ok(Word::Name(word)) => {
                match keyword(word) {
                    Some(kw) => out.push(Tok::Kw(kw)),
                    None if NodePath::parse(word).is_ok() => out.push(Tok::Name(word)),
                    None => return Err(format!("'{word}' is not a valid node name")),
                }
            }
            Ok(Word::Sep) => out.push(Tok::Sep),
            Err(()) => {
                return Err(format!("unexpected text '{}'", lexer.slice()));
            }
        }
    }
    Ok(out)
}

struct SentenceParser<'a> {
    tokens: Vec<Tok<'a>>,
    pos: usize,
}

impl<'a> SentenceParser<'a> {
    fn peek(&self) -> Option<Tok<'a>> {
        self.tokens.get(self.pos).copied()
    }

    fn eat(&mut self, kw: Kw) -> bool {
        if self.peek() == Some(Tok::Kw(kw)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn describe(&self) -> String {
        match self.peek() {
            Some(Tok::Name(n)) => format!("'{n}'"),
            Some(Tok::Kw(_)) => format!("'{}'", self.raw_keyword()),
            Some(Tok::Sep) => "separator".to_string(),
            None => "end of sentence".to_string(),
        }
    }

    fn raw_keyword(&self) -> &'static str {
        match self.peek() {
            Some(Tok::Kw(Kw::Suppose)) => "suppose",
            Some(Tok::Kw(Kw::From)) => "from",
            Some(Tok::Kw(Kw::Get)) => "get",
            Some(Tok::Kw(Kw::Therefore)) => "therefore",
            Some(Tok::Kw(Kw::Next)) => "next",
            Some(Tok::Kw(Kw::By)) => "by",
            Some(Tok::Kw(Kw::Using)) => "using",
            Some(Tok::Kw(Kw::And)) => "and",
            _ => "",
        }
    }

    /// NAME (("and" | ",") NAME)*
    ///
    /// A separator may also close the list when the next clause keyword
    /// follows it, as in `Then C, by A.`
    fn names(&mut self) -> Result<Vec<String>, String> {
        let mut out = Vec::new();
        loop {
            match self.peek() {
                Some(Tok::Name(n)) => {
                    self.pos += 1;
                    if !out.iter().any(|o: &String| o == n) {
                        out.push(n.to_string());
                    }
                }
                _ => return Err(format!("expected a node name, found {}", self.describe())),
            }
            match self.peek() {
                Some(Tok::Kw(Kw::And)) => self.pos += 1,
                Some(Tok::Sep) => {
                    self.pos += 1;
                    if matches!(self.peek(), Some(Tok::Kw(Kw::By | Kw::Using | Kw::Get))) {
                        return Ok(out);
                    }
                }
                _ => return Ok(out),
            }
        }
    }

    /// ("by" names)? ("using" names)?
    fn tail(&mut self) -> Result<(Vec<String>, Vec<String>), String> {
        let by = if self.eat(Kw::By) { self.names()? } else { Vec::new() };
        let using = if self.eat(Kw::Using) { self.names()? } else { Vec::new() };
        Ok((by, using))
    }

    fn finish(&self) -> Result<(), String> {
        match self.peek() {
            None => Ok(()),
            Some(_) => Err(format!("unexpected {}", self.describe())),
        }
    }

    fn sentence(
        mut self,
        index: usize,
        text: &str,
        previous: Vec<String>,
    ) -> Result<NarrationStep, String> {
        let step = |connective: Connective, antecedents: Vec<String>, conclusions: Vec<String>| {
            NarrationStep {
                index,
                sentence: text.to_string(),
                connective,
                antecedents,
                conclusions,
            }
        };

        if self.eat(Kw::Suppose) {
            let supposed = self.names()?;
            self.finish()?;
            return Ok(step(Connective::Suppose, Vec::new(), supposed));
        }

        if self.eat(Kw::From) {
            let mut from = self.names()?;
            if !self.eat(Kw::Get) {
                return Err(format!("expected 'get' after 'from', found {}", self.describe()));
            }
            let concluded = self.names()?;
            let (by, using) = self.tail()?;
            self.finish()?;
            extend_unique(&mut from, by);
            extend_unique(&mut from, using);
            return Ok(step(Connective::FromGet, from, concluded));
        }

        if self.eat(Kw::Therefore) {
            let concluded = self.names()?;
            let (by, using) = self.tail()?;
            self.finish()?;
            let mut antecedents = previous;
            extend_unique(&mut antecedents, by);
            extend_unique(&mut antecedents, using);
            return Ok(step(Connective::Therefore, antecedents, concluded));
        }

        let prefixed = self.eat(Kw::Next);
        let concluded = self.names()?;
        let (by, using) = self.tail()?;
        self.finish()?;
        let connective = if prefixed {
            Connective::Next
        } else if !by.is_empty() {
            Connective::By
        } else if !using.is_empty() {
            Connective::Using
        } else {
            Connective::Next
        };
        let mut antecedents = by;
        extend_unique(&mut antecedents, using);
        Ok(step(connective, antecedents, concluded))
    }
}

fn extend_unique(into: &mut Vec<String>, more: Vec<String>) {
    for name in more {
        if !into.contains(&name) {
            into.push(name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner() -> NodePath {
        NodePath::parse("m.Pf").unwrap()
    }

    fn parse(text: &str) -> Vec<NarrationStep> {
        parse_narration(&owner(), text).unwrap()
    }

    #[test]
    fn sentence_splitting_keeps_dotted_names() {
        assert_eq!(
            split_sentences("Suppose S. Then Case1.F.\nHence Thm.C"),
            vec!["Suppose S", "Then Case1.F", "Hence Thm.C"]
        );
        assert!(split_sentences("   ").is_empty());
    }

    #[test]
    fn empty_narration() {
        assert!(parse("").is_empty());
    }

    #[test]
    fn suppose_and_let() {
        let steps = parse("Suppose S and T. let I.");
        assert_eq!(steps[0].connective, Connective::Suppose);
        assert_eq!(steps[0].conclusions, vec!["S", "T"]);
        assert!(steps[0].antecedents.is_empty());
        assert_eq!(steps[1].index, 2);
        assert_eq!(steps[1].conclusions, vec!["I"]);
    }

    #[test]
    fn from_get_collects_antecedents() {
        let steps = parse("From A, B get C by L using M.");
        let s = &steps[0];
        assert_eq!(s.connective, Connective::FromGet);
        assert_eq!(s.antecedents, vec!["A", "B", "L", "M"]);
        assert_eq!(s.conclusions, vec!["C"]);
        assert_eq!(s.sentence, "From A, B get C by L using M");
    }

    #[test]
    fn therefore_inherits_previous_conclusions() {
        let steps = parse("From A get B. Therefore C by D. Hence E.");
        assert_eq!(steps[1].connective, Connective::Therefore);
        assert_eq!(steps[1].antecedents, vec!["B", "D"]);
        assert_eq!(steps[2].antecedents, vec!["C"]);
    }

    #[test]
    fn plain_sentences() {
        let steps = parse("A by B. C using M. Next D. E. Now F by G.");
        let kinds: Vec<Connective> = steps.iter().map(|s| s.connective).collect();
        assert_eq!(
            kinds,
            vec![
                Connective::By,
                Connective::Using,
                Connective::Next,
                Connective::Next,
                Connective::Next
            ]
        );
        assert_eq!(steps[4].antecedents, vec!["G"]);
    }

    #[test]
    fn keywords_are_case_insensitive() {
        let steps = parse("SUPPOSE S. THEREFORE C BY S.");
        assert_eq!(steps[0].connective, Connective::Suppose);
        assert_eq!(steps[1].antecedents, vec!["S"]);
    }

    #[test]
    fn comma_before_clause_keyword() {
        let steps = parse("Then C, by A. From B, get D, using M.");
        assert_eq!(steps[0].connective, Connective::Therefore);
        assert_eq!(steps[0].conclusions, vec!["C"]);
        assert_eq!(steps[0].antecedents, vec!["A"]);
        assert_eq!(steps[1].connective, Connective::FromGet);
        assert_eq!(steps[1].antecedents, vec!["B", "M"]);
        assert_eq!(steps[1].conclusions, vec!["D"]);

        let err = parse_narration(&owner(), "Then C and by A.").unwrap_err();
        assert!(err.message.contains("expected a node name, found 'by'"), "{err}");
    }

    #[test]
    fn errors_name_the_owner_and_sentence() {
        let err = parse_narration(&owner(), "Suppose S. From A B.").unwrap_err();
        assert_eq!(err.node, owner());
        assert_eq!(err.sentence, "From A B");
        assert!(err.message.contains("expected 'get'"), "{err}");

        let err = parse_narration(&owner(), "Suppose S by T.").unwrap_err();
        assert!(err.message.contains("unexpected 'by'"), "{err}");

        let err = parse_narration(&owner(), "Therefore.").unwrap_err();
        assert!(err.message.contains("expected a node name"), "{err}");

        let err = parse_narration(&owner(), "Then A + B.").unwrap_err();
        assert!(err.message.contains("unexpected text '+'"), "{err}");

        let err = parse_narration(&owner(), "Then A..B.").unwrap_err();
        assert!(err.message.contains("'A..B' is not a valid node name"), "{err}");
    }
}
