//! Recursive-descent parser from module source to [`Module`].

use std::collections::BTreeSet;
use std::ops::Range;

use lemmata_core::{NodeKind, NodePath};
use logos::Logos;

use crate::ast::{
    Block, Clauses, Field, FieldValue, Import, ImportKind, ImportName, Item, Module, ModulePath,
};
use crate::error::SyntaxError;
use crate::lexer::Token;
use crate::span::LineIndex;

/// Parse module source text.
pub fn parse_module(source: &str) -> Result<Module, SyntaxError> {
    let index = LineIndex::new(source);
    let mut tokens = Vec::new();
    let mut lexer = Token::lexer(source);
    while let Some(result) = lexer.next() {
        let range = lexer.span();
        match result {
            Ok(token) => tokens.push((token, range)),
            Err(()) => return Err(lex_error(source, range, &index)),
        }
    }

    let mut parser = Parser {
        tokens,
        pos: 0,
        index,
        eof: source.len(),
    };
    let module = parser.module()?;
    tracing::debug!(
        imports = module.imports.len(),
        blocks = module.blocks.len(),
        "parsed module"
    );
    Ok(module)
}

fn lex_error(source: &str, range: Range<usize>, index: &LineIndex) -> SyntaxError {
    let text = &source[range.clone()];
    let message = if text.starts_with("@@@") {
        "unterminated raw block: expected closing '@@@'".to_string()
    } else if text.starts_with('"') {
        "unterminated string".to_string()
    } else {
        let ch = text.chars().next().unwrap_or(' ');
        format!("unexpected character '{ch}'")
    };
    let (line, col) = index.line_col(range.start);
    SyntaxError { line, col, message }
}

struct Parser<'a> {
    tokens: Vec<(Token<'a>, Range<usize>)>,
    pos: usize,
    index: LineIndex,
    eof: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token<'a>> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn range(&self) -> Range<usize> {
        self.tokens
            .get(self.pos)
            .map(|(_, r)| r.clone())
            .unwrap_or(self.eof..self.eof)
    }

    fn bump(&mut self) -> Option<(Token<'a>, Range<usize>)> {
        let item = self.tokens.get(self.pos).cloned();
        if item.is_some() {
            self.pos += 1;
        }
        item
    }

    fn error_here(&self, message: impl Into<String>) -> SyntaxError {
        self.error_at(self.range().start, message)
    }

    fn error_at(&self, offset: usize, message: impl Into<String>) -> SyntaxError {
        let (line, col) = self.index.line_col(offset);
        SyntaxError {
            line,
            col,
            message: message.into(),
        }
    }

    fn found(&self) -> String {
        match self.peek() {
            Some(token) => token.describe(),
            None => "end of input".to_string(),
        }
    }

    fn expect(&mut self, expected: Token<'a>, what: &str) -> Result<Range<usize>, SyntaxError> {
        if self.peek() == Some(&expected) {
            Ok(self.range_and_bump())
        } else {
            Err(self.error_here(format!("expected {what}, found {}", self.found())))
        }
    }

    fn range_and_bump(&mut self) -> Range<usize> {
        let range = self.range();
        self.bump();
        range
    }

    fn ident(&mut self, what: &str) -> Result<(&'a str, Range<usize>), SyntaxError> {
        match self.peek() {
            Some(Token::Ident(name)) => {
                let name = *name;
                Ok((name, self.range_and_bump()))
            }
            _ => Err(self.error_here(format!("expected {what}, found {}", self.found()))),
        }
    }

    fn module(&mut self) -> Result<Module, SyntaxError> {
        let mut module = Module::default();
        let mut names: BTreeSet<String> = BTreeSet::new();

        while let Some(token) = self.peek() {
            match token {
                Token::Import | Token::From => {
                    let import = self.import()?;
                    for local in import_locals(&import) {
                        if !names.insert(local.to_string()) {
                            return Err(self.error_at(
                                import.span.start,
                                format!("duplicate definition of '{local}'"),
                            ));
                        }
                    }
                    module.imports.push(import);
                }
                Token::Block(NodeKind::Deduction | NodeKind::Annotation) => {
                    let block = self.block()?;
                    if !names.insert(block.name.clone()) {
                        return Err(self.error_at(
                            block.span.start,
                            format!("duplicate definition of '{}'", block.name),
                        ));
                    }
                    module.blocks.push(block);
                }
                Token::Block(kind) => {
                    return Err(self.error_here(format!(
                        "'{}' must be declared inside a deduction",
                        kind.keyword()
                    )));
                }
                Token::Ident(_) => {
                    return Err(self.error_here("expected block, found field"));
                }
                _ => {
                    return Err(self.error_here(format!(
                        "expected import or block declaration, found {}",
                        self.found()
                    )));
                }
            }
        }
        Ok(module)
    }

    fn import(&mut self) -> Result<Import, SyntaxError> {
        let start = self.range().start;
        let (kind, module) = match self.bump() {
            Some((Token::Import, _)) => {
                let module = self.module_path(false)?;
                let alias = if self.peek() == Some(&Token::As) {
                    self.bump();
                    Some(self.ident("alias after 'as'")?.0.to_string())
                } else {
                    None
                };
                (ImportKind::Module { alias }, module)
            }
            _ => {
                let module = self.module_path(true)?;
                self.expect(Token::Import, "'import'")?;
                if self.peek() == Some(&Token::Star) {
                    self.bump();
                    (ImportKind::Glob, module)
                } else {
                    let mut names = Vec::new();
                    loop {
                        let name = self.ident("imported name")?.0.to_string();
                        let alias = if self.peek() == Some(&Token::As) {
                            self.bump();
                            Some(self.ident("alias after 'as'")?.0.to_string())
                        } else {
                            None
                        };
                        names.push(ImportName { name, alias });
                        if self.peek() == Some(&Token::Comma) {
                            self.bump();
                        } else {
                            break;
                        }
                    }
                    (ImportKind::Names(names), module)
                }
            }
        };
        let end = self.tokens[..self.pos]
            .last()
            .map(|(_, r)| r.end)
            .unwrap_or(start);
        Ok(Import {
            module,
            kind,
            span: self.index.span(start..end),
        })
    }

    fn module_path(&mut self, allow_bare_dots: bool) -> Result<ModulePath, SyntaxError> {
        let mut dots = 0;
        while self.peek() == Some(&Token::Dot) {
            self.bump();
            dots += 1;
        }
        let mut segments = Vec::new();
        if matches!(self.peek(), Some(Token::Ident(_))) {
            segments = self.segments()?;
        } else if dots == 0 || !allow_bare_dots {
            return Err(self.error_here(format!("expected module path, found {}", self.found())));
        }
        Ok(ModulePath { dots, segments })
    }

    fn segments(&mut self) -> Result<Vec<String>, SyntaxError> {
        let mut segments = vec![self.ident("identifier")?.0.to_string()];
        while self.peek() == Some(&Token::Dot) {
            self.bump();
            segments.push(self.ident("identifier after '.'")?.0.to_string());
        }
        Ok(segments)
    }

    fn dotted(&mut self) -> Result<NodePath, SyntaxError> {
        let start = self.range().start;
        let segments = self.segments()?;
        NodePath::from_segments(segments)
            .ok_or_else(|| self.error_at(start, "expected dotted name"))
    }

    fn dotted_list(&mut self) -> Result<Vec<NodePath>, SyntaxError> {
        let mut out = vec![self.dotted()?];
        while self.peek() == Some(&Token::Comma) {
            self.bump();
            out.push(self.dotted()?);
        }
        Ok(out)
    }

    fn block(&mut self) -> Result<Block, SyntaxError> {
        let start = self.range().start;
        let kind = match self.bump() {
            Some((Token::Block(kind), _)) => kind,
            _ => return Err(self.error_at(start, "expected block keyword")),
        };
        let keyword = kind.keyword();
        let (name, _) = self.ident(&format!("name after '{keyword}'"))?;

        let mut clauses = Clauses::default();
        let mut seen: BTreeSet<&'static str> = BTreeSet::new();
        loop {
            let (clause, allowed) = match self.peek() {
                Some(Token::Of) => ("of", kind == NodeKind::Deduction),
                Some(Token::On) => ("on", kind == NodeKind::Annotation),
                Some(Token::Versus) => ("versus", kind == NodeKind::Supposition),
                Some(Token::Contra) => ("contra", kind == NodeKind::Falsum),
                Some(Token::Wolog) => ("wolog", kind == NodeKind::Supposition),
                _ => break,
            };
            if !allowed {
                return Err(self.error_here(format!(
                    "'{clause}' clause not allowed on '{keyword}'"
                )));
            }
            if !seen.insert(clause) {
                return Err(self.error_here(format!("duplicate '{clause}' clause")));
            }
            self.bump();
            match clause {
                "of" => clauses.of = self.dotted_list()?,
                "on" => clauses.on = self.dotted_list()?,
                "versus" => clauses.versus = self.dotted_list()?,
                "contra" => clauses.contra = self.dotted_list()?,
                _ => clauses.wolog = true,
            }
        }

        self.expect(Token::LBrace, &format!("'{{' to open '{keyword} {name}'"))?;

        let mut items = Vec::new();
        let mut field_names: BTreeSet<String> = BTreeSet::new();
        let mut child_names: BTreeSet<String> = BTreeSet::new();
        let end = loop {
            match self.peek() {
                None => {
                    return Err(self.error_here(format!(
                        "unclosed brace: expected '}}' to close '{keyword} {name}'"
                    )));
                }
                Some(Token::RBrace) => break self.range_and_bump().end,
                Some(Token::Ident(_)) => {
                    let field = self.field()?;
                    if !field_names.insert(field.name.clone()) {
                        return Err(self.error_at(
                            field.span.start,
                            format!("duplicate field '{}' in '{name}'", field.name),
                        ));
                    }
                    items.push(Item::Field(field));
                }
                Some(Token::Block(child)) => {
                    let child = *child;
                    if !kind.may_contain(child) {
                        return Err(self.error_here(nesting_message(kind, child)));
                    }
                    let block = self.block()?;
                    if !child_names.insert(block.name.clone()) {
                        return Err(self.error_at(
                            block.span.start,
                            format!("duplicate definition of '{}' in '{name}'", block.name),
                        ));
                    }
                    items.push(Item::Block(block));
                }
                Some(_) => {
                    let expected = if kind.is_deductive() || kind == NodeKind::Existential {
                        "field or block"
                    } else {
                        "field"
                    };
                    return Err(
                        self.error_here(format!("expected {expected}, found {}", self.found()))
                    );
                }
            }
        };

        Ok(Block {
            kind,
            name: name.to_string(),
            clauses,
            items,
            span: self.index.span(start..end),
        })
    }

    fn field(&mut self) -> Result<Field, SyntaxError> {
        let (name, range) = self.ident("field name")?;
        self.expect(Token::Eq, &format!("'=' after field '{name}'"))?;
        let value_range = self.range();
        let value = match self.bump() {
            Some((Token::String(raw), _)) => {
                FieldValue::Quoted(unescape(raw).map_err(|m| self.error_at(value_range.start, m))?)
            }
            Some((Token::Raw(body), _)) => FieldValue::Raw(body.to_string()),
            _ => {
                return Err(self.error_at(
                    value_range.start,
                    format!("expected string or '@@@' raw block for field '{name}'"),
                ));
            }
        };
        Ok(Field {
            name: name.to_string(),
            value,
            span: self.index.span(range.start..value_range.end),
        })
    }
}

fn import_locals(import: &Import) -> Vec<&str> {
    match &import.kind {
        ImportKind::Module { alias: Some(alias) } => vec![alias.as_str()],
        ImportKind::Module { alias: None } => import
            .module
            .segments
            .last()
            .map(String::as_str)
            .into_iter()
            .collect(),
        ImportKind::Glob => Vec::new(),
        ImportKind::Names(names) => names.iter().map(ImportName::local).collect(),
    }
}

fn nesting_message(parent: NodeKind, child: NodeKind) -> String {
    let (pk, ck) = (parent.keyword(), child.keyword());
    if !parent.is_deductive() && parent != NodeKind::Existential {
        format!("expected field: '{pk}' may not contain nested blocks")
    } else if child == NodeKind::Deduction {
        format!("'deduc' may only be declared at top level; use 'subdeduc' inside '{pk}'")
    } else if child == NodeKind::Annotation {
        "'anno' may only be declared at top level".to_string()
    } else {
        format!("'{ck}' may not be declared inside '{pk}'")
    }
}

/// Strip the quotes and process `\"`, `\\`, `\n`, `\t`.
fn unescape(raw: &str) -> Result<String, String> {
    let inner = &raw[1..raw.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => return Err(format!("invalid escape '\\{other}' in string")),
            None => return Err("dangling '\\' in string".to_string()),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const THEOREM: &str = r#"
from ..basics import Lem as L, Def
import alg.groups as G

# A theorem with two conclusions.
deduc Thm {
    asrt C1 { sy = "$x = 1$" }
    asrt C2 { en = "two \"quoted\"\nlines" }
}

deduc Pf of Thm.C1, Thm.C2 {
    supp S wolog { en = "suppose" }
    flse F contra S { }
    exis E {
        intr I { sy = "$y$" }
        asrt A { en = "a" }
    }
    subdeduc Sub {
        narration = "Therefore A."
    }
    narration = "Suppose S. Then F. Hence Thm.C1."
}

anno Notes on Thm {
    body = @@@
<chart:"x"> # not a comment
@@@
}
"#;

    #[test]
    fn parses_full_module() {
        let m = parse_module(THEOREM).unwrap();
        assert_eq!(m.imports.len(), 2);
        assert_eq!(m.imports[0].module.dots, 2);
        assert_eq!(m.imports[0].module.to_string(), "..basics");
        assert!(matches!(&m.imports[0].kind, ImportKind::Names(n) if n[0].local() == "L"));
        assert_eq!(m.blocks.len(), 3);

        let thm = &m.blocks[0];
        assert_eq!(thm.kind, NodeKind::Deduction);
        assert_eq!(thm.span.line, 6);
        let c2 = thm.children().nth(1).unwrap();
        assert_eq!(
            c2.field("en").unwrap().value,
            FieldValue::Quoted("two \"quoted\"\nlines".into())
        );

        let pf = &m.blocks[1];
        assert_eq!(pf.clauses.of.len(), 2);
        assert_eq!(pf.clauses.of[1].to_string(), "Thm.C2");
        let kinds: Vec<NodeKind> = pf.children().map(|b| b.kind).collect();
        assert_eq!(
            kinds,
            vec![
                NodeKind::Supposition,
                NodeKind::Falsum,
                NodeKind::Existential,
                NodeKind::SubDeduction
            ]
        );
        let supp = pf.children().next().unwrap();
        assert!(supp.clauses.wolog);
        let flse = pf.children().nth(1).unwrap();
        assert_eq!(flse.clauses.contra[0].to_string(), "S");
        // field declared after nested blocks keeps its position
        assert!(matches!(pf.items.last(), Some(Item::Field(f)) if f.name == "narration"));

        let anno = &m.blocks[2];
        assert_eq!(
            anno.field("body").unwrap().value,
            FieldValue::Raw("\n<chart:\"x\"> # not a comment\n".into())
        );
    }

    fn err(src: &str) -> SyntaxError {
        parse_module(src).unwrap_err()
    }

    #[test]
    fn unclosed_brace() {
        let e = err("deduc Thm {\n  asrt C { en = \"c\" }\n");
        assert!(e.message.contains("unclosed brace"), "{e}");
        assert_eq!(e.line, 3);
    }

    #[test]
    fn unknown_keyword_at_top_level() {
        let e = err("lemma X { }");
        assert!(e.message.contains("expected block"), "{e}");
    }

    #[test]
    fn node_keyword_at_top_level() {
        let e = err("asrt C { en = \"c\" }");
        assert!(e.message.contains("inside a deduction"), "{e}");
        assert_eq!((e.line, e.col), (1, 1));
    }

    #[test]
    fn block_inside_leaf() {
        let e = err("deduc T {\n asrt A {\n  asrt B { en = \"b\" }\n }\n}");
        assert!(e.message.contains("expected field"), "{e}");
        assert_eq!((e.line, e.col), (3, 3));
    }

    #[test]
    fn field_where_block_required() {
        let e = err("en = \"x\"");
        assert!(e.message.contains("expected block, found field"), "{e}");
    }

    #[test]
    fn duplicate_field() {
        let e = err("deduc T {\n asrt A { en = \"a\"\n en = \"b\" }\n}");
        assert!(e.message.contains("duplicate field 'en'"), "{e}");
        assert_eq!(e.line, 3);
    }

    #[test]
    fn duplicate_child_and_top_level_names() {
        let e = err("deduc T { asrt A { en = \"a\" } asrt A { en = \"b\" } }");
        assert!(e.message.contains("duplicate definition of 'A'"), "{e}");
        let e = err("import x.T\ndeduc T { }");
        assert!(e.message.contains("duplicate definition of 'T'"), "{e}");
    }

    #[test]
    fn clause_restrictions() {
        let e = err("deduc T { asrt A versus B { en = \"a\" } }");
        assert!(e.message.contains("'versus' clause not allowed"), "{e}");
        let e = err("deduc T { supp A versus B versus C { en = \"a\" } }");
        assert!(e.message.contains("duplicate 'versus'"), "{e}");
        let e = err("deduc T { subdeduc S of X { } }");
        assert!(e.message.contains("'of' clause not allowed"), "{e}");
    }

    #[test]
    fn nested_deduc_and_anno_rejected() {
        let e = err("deduc T { deduc U { } }");
        assert!(e.message.contains("use 'subdeduc'"), "{e}");
        let e = err("deduc T { anno N { body = @@@x@@@ } }");
        assert!(e.message.contains("top level"), "{e}");
    }

    #[test]
    fn lexical_errors() {
        let e = err("deduc T { en = \"never closed }");
        assert!(e.message.contains("unterminated string"), "{e}");
        let e = err("anno N { body = @@@ open");
        assert!(e.message.contains("unterminated raw block"), "{e}");
        let e = err("deduc T { en = \"bad \\q escape\" }");
        assert!(e.message.contains("invalid escape"), "{e}");
        let e = err("deduc T $ { }");
        assert!(e.message.contains("unexpected character '$'"), "{e}");
    }

    #[test]
    fn glob_and_relative_imports() {
        let m = parse_module("from . import *\nfrom .sib import A, B as C\nimport top.mod").unwrap();
        assert_eq!(m.imports[0].kind, ImportKind::Glob);
        assert_eq!(m.imports[0].module.dots, 1);
        assert!(m.imports[0].module.segments.is_empty());
        assert!(matches!(&m.imports[2].kind, ImportKind::Module { alias: None }));
        let e = err("import .");
        assert!(e.message.contains("expected module path"), "{e}");
    }

    #[test]
    fn empty_source() {
        let m = parse_module("  # only a comment\n\n").unwrap();
        assert!(m.imports.is_empty() && m.blocks.is_empty());
    }
}
