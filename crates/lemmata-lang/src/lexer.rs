//! Module source lexer.
//!
//! Tokenizes module text using the logos crate. Whitespace and `#` line
//! comments are skipped; `@@@ ... @@@` raw bodies are captured verbatim.

use lemmata_core::NodeKind;
use logos::{Lexer, Logos};

/// Module source tokens
#[derive(Logos, Debug, PartialEq, Clone)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip r"#[^\n]*")]
pub enum Token<'a> {
    /// Block keyword (`deduc`, `asrt`, ...)
    #[token("deduc", |_| NodeKind::Deduction)]
    #[token("subdeduc", |_| NodeKind::SubDeduction)]
    #[token("asrt", |_| NodeKind::Assertion)]
    #[token("supp", |_| NodeKind::Supposition)]
    #[token("flse", |_| NodeKind::Falsum)]
    #[token("exis", |_| NodeKind::Existential)]
    #[token("intr", |_| NodeKind::Introduction)]
    #[token("anno", |_| NodeKind::Annotation)]
    Block(NodeKind),

    #[token("import")]
    Import,

    #[token("from")]
    From,

    #[token("as")]
    As,

    #[token("of")]
    Of,

    #[token("on")]
    On,

    #[token("versus")]
    Versus,

    #[token("contra")]
    Contra,

    #[token("wolog")]
    Wolog,

    #[token("{")]
    LBrace,

    #[token("}")]
    RBrace,

    #[token("=")]
    Eq,

    #[token(",")]
    Comma,

    #[token(".")]
    Dot,

    #[token("*")]
    Star,

    /// Identifier
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice())]
    Ident(&'a str),

    /// Quoted string, including the quotes and with escapes unprocessed
    #[regex(r#""([^"\\]|\\.)*""#, |lex| lex.slice())]
    String(&'a str),

    /// Raw body between `@@@` delimiters, without the delimiters
    #[token("@@@", raw_body)]
    Raw(&'a str),
}

fn raw_body<'a>(lex: &mut Lexer<'a, Token<'a>>) -> Option<&'a str> {
    let rest = lex.remainder();
    let end = rest.find("@@@")?;
    lex.bump(end + 3);
    Some(&rest[..end])
}

impl Token<'_> {
    /// How the token reads in an error message.
    pub fn describe(&self) -> String {
        match self {
            Token::Block(kind) => format!("keyword '{}'", kind.keyword()),
            Token::Import => "'import'".to_string(),
            Token::From => "'from'".to_string(),
            Token::As => "'as'".to_string(),
            Token::Of => "'of'".to_string(),
            Token::On => "'on'".to_string(),
            Token::Versus => "'versus'".to_string(),
            Token::Contra => "'contra'".to_string(),
            Token::Wolog => "'wolog'".to_string(),
            Token::LBrace => "'{'".to_string(),
            Token::RBrace => "'}'".to_string(),
            Token::Eq => "'='".to_string(),
            Token::Comma => "','".to_string(),
            Token::Dot => "'.'".to_string(),
            Token::Star => "'*'".to_string(),
            Token::Ident(s) => format!("identifier '{s}'"),
            Token::String(_) => "string".to_string(),
            Token::Raw(_) => "raw block".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_and_identifiers() {
        let mut lexer = Token::lexer("deduc Pf of Thm.C1, deducX");
        assert_eq!(lexer.next(), Some(Ok(Token::Block(NodeKind::Deduction))));
        assert_eq!(lexer.next(), Some(Ok(Token::Ident("Pf"))));
        assert_eq!(lexer.next(), Some(Ok(Token::Of)));
        assert_eq!(lexer.next(), Some(Ok(Token::Ident("Thm"))));
        assert_eq!(lexer.next(), Some(Ok(Token::Dot)));
        assert_eq!(lexer.next(), Some(Ok(Token::Ident("C1"))));
        assert_eq!(lexer.next(), Some(Ok(Token::Comma)));
        assert_eq!(lexer.next(), Some(Ok(Token::Ident("deducX"))));
        assert_eq!(lexer.next(), None);
    }

    #[test]
    fn comments_are_skipped() {
        let mut lexer = Token::lexer("# a comment\n  asrt # trailing\n");
        assert_eq!(lexer.next(), Some(Ok(Token::Block(NodeKind::Assertion))));
        assert_eq!(lexer.next(), None);
    }

    #[test]
    fn strings_keep_escapes() {
        let mut lexer = Token::lexer(r#"en = "say \"hi\" # not a comment""#);
        assert_eq!(lexer.next(), Some(Ok(Token::Ident("en"))));
        assert_eq!(lexer.next(), Some(Ok(Token::Eq)));
        assert_eq!(
            lexer.next(),
            Some(Ok(Token::String(r#""say \"hi\" # not a comment""#)))
        );
    }

    #[test]
    fn raw_bodies_are_verbatim() {
        let src = "body = @@@\n  <chart:\"x\"> # kept\n  { } @ @@ \n@@@ }";
        let mut lexer = Token::lexer(src);
        lexer.next();
        lexer.next();
        assert_eq!(
            lexer.next(),
            Some(Ok(Token::Raw("\n  <chart:\"x\"> # kept\n  { } @ @@ \n")))
        );
        assert_eq!(lexer.next(), Some(Ok(Token::RBrace)));
    }

    #[test]
    fn unterminated_raw_is_an_error() {
        let mut lexer = Token::lexer("@@@ never closed");
        assert_eq!(lexer.next(), Some(Err(())));
    }
}
