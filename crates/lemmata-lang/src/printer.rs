//! Canonical source rendering of a parsed [`Module`].

use lemmata_core::NodePath;

use crate::ast::{Block, FieldValue, Import, ImportKind, Item, Module};

const INDENT: &str = "    ";

/// Render a module back to source.
///
/// Imports come first, then blocks separated by blank lines. Fields and
/// nested blocks keep their declared order; strings are re-escaped and raw
/// bodies are emitted verbatim.
pub fn print_module(module: &Module) -> String {
    let mut out = String::new();
    for import in &module.imports {
        print_import(&mut out, import);
    }
    for (i, block) in module.blocks.iter().enumerate() {
        if i > 0 || !module.imports.is_empty() {
            out.push('\n');
        }
        print_block(&mut out, block, 0);
    }
    out
}

fn print_import(out: &mut String, import: &Import) {
    match &import.kind {
        ImportKind::Module { alias } => {
            out.push_str(&format!("import {}", import.module));
            if let Some(alias) = alias {
                out.push_str(&format!(" as {alias}"));
            }
        }
        ImportKind::Glob => {
            out.push_str(&format!("from {} import *", import.module));
        }
        ImportKind::Names(names) => {
            let list: Vec<String> = names
                .iter()
                .map(|n| match &n.alias {
                    Some(alias) => format!("{} as {alias}", n.name),
                    None => n.name.clone(),
                })
                .collect();
            out.push_str(&format!("from {} import {}", import.module, list.join(", ")));
        }
    }
    out.push('\n');
}

fn print_block(out: &mut String, block: &Block, depth: usize) {
    let pad = INDENT.repeat(depth);
    out.push_str(&format!("{pad}{} {}", block.kind.keyword(), block.name));
    let clauses = &block.clauses;
    for (word, list) in [
        ("of", &clauses.of),
        ("on", &clauses.on),
        ("versus", &clauses.versus),
        ("contra", &clauses.contra),
    ] {
        if !list.is_empty() {
            out.push_str(&format!(" {word} {}", join_paths(list)));
        }
    }
    if clauses.wolog {
        out.push_str(" wolog");
    }

    if block.items.is_empty() {
        out.push_str(" {}\n");
        return;
    }
    out.push_str(" {\n");
    for item in &block.items {
        match item {
            Item::Field(field) => {
                out.push_str(&format!("{pad}{INDENT}{} = ", field.name));
                match &field.value {
                    FieldValue::Quoted(text) => {
                        out.push_str(&format!("\"{}\"", escape(text)));
                    }
                    FieldValue::Raw(text) => {
                        out.push_str(&format!("@@@{text}@@@"));
                    }
                }
                out.push('\n');
            }
            Item::Block(child) => print_block(out, child, depth + 1),
        }
    }
    out.push_str(&format!("{pad}}}\n"));
}

fn join_paths(paths: &[NodePath]) -> String {
    paths
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_module;

    #[test]
    fn canonical_layout() {
        let src = "from .b import  X as Y\ndeduc Pf of T.C {asrt A {en=\"a\\tb\"} narration = \"Hence A.\"}";
        let printed = print_module(&parse_module(src).unwrap());
        assert_eq!(
            printed,
            "from .b import X as Y\n\
             \n\
             deduc Pf of T.C {\n    \
                 asrt A {\n        \
                     en = \"a\\tb\"\n    \
                 }\n    \
                 narration = \"Hence A.\"\n\
             }\n"
        );
    }

    #[test]
    fn printing_is_idempotent() {
        let src = "deduc T { supp S versus R wolog { sy = \"$\\\\x$\" } supp R versus S { en = \"r\" } }\nanno N on T { body = @@@ raw \"text\" @@@ }";
        let once = print_module(&parse_module(src).unwrap());
        let twice = print_module(&parse_module(&once).unwrap());
        assert_eq!(once, twice);
        assert!(once.contains("@@@ raw \"text\" @@@"));
    }
}
