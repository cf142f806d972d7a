//! `lemmata fmt`: print a module in canonical form.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use lemmata_lang::{parse_module, print_module};

/// Canonical text of the module source `text`.
pub fn format_source(text: &str) -> Result<String> {
    let module = parse_module(text)?;
    Ok(print_module(&module))
}

/// Format `file`: print it, rewrite it in place, or only check it.
pub fn run(file: &Path, write: bool, check: bool) -> Result<()> {
    let text = fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
    let formatted =
        format_source(&text).with_context(|| format!("parsing {}", file.display()))?;

    if check {
        if formatted != text {
            bail!("{} is not formatted", file.display());
        }
        return Ok(());
    }
    if write {
        if formatted != text {
            fs::write(file, &formatted).with_context(|| format!("writing {}", file.display()))?;
            tracing::info!(file = %file.display(), "reformatted");
        }
        return Ok(());
    }
    print!("{formatted}");
    Ok(())
}
