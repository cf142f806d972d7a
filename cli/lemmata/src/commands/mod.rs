//! CLI command implementations.

pub mod build;
pub mod check;
pub mod fmt;
pub mod validate;

use lemmata_build::CompileError;

/// Print a compile error with one line per underlying problem.
pub(crate) fn print_compile_error(error: &CompileError) {
    eprintln!("error: {error}");
    if let CompileError::Resolve { errors, .. } = error {
        for e in errors {
            eprintln!("  {e}");
        }
    }
}
