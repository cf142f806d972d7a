//! Compilation of Lemmata modules into resolved deduction graphs.
//!
//! The pipeline for one module is parse ([`lemmata_lang`]), build
//! ([`builder`]), resolve ([`resolver`]). [`compile_batch`] runs it for a
//! whole library: building in parallel, resolving in import order against
//! a shared, read-only [`ModuleLibrary`].

pub mod builder;
pub mod cycles;
pub mod error;
pub mod library;
pub mod pipeline;
pub mod resolver;
pub mod schedule;

pub use builder::{build_candidate, CandidateGraph, RefRole, SymbolicRef};
pub use error::{BuildError, CompileError, GraphConstructionError, ResolveError};
pub use library::{ModuleId, ModuleLibrary};
pub use pipeline::{assemble_snapshot, compile_module, parse_and_build, ModuleSource};
pub use resolver::{resolve, ResolveContext, ResolvedModule};
pub use schedule::{compile_batch, BatchOutput};
