//! Single-module compilation: parse, build, resolve.

use lemmata_core::{NodePath, Snapshot, SnapshotError, Version};
use lemmata_lang::parse_module;

use crate::builder::{build_candidate, CandidateGraph};
use crate::error::CompileError;
use crate::library::ModuleId;
use crate::resolver::{resolve, ResolveContext, ResolvedModule};

/// The source text of one module version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleSource {
    pub path: NodePath,
    pub version: Version,
    pub text: String,
}

impl ModuleSource {
    pub fn new(path: NodePath, version: Version, text: impl Into<String>) -> Self {
        Self {
            path,
            version,
            text: text.into(),
        }
    }

    pub fn id(&self) -> ModuleId {
        ModuleId::new(self.path.clone(), self.version.clone())
    }
}

/// Parse a module and build its candidate graph.
pub fn parse_and_build(source: &ModuleSource) -> Result<CandidateGraph, CompileError> {
    let ast = parse_module(&source.text).map_err(|error| CompileError::Syntax {
        module: source.path.clone(),
        version: source.version.clone(),
        error,
    })?;
    Ok(build_candidate(&source.path, &source.version, &ast)?)
}

/// Compile one module against already-compiled dependencies.
pub fn compile_module(
    source: &ModuleSource,
    ctx: ResolveContext<'_>,
) -> Result<ResolvedModule, CompileError> {
    let candidate = parse_and_build(source)?;
    resolve(&candidate, ctx).map_err(|errors| CompileError::Resolve {
        module: source.path.clone(),
        errors,
    })
}

/// Collect resolved modules into the snapshot of one library version.
pub fn assemble_snapshot<'m>(
    library: &str,
    version: Version,
    modules: impl IntoIterator<Item = &'m ResolvedModule>,
) -> Result<Snapshot, SnapshotError> {
    let mut snapshot = Snapshot::new(library, version);
    for module in modules {
        snapshot.add_module(
            &module.graph,
            &module.narrations,
            module.external_refs.iter().cloned(),
        )?;
    }
    tracing::debug!(
        library,
        nodes = snapshot.node_count(),
        edges = snapshot.edge_count(),
        "assembled snapshot"
    );
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::ModuleLibrary;
    use lemmata_core::ImportTable;

    fn source(module: &str, text: &str) -> ModuleSource {
        ModuleSource::new(NodePath::parse(module).unwrap(), Version::new(1, 0, 0), text)
    }

    fn ctx<'a>(library: &'a ModuleLibrary, imports: &'a ImportTable) -> ResolveContext<'a> {
        ResolveContext {
            library,
            imports,
            previous: None,
        }
    }

    #[test]
    fn syntax_errors_carry_module_and_position() {
        let (library, imports) = (ModuleLibrary::new(), ImportTable::new());
        let err = compile_module(&source("m", "deduc T {\n  asrt A {"), ctx(&library, &imports))
            .unwrap_err();
        match err {
            CompileError::Syntax { module, error, .. } => {
                assert_eq!(module.to_string(), "m");
                assert_eq!(error.line, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn construction_and_resolution_errors_are_distinct() {
        let (library, imports) = (ModuleLibrary::new(), ImportTable::new());
        let err = compile_module(&source("m", "deduc T { asrt A {} }"), ctx(&library, &imports))
            .unwrap_err();
        assert!(matches!(err, CompileError::Construction(_)));

        let err = compile_module(&source("m", "deduc P of Nowhere {}"), ctx(&library, &imports))
            .unwrap_err();
        assert!(matches!(err, CompileError::Resolve { ref errors, .. } if errors.len() == 1));
    }

    #[test]
    fn snapshot_rejects_overlapping_modules() {
        let (library, imports) = (ModuleLibrary::new(), ImportTable::new());
        let a = compile_module(&source("m", "deduc T {}"), ctx(&library, &imports)).unwrap();
        let snapshot = assemble_snapshot("lib", Version::new(1, 0, 0), [&a]).unwrap();
        assert_eq!(snapshot.node_count(), 1);
        let err = assemble_snapshot("lib", Version::new(1, 0, 0), [&a, &a]).unwrap_err();
        assert!(matches!(err, SnapshotError::DuplicatePath(_)));
    }
}
