//! Batch compilation: parallel parse and build, then resolution in
//! dependency order.
//!
//! Parsing and building are independent per module and run on the rayon
//! pool. Resolution of a module needs every module it imports, so modules
//! are grouped into layers by a topological sort of the import relation;
//! each layer resolves in parallel against the read-only library, and the
//! library is extended only between layers.

use std::collections::{BTreeMap, BTreeSet};

use lemmata_core::{ImportTable, NodePath, Snapshot};
use rayon::prelude::*;

use crate::builder::CandidateGraph;
use crate::cycles::{find_cycles, on_cycle};
use crate::error::CompileError;
use crate::library::{ModuleId, ModuleLibrary};
use crate::pipeline::{parse_and_build, ModuleSource};
use crate::resolver::{resolve, ResolveContext, ResolvedModule};

/// The outcome of compiling a batch of modules.
#[derive(Debug)]
pub struct BatchOutput {
    /// One result per source module.
    pub results: BTreeMap<ModuleId, Result<ResolvedModule, CompileError>>,
    /// Modules resolved together, in order.
    pub layers: Vec<Vec<ModuleId>>,
    /// The input library extended with every module that compiled.
    pub library: ModuleLibrary,
}

impl BatchOutput {
    pub fn is_success(&self) -> bool {
        self.results.values().all(Result::is_ok)
    }

    pub fn resolved(&self) -> impl Iterator<Item = &ResolvedModule> {
        self.results.values().filter_map(|r| r.as_ref().ok())
    }

    pub fn errors(&self) -> impl Iterator<Item = (&ModuleId, &CompileError)> {
        self.results
            .iter()
            .filter_map(|(id, r)| r.as_ref().err().map(|e| (id, e)))
    }
}

/// Compile `sources` against `library`.
///
/// A failure in one module never stops unrelated modules; modules that
/// import a failed module report [`CompileError::DependencyFailed`], and
/// modules on an import cycle report [`CompileError::CyclicImport`].
pub fn compile_batch(
    sources: &[ModuleSource],
    mut library: ModuleLibrary,
    imports: &ImportTable,
    previous: Option<&Snapshot>,
) -> BatchOutput {
    let built: Vec<(ModuleId, Result<CandidateGraph, CompileError>)> = sources
        .par_iter()
        .map(|source| (source.id(), parse_and_build(source)))
        .collect();

    let batch: BTreeSet<ModuleId> = built.iter().map(|(id, _)| id.clone()).collect();
    let mut results: BTreeMap<ModuleId, Result<ResolvedModule, CompileError>> = BTreeMap::new();
    let mut candidates: BTreeMap<ModuleId, CandidateGraph> = BTreeMap::new();
    for (id, outcome) in built {
        match outcome {
            Ok(candidate) => {
                candidates.insert(id, candidate);
            }
            Err(e) => {
                tracing::debug!(module = %id, error = %e, "module failed to build");
                results.insert(id, Err(e));
            }
        }
    }

    let deps: BTreeMap<ModuleId, Vec<ModuleId>> = candidates
        .iter()
        .map(|(id, candidate)| (id.clone(), dependencies(candidate, imports, &batch)))
        .collect();

    let mut pending: BTreeSet<ModuleId> = candidates.keys().cloned().collect();
    let mut layers = Vec::new();

    loop {
        let ready: Vec<ModuleId> = pending
            .iter()
            .filter(|id| deps[*id].iter().all(|d| results.contains_key(d)))
            .cloned()
            .collect();
        if ready.is_empty() {
            break;
        }

        let mut runnable = Vec::new();
        for id in ready {
            pending.remove(&id);
            let failed = deps[&id].iter().find(|d| matches!(results.get(*d), Some(Err(_))));
            match failed {
                Some(dependency) => {
                    let error = CompileError::DependencyFailed {
                        module: id.path.clone(),
                        dependency: dependency.path.clone(),
                    };
                    results.insert(id, Err(error));
                }
                None => runnable.push(id),
            }
        }
        if runnable.is_empty() {
            continue;
        }

        let ctx = ResolveContext {
            library: &library,
            imports,
            previous,
        };
        let resolved: Vec<(ModuleId, Result<ResolvedModule, CompileError>)> = runnable
            .par_iter()
            .map(|id| {
                let outcome = resolve(&candidates[id], ctx).map_err(|errors| {
                    CompileError::Resolve {
                        module: id.path.clone(),
                        errors,
                    }
                });
                (id.clone(), outcome)
            })
            .collect();

        for (id, outcome) in resolved {
            if let Ok(module) = &outcome {
                library.insert(module.graph.clone());
            }
            results.insert(id, outcome);
        }
        layers.push(runnable);
    }

    if !pending.is_empty() {
        let stuck: BTreeMap<ModuleId, Vec<ModuleId>> = pending
            .iter()
            .map(|id| {
                let within: Vec<ModuleId> = deps[id]
                    .iter()
                    .filter(|d| pending.contains(*d))
                    .cloned()
                    .collect();
                (id.clone(), within)
            })
            .collect();
        let cycles = find_cycles(&stuck);
        for id in &pending {
            let error = if on_cycle(&stuck, id) {
                let cycle = cycles
                    .iter()
                    .find(|c| c.contains(id))
                    .map(|c| c.iter().map(|m| m.path.clone()).collect())
                    .unwrap_or_else(|| vec![id.path.clone()]);
                CompileError::CyclicImport {
                    module: id.path.clone(),
                    cycle,
                }
            } else {
                let dependency = stuck[id]
                    .first()
                    .map(|d| d.path.clone())
                    .unwrap_or_else(|| id.path.clone());
                CompileError::DependencyFailed {
                    module: id.path.clone(),
                    dependency,
                }
            };
            results.insert(id.clone(), Err(error));
        }
    }

    let failed = results.values().filter(|r| r.is_err()).count();
    tracing::info!(
        modules = results.len(),
        layers = layers.len(),
        failed,
        "compiled batch"
    );

    BatchOutput {
        results,
        layers,
        library,
    }
}

/// Batch modules that `candidate` refers to, by import or absolute name.
fn dependencies(
    candidate: &CandidateGraph,
    imports: &ImportTable,
    batch: &BTreeSet<ModuleId>,
) -> Vec<ModuleId> {
    let mut names = candidate.external_names();
    let heads: BTreeSet<&str> = names.iter().map(|n| n.segments()[0].as_str()).collect();
    let pinned: Vec<NodePath> = imports
        .names()
        .filter(|(local, _)| heads.contains(local))
        .map(|(_, target)| target.path.clone())
        .chain(imports.globs().iter().map(|t| t.path.clone()))
        .collect();
    names.extend(pinned);

    let own = candidate.module();
    batch
        .iter()
        .filter(|id| &id.path != own && !own.starts_with(&id.path))
        .filter(|id| names.iter().any(|n| n.starts_with(&id.path)))
        .cloned()
        .collect()
}
