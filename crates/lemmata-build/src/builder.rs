//! Graph builder: turns a parsed module into a candidate graph.
//!
//! The builder allocates one node per block, checks everything it can
//! check without looking at other modules, and collects the symbolic
//! references of `of`/`on`/`versus`/`contra` clauses for the resolver.
//! Narration fields are parsed here; their names are resolved later.

use std::collections::BTreeSet;

use lemmata_core::graph::check_fields;
use lemmata_core::graph::node::{FIELD_BODY, FIELD_NARRATION};
use lemmata_core::{
    GhostRole, ImportTable, ImportTarget, ModuleGraph, Node, NodeKind, NodePath, Version,
};
use lemmata_lang::{parse_narration, Block, Import, ImportKind, Module, Span};

use crate::error::{BuildError, GraphConstructionError};

/// Which clause a symbolic reference came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RefRole {
    /// `deduc X of T`
    Expansion,
    /// `anno X on T`
    Annotation,
    /// `supp X versus T`
    AlternativeCase,
    /// `flse X contra T`
    Contradiction,
}

impl RefRole {
    /// The clause keyword, for messages.
    pub fn clause(&self) -> &'static str {
        match self {
            RefRole::Expansion => "of",
            RefRole::Annotation => "on",
            RefRole::AlternativeCase => "versus",
            RefRole::Contradiction => "contra",
        }
    }

    pub fn ghost_role(&self) -> GhostRole {
        match self {
            RefRole::Expansion => GhostRole::Expansion,
            RefRole::Annotation => GhostRole::Annotation,
            RefRole::AlternativeCase => GhostRole::AlternativeCase,
            RefRole::Contradiction => GhostRole::Contradiction,
        }
    }
}

/// A clause reference, as written, waiting to be resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolicRef {
    pub role: RefRole,
    /// The node carrying the clause.
    pub source: NodePath,
    /// Where lookup starts: the module for `of`/`on`, the enclosing block
    /// for `versus`/`contra`.
    pub scope: NodePath,
    pub name: NodePath,
    pub span: Span,
}

/// A module's nodes plus its still-symbolic references.
#[derive(Debug, Clone)]
pub struct CandidateGraph {
    /// Nodes only; edges are added by the resolver.
    pub graph: ModuleGraph,
    /// Imports declared in the source.
    pub imports: ImportTable,
    /// Clause references in declaration order.
    pub references: Vec<SymbolicRef>,
}

impl CandidateGraph {
    pub fn module(&self) -> &NodePath {
        self.graph.module()
    }

    pub fn version(&self) -> &Version {
        self.graph.version()
    }

    /// Every name this module may need from elsewhere: import targets,
    /// clause names, and narration names, as written.
    pub fn external_names(&self) -> Vec<NodePath> {
        let mut out: Vec<NodePath> = self.imports.names().map(|(_, t)| t.path.clone()).collect();
        out.extend(self.imports.globs().iter().map(|t| t.path.clone()));
        out.extend(self.references.iter().map(|r| r.name.clone()));
        for node in self.graph.nodes() {
            for step in node.narration.iter().flatten() {
                out.extend(
                    step.references()
                        .into_iter()
                        .filter_map(|n| NodePath::parse(n).ok()),
                );
            }
        }
        out
    }
}

/// Build the candidate graph of `module` at `version` from its syntax tree.
///
/// Every local problem is collected; the error lists all of them.
pub fn build_candidate(
    module: &NodePath,
    version: &Version,
    ast: &Module,
) -> Result<CandidateGraph, GraphConstructionError> {
    let mut builder = Builder {
        module: module.clone(),
        version: version.clone(),
        graph: ModuleGraph::new(module.clone(), version.clone()),
        references: Vec::new(),
        errors: Vec::new(),
    };

    let imports = builder.imports(&ast.imports);
    for block in &ast.blocks {
        builder.block(block, None);
    }

    if !builder.errors.is_empty() {
        return Err(GraphConstructionError {
            module: builder.module,
            errors: builder.errors,
        });
    }

    tracing::debug!(
        module = %module,
        version = %version,
        nodes = builder.graph.node_count(),
        references = builder.references.len(),
        "built candidate graph"
    );

    Ok(CandidateGraph {
        graph: builder.graph,
        imports,
        references: builder.references,
    })
}

struct Builder {
    module: NodePath,
    version: Version,
    graph: ModuleGraph,
    references: Vec<SymbolicRef>,
    errors: Vec<BuildError>,
}

impl Builder {
    fn imports(&mut self, imports: &[Import]) -> ImportTable {
        let mut table = ImportTable::new();
        for import in imports {
            let Some(base) = self.import_base(import) else {
                self.errors.push(BuildError::InvalidImport {
                    module: self.module.clone(),
                    import: import.module.to_string(),
                });
                continue;
            };
            match &import.kind {
                ImportKind::Module { alias } => {
                    let local = alias.as_deref().unwrap_or(base.name()).to_string();
                    table.insert(local, ImportTarget::new(base));
                }
                ImportKind::Glob => table.insert_glob(ImportTarget::new(base)),
                ImportKind::Names(names) => {
                    for name in names {
                        table.insert(name.local(), ImportTarget::new(base.child(&name.name)));
                    }
                }
            }
        }
        table
    }

    /// The absolute module path an import statement names. Leading dots
    /// count from the importing module: one dot is its own package.
    fn import_base(&self, import: &Import) -> Option<NodePath> {
        let path = &import.module;
        if path.dots == 0 {
            return NodePath::from_segments(path.segments.iter().cloned());
        }
        let keep = self.module.len().checked_sub(path.dots)?;
        let package = self.module.prefix(keep)?;
        match NodePath::from_segments(path.segments.iter().cloned()) {
            Some(rest) => Some(package.join(&rest)),
            None => Some(package),
        }
    }

    fn block(&mut self, block: &Block, parent: Option<&NodePath>) {
        let scope = parent.cloned().unwrap_or_else(|| self.module.clone());
        let path = scope.child(&block.name);

        let mut node = Node::new(block.kind, path.clone(), self.version.clone())
            .with_wolog(block.clauses.wolog);
        for field in block.fields() {
            node = node.with_field(&field.name, field.value.text());
        }

        if block.kind == NodeKind::Annotation {
            if let Some(body) = block.field(FIELD_BODY) {
                if !body.value.is_raw() {
                    self.errors.push(BuildError::BodyNotRaw {
                        node: path.clone(),
                        field: FIELD_BODY.to_string(),
                    });
                }
            }
        }

        if block.kind.is_deductive() {
            let parsed = node
                .field(FIELD_NARRATION)
                .map(|text| parse_narration(&path, text));
            match parsed {
                Some(Ok(steps)) => node = node.with_narration(steps),
                Some(Err(e)) => self.errors.push(e.into()),
                None => {}
            }
        }

        self.errors.extend(check_fields(&node).into_iter().map(BuildError::from));

        let module_scope = self.module.clone();
        self.clause(&path, &module_scope, RefRole::Expansion, &block.clauses.of, block.span);
        self.clause(&path, &module_scope, RefRole::Annotation, &block.clauses.on, block.span);
        self.clause(&path, &scope, RefRole::AlternativeCase, &block.clauses.versus, block.span);
        self.clause(&path, &scope, RefRole::Contradiction, &block.clauses.contra, block.span);

        if let Err(e) = self.graph.add_node(node, parent) {
            self.errors.push(e.into());
            return;
        }

        for child in block.children() {
            self.block(child, Some(&path));
        }
    }

    fn clause(
        &mut self,
        source: &NodePath,
        scope: &NodePath,
        role: RefRole,
        names: &[NodePath],
        span: Span,
    ) {
        let mut seen = BTreeSet::new();
        for name in names {
            if !seen.insert(name) {
                self.errors.push(BuildError::DuplicateTarget {
                    node: source.clone(),
                    clause: role.clause(),
                    target: name.clone(),
                });
                continue;
            }
            if &scope.join(name) == source {
                self.errors.push(BuildError::SelfReference {
                    node: source.clone(),
                    clause: role.clause(),
                });
                continue;
            }
            self.references.push(SymbolicRef {
                role,
                source: source.clone(),
                scope: scope.clone(),
                name: name.clone(),
                span,
            });
        }
    }
}
