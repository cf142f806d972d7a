//! Validation diagnostics.

use std::fmt;

use lemmata_core::NodePath;
use serde::{Deserialize, Serialize};

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Warning => write!(f, "WARN"),
        }
    }
}

/// Who is responsible for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Origin {
    /// Caused by the library source or its change log.
    Author,
    /// A defect in data the toolchain assembled itself.
    Internal,
}

/// What a diagnostic reports.
///
/// Variants are declared in the order their checks run; sorting by kind
/// therefore sorts by check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DiagnosticKind {
    InternalInvariant,
    IllegalRetarget,
    UnloggedDisappearance,
    LoggedGhost,
    DanglingReference,
    MultipleExpansion,
    UnusedAssertion,
    StaleChangeLogEntry,
    UnusedChangeLogEntry,
    InvalidReplacement,
    VersionNotIncreased,
    DisallowedBreakingChange,
    UndeliveredTarget,
}

impl DiagnosticKind {
    pub fn severity(&self) -> Severity {
        match self {
            DiagnosticKind::LoggedGhost
            | DiagnosticKind::UnusedAssertion
            | DiagnosticKind::StaleChangeLogEntry
            | DiagnosticKind::UnusedChangeLogEntry
            | DiagnosticKind::UndeliveredTarget => Severity::Warning,
            _ => Severity::Error,
        }
    }

    pub fn origin(&self) -> Origin {
        match self {
            DiagnosticKind::InternalInvariant => Origin::Internal,
            _ => Origin::Author,
        }
    }

    /// Short kebab-case label used in reports.
    pub fn label(&self) -> &'static str {
        match self {
            DiagnosticKind::InternalInvariant => "internal-invariant",
            DiagnosticKind::IllegalRetarget => "illegal-retarget",
            DiagnosticKind::UnloggedDisappearance => "unlogged-disappearance",
            DiagnosticKind::LoggedGhost => "logged-ghost",
            DiagnosticKind::DanglingReference => "dangling-reference",
            DiagnosticKind::MultipleExpansion => "multiple-expansion",
            DiagnosticKind::UnusedAssertion => "unused-assertion",
            DiagnosticKind::StaleChangeLogEntry => "stale-change-log-entry",
            DiagnosticKind::UnusedChangeLogEntry => "unused-change-log-entry",
            DiagnosticKind::InvalidReplacement => "invalid-replacement",
            DiagnosticKind::VersionNotIncreased => "version-not-increased",
            DiagnosticKind::DisallowedBreakingChange => "disallowed-breaking-change",
            DiagnosticKind::UndeliveredTarget => "undelivered-target",
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// One finding of the validator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ValidationDiagnostic {
    pub kind: DiagnosticKind,
    /// The node the finding is about; `None` for library-level findings.
    pub path: Option<NodePath>,
    pub message: String,
    pub severity: Severity,
    pub origin: Origin,
}

impl ValidationDiagnostic {
    pub fn new(kind: DiagnosticKind, path: Option<NodePath>, message: impl Into<String>) -> Self {
        Self {
            kind,
            path,
            message: message.into(),
            severity: kind.severity(),
            origin: kind.origin(),
        }
    }

    pub fn at(kind: DiagnosticKind, path: &NodePath, message: impl Into<String>) -> Self {
        Self::new(kind, Some(path.clone()), message)
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for ValidationDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.severity, self.kind)?;
        if let Some(path) = &self.path {
            write!(f, " {path}")?;
        }
        write!(f, ": {}", self.message)?;
        if self.origin == Origin::Internal {
            write!(f, " (internal defect)")?;
        }
        Ok(())
    }
}
