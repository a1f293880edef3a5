//! Diagnostic records and their error codes.

use crate::span::Span;
use serde::{Deserialize, Serialize};

/// Severity level of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Stable error codes reported by the parser and the lowering passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticCode {
    // Parse errors (P001-P099)
    /// Syntax error reported by the parser
    ParseError,

    // Lowering errors (E001-E099)
    /// The syntax tree violates a shape the lowering passes rely on
    StructuralAssertion,
    /// Unresolved name while unknown references are disallowed
    UnknownReference,
    /// Block-scoped binding read before its declaration
    UseBeforeDeclaration,
    /// Write to a `const` binding
    ConstReassignment,
    /// Closure captures a per-iteration binding of an enclosing loop
    UnsupportedLoopClosure,
    /// Parameter default value references its own parameter
    SelfReferentialDefault,
    /// `var` declaration while `var` is disallowed
    DisallowedVar,
}

impl DiagnosticCode {
    /// All codes, in numbering order.
    pub const ALL: [DiagnosticCode; 8] = [
        Self::ParseError,
        Self::StructuralAssertion,
        Self::UnknownReference,
        Self::UseBeforeDeclaration,
        Self::ConstReassignment,
        Self::UnsupportedLoopClosure,
        Self::SelfReferentialDefault,
        Self::DisallowedVar,
    ];

    /// Get the code string (e.g., "E004").
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ParseError => "P001",
            Self::StructuralAssertion => "E001",
            Self::UnknownReference => "E002",
            Self::UseBeforeDeclaration => "E003",
            Self::ConstReassignment => "E004",
            Self::UnsupportedLoopClosure => "E005",
            Self::SelfReferentialDefault => "E006",
            Self::DisallowedVar => "E007",
        }
    }

    /// Look a code up by its string form, case-insensitively.
    pub fn from_code(code: &str) -> Option<DiagnosticCode> {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(code))
    }

    /// Every lowering failure aborts the unit, so all codes are errors.
    pub fn default_severity(&self) -> Severity {
        Severity::Error
    }
}

impl std::fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single reported problem.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub code: DiagnosticCode,
    pub severity: Severity,
    /// Short message (single line)
    pub message: String,
    /// Help text shown under the snippet
    pub help: Option<String>,
    /// Primary span (where the error is)
    pub span: Span,
    /// Secondary locations with their notes
    pub notes: Vec<(Span, String)>,
}

impl Diagnostic {
    pub fn error(code: DiagnosticCode, message: impl Into<String>) -> DiagnosticBuilder {
        DiagnosticBuilder::new(code, Severity::Error, message)
    }

    pub fn warning(code: DiagnosticCode, message: impl Into<String>) -> DiagnosticBuilder {
        DiagnosticBuilder::new(code, Severity::Warning, message)
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warning
    }
}

/// Builder for constructing diagnostics fluently.
pub struct DiagnosticBuilder {
    inner: Diagnostic,
}

impl DiagnosticBuilder {
    pub fn new(code: DiagnosticCode, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            inner: Diagnostic {
                code,
                severity,
                message: message.into(),
                help: None,
                span: Span::DUMMY,
                notes: Vec::new(),
            },
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.inner.span = span;
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.inner.help = Some(help.into());
        self
    }

    /// Attach a note pointing at a related location.
    pub fn with_note(mut self, span: Span, message: impl Into<String>) -> Self {
        self.inner.notes.push((span, message.into()));
        self
    }

    pub fn build(self) -> Diagnostic {
        self.inner
    }
}

/// Diagnostics collected over a run of the driver.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    pub items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.items.push(diagnostic);
    }

    pub fn extend(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        self.items.extend(diagnostics);
    }

    pub fn has_errors(&self) -> bool {
        self.items.iter().any(|d| d.is_error())
    }

    pub fn error_count(&self) -> usize {
        self.items.iter().filter(|d| d.is_error()).count()
    }

    pub fn warning_count(&self) -> usize {
        self.items.iter().filter(|d| d.is_warning()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}
