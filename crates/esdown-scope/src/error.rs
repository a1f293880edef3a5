//! Lowering errors.
//!
//! Every error is fatal for its compilation unit. Messages come from a
//! per-kind template with positional `{0}`, `{1}`, ... placeholders.

use crate::range::TextRange;
use esdown_diagnostics::{Diagnostic, DiagnosticCode, FileId, Span};

/// The kinds of failure the lowering core can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    StructuralAssertion,
    UnknownReference,
    UseBeforeDeclaration,
    ConstReassignment,
    UnsupportedLoopClosure,
    SelfReferentialDefault,
    DisallowedVar,
}

impl ErrorKind {
    pub fn template(&self) -> &'static str {
        match self {
            Self::StructuralAssertion => "internal invariant violated: {0}",
            Self::UnknownReference => "reference to unknown global variable {0}",
            Self::UseBeforeDeclaration => "{0} is referenced before its declaration",
            Self::ConstReassignment => "can't assign to const variable {0}",
            Self::UnsupportedLoopClosure => {
                "can't transform closure. {0} is defined outside closure, inside loop"
            }
            Self::SelfReferentialDefault => {
                "default value of parameter {0} references the parameter itself"
            }
            Self::DisallowedVar => "var {0} is not allowed (use let or const)",
        }
    }

    pub fn code(&self) -> DiagnosticCode {
        match self {
            Self::StructuralAssertion => DiagnosticCode::StructuralAssertion,
            Self::UnknownReference => DiagnosticCode::UnknownReference,
            Self::UseBeforeDeclaration => DiagnosticCode::UseBeforeDeclaration,
            Self::ConstReassignment => DiagnosticCode::ConstReassignment,
            Self::UnsupportedLoopClosure => DiagnosticCode::UnsupportedLoopClosure,
            Self::SelfReferentialDefault => DiagnosticCode::SelfReferentialDefault,
            Self::DisallowedVar => DiagnosticCode::DisallowedVar,
        }
    }

    pub fn help(&self) -> &'static str {
        match self {
            Self::StructuralAssertion => {
                "the input uses a construct outside the supported ES6 script dialect"
            }
            Self::UnknownReference => {
                "declare the variable, or list it under `globals` / `environments`"
            }
            Self::UseBeforeDeclaration => "move the declaration above its first use",
            Self::ConstReassignment => "declare the binding with `let` if it must change",
            Self::UnsupportedLoopClosure => {
                "wrap the loop body in a function that receives the binding as a parameter"
            }
            Self::SelfReferentialDefault => "a default value cannot read the parameter it initializes",
            Self::DisallowedVar => "replace `var` with `let` or `const`",
        }
    }
}

/// Substitute `{0}`, `{1}`, ... in `template` with `args`.
pub fn format_template(template: &str, args: &[&str]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let index = after
            .find('}')
            .and_then(|close| after[..close].parse::<usize>().ok().map(|i| (i, close)));
        match index {
            Some((i, close)) => {
                out.push_str(args.get(i).copied().unwrap_or(""));
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// A fatal lowering error, located by line and source range.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("line {line}: {message}")]
pub struct LowerError {
    pub kind: ErrorKind,
    /// 1-based line of `range.start`
    pub line: u32,
    pub range: TextRange,
    pub message: String,
}

impl LowerError {
    pub fn new(kind: ErrorKind, line: u32, range: TextRange, args: &[&str]) -> Self {
        Self {
            kind,
            line,
            range,
            message: format_template(kind.template(), args),
        }
    }

    pub fn to_diagnostic(&self, file_id: FileId) -> Diagnostic {
        Diagnostic::error(self.kind.code(), self.message.clone())
            .with_span(Span::new(file_id, self.range.start, self.range.end))
            .with_help(self.kind.help())
            .build()
    }
}

pub type LowerResult<T> = Result<T, LowerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_template() {
        assert_eq!(format_template("{0} and {1}", &["a", "b"]), "a and b");
        assert_eq!(format_template("{1}{0}{1}", &["x", "y"]), "yxy");
        assert_eq!(format_template("missing {3}", &["x"]), "missing ");
        assert_eq!(format_template("{not a slot}", &[]), "{not a slot}");
    }

    #[test]
    fn test_display_includes_line() {
        let err = LowerError::new(
            ErrorKind::ConstReassignment,
            3,
            TextRange::new(20, 21),
            &["c"],
        );
        assert_eq!(err.to_string(), "line 3: can't assign to const variable c");
        let diag = err.to_diagnostic(FileId(0));
        assert_eq!(diag.code, DiagnosticCode::ConstReassignment);
        assert_eq!(diag.span.start, 20);
    }
}
