//! Diagnostic infrastructure for the esdown lowering compiler.
//!
//! Every failure the lowering core reports is fatal for its compilation
//! unit, so the model here is deliberately small:
//! - byte spans into a cached source file
//! - one [`Diagnostic`] per failure, tagged with a stable [`DiagnosticCode`]
//! - emitters for terminal, JSON and single-line output
//!
//! # Example
//!
//! ```
//! use esdown_diagnostics::{
//!     Diagnostic, DiagnosticCode, DiagnosticEmitter, SimpleEmitter, SourceCache, Span,
//! };
//!
//! let mut cache = SourceCache::new();
//! let file_id = cache.add_file("input.js", "const c = 1; c = 2;".to_string());
//!
//! let diag = Diagnostic::error(DiagnosticCode::ConstReassignment, "can't assign to const c")
//!     .with_span(Span::new(file_id, 13, 14))
//!     .with_help("declare the binding with `let` if it must change")
//!     .build();
//!
//! let mut out = Vec::new();
//! SimpleEmitter::new(&mut out).emit(&diag, &cache).unwrap();
//! assert!(String::from_utf8(out).unwrap().starts_with("input.js:1:14"));
//! ```

pub mod diagnostic;
pub mod emitter;
pub mod source_cache;
pub mod span;

pub use diagnostic::{Diagnostic, DiagnosticBuilder, DiagnosticCode, Diagnostics, Severity};
pub use emitter::{DiagnosticEmitter, JsonEmitter, SimpleEmitter, TerminalEmitter};
pub use source_cache::{SourceCache, SourceFile};
pub use span::{FileId, Location, Span};
