//! Scope analysis for esdown
//!
//! Builds the scope tree of a parsed script, resolves every name use to its
//! declaration, and owns the per-unit state the lowering passes share:
//! fresh names, shared helpers, scope temporaries and the edit sink.
//!
//! The analysis order is fixed: [`Unit::analyze`] builds scopes, resolves
//! references and checks const writes; [`check_loop_closures`] may run any
//! time after that.

pub mod build;
pub mod edits;
pub mod env;
pub mod error;
pub mod helpers;
pub mod loops;
pub mod names;
pub mod options;
pub mod range;
pub mod resolve;
pub mod text;
pub mod tree;
pub mod unit;
pub mod walk;

pub use edits::{apply_edits, ApplyError, EditId, EditSink, Placement, TextEdit};
pub use error::{ErrorKind, LowerError, LowerResult};
pub use helpers::HelperInit;
pub use loops::check_loop_closures;
pub use names::NameRegistry;
pub use options::Options;
pub use range::TextRange;
pub use tree::{DeclId, DeclKind, Declaration, Scope, ScopeId, ScopeKind, ScopeOwner, ScopeTree};
pub use unit::{Reference, Unit};
pub use walk::{walk_script, Visitor};

/// Parse and analyze `source` for tests.
#[cfg(test)]
pub(crate) fn analyzed(source: &str, options: Options) -> LowerResult<Unit> {
    let parsed = esdown_parser::parse_script(source, "test.js").unwrap();
    let mut unit = Unit::new(source, parsed.base, options);
    unit.analyze(&parsed.script)?;
    Ok(unit)
}
