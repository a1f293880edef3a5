//! The compilation unit: every piece of state the passes share.

use crate::build;
use crate::edits::EditSink;
use crate::error::{ErrorKind, LowerError, LowerResult};
use crate::helpers::{self, HelperInit, Helpers};
use crate::names::NameRegistry;
use crate::options::Options;
use crate::range::TextRange;
use crate::resolve;
use crate::tree::{DeclId, ScopeId, ScopeOwner, ScopeTree};
use crate::walk::Access;
use esdown_diagnostics::{FileId, SourceFile};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use swc_common::Span;
use swc_ecma_ast::Script;

/// A resolved use of a name.
#[derive(Debug, Clone)]
pub struct Reference {
    pub name: String,
    /// Scope the use appears in
    pub scope: ScopeId,
    /// `None` for an unresolved global
    pub decl: Option<DeclId>,
    pub access: Access,
}

/// State for lowering one script.
///
/// Created once per input and passed by reference into every pass. All
/// scope and declaration links are indices into `tree`.
pub struct Unit {
    pub options: Options,
    pub file: SourceFile,
    /// SWC byte position of the first byte of `file`
    pub base: u32,
    pub tree: ScopeTree,
    pub names: NameRegistry,
    pub helpers: Helpers,
    pub edits: EditSink,
    /// Binding identifier range to the declaration it introduced or joined.
    pub bindings: HashMap<TextRange, DeclId>,
    /// Use-site identifier range to its resolution.
    pub references: HashMap<TextRange, Reference>,
    /// Arrow functions (by range) that must have their receiver bound.
    pub bound_receivers: HashSet<TextRange>,
}

impl Unit {
    pub fn new(source: impl Into<String>, base: u32, options: Options) -> Self {
        let file = SourceFile::new(FileId(0), PathBuf::from("<input>"), source.into());
        Self::with_file(file, base, options)
    }

    /// Use a file already registered in a source cache, so error ranges
    /// line up with its diagnostics.
    pub fn with_file(file: SourceFile, base: u32, options: Options) -> Self {
        Self {
            options,
            file,
            base,
            tree: ScopeTree::new(),
            names: NameRegistry::new(),
            helpers: Helpers::new(),
            edits: EditSink::new(),
            bindings: HashMap::new(),
            references: HashMap::new(),
            bound_receivers: HashSet::new(),
        }
    }

    /// Drop everything derived from the script, keeping source and options.
    pub fn reset(&mut self) {
        self.tree = ScopeTree::new();
        self.names.clear();
        self.helpers.clear();
        self.edits.clear();
        self.bindings.clear();
        self.references.clear();
        self.bound_receivers.clear();
    }

    /// Scope building, reference resolution and const-write detection, in
    /// that order.
    pub fn analyze(&mut self, script: &Script) -> LowerResult<()> {
        log::debug!("building scopes");
        build::build_scopes(self, script)?;
        log::debug!("resolving references ({} scopes)", self.tree.len());
        resolve::resolve_references(self, script)?;
        resolve::detect_const_writes(self)
    }

    pub fn source(&self) -> &str {
        &self.file.source
    }

    pub fn range(&self, span: Span) -> TextRange {
        TextRange::of(span, self.base)
    }

    pub fn slice(&self, range: TextRange) -> &str {
        self.file.source.get(range.as_usize()).unwrap_or("")
    }

    pub fn error(&self, kind: ErrorKind, range: TextRange, args: &[&str]) -> LowerError {
        LowerError::new(kind, self.file.line_of(range.start), range, args)
    }

    pub fn assertion(&self, range: TextRange, what: &str) -> LowerError {
        self.error(ErrorKind::StructuralAssertion, range, &[what])
    }

    pub fn program(&self) -> ScopeId {
        self.tree
            .owned(&ScopeOwner::Program)
            .unwrap_or_else(|| self.tree.ambient())
    }

    /// The scope built for `owner`.
    pub fn scope_of(&self, owner: ScopeOwner) -> LowerResult<ScopeId> {
        self.tree.owned(&owner).ok_or_else(|| {
            let range = match owner {
                ScopeOwner::Function(r)
                | ScopeOwner::Block(r)
                | ScopeOwner::Catch(r)
                | ScopeOwner::LoopHead(r)
                | ScopeOwner::Switch(r)
                | ScopeOwner::Class(r) => r,
                ScopeOwner::Ambient | ScopeOwner::Program => TextRange::default(),
            };
            self.assertion(range, &format!("no scope was built for {:?}", owner))
        })
    }

    pub fn reference(&self, range: TextRange) -> Option<&Reference> {
        self.references.get(&range)
    }

    pub fn unique(&mut self, base: &str, is_declaration: bool) -> String {
        self.names.unique(base, is_declaration)
    }

    pub fn unique_by_token(&mut self, token: &str, base: &str) -> String {
        self.names.unique_by_token(token, base)
    }

    /// Name of the shared helper `logical` initialised to `init`, visible
    /// from `scope`. See [`helpers::bubbled_variable_declaration`].
    pub fn bubbled_variable_declaration(
        &mut self,
        scope: ScopeId,
        logical: &str,
        init: HelperInit,
    ) -> LowerResult<String> {
        helpers::bubbled_variable_declaration(self, scope, logical, init)
    }

    pub fn get_scope_temp_var(&mut self, scope: ScopeId) -> LowerResult<String> {
        helpers::get_scope_temp_var(self, scope)
    }

    pub fn set_scope_temp_var(&mut self, scope: ScopeId, name: String) {
        helpers::set_scope_temp_var(self, scope, name)
    }
}
