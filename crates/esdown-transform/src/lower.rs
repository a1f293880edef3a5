//! The lowering traversal.
//!
//! One post-order walk over the script. Every construct is rewritten when
//! the walk leaves it, so the edits for its children already exist and can
//! be rendered into the text that replaces it.

use crate::bindings;
use crate::classes::ClassFrame;
use crate::destructuring::is_pattern_assignment;
use esdown_scope::walk::{
    Binding, ClassSite, DeclSite, FunctionNode, MemberSite, RefSite, ScopeSite, Visitor,
};
use esdown_scope::{DeclId, LowerResult, ScopeId, TextRange, Unit};
use std::collections::HashMap;
use swc_common::Span;
use swc_ecma_ast::{Expr, Ident, VarDecl};

pub(crate) struct Lowerer<'u> {
    pub unit: &'u mut Unit,
    /// Block-scoped declarations that get a new name once hoisted.
    pub renames: HashMap<DeclId, String>,
    pub scopes: Vec<ScopeId>,
    /// Number of functions the walk is inside
    pub function_depth: usize,
    /// Function depth at each enclosing loop
    pub loops: Vec<usize>,
    pub classes: Vec<ClassFrame>,
    /// Function scope to its `arguments` alias
    pub arguments_aliases: HashMap<ScopeId, String>,
    /// Pattern assignments entered but not yet lowered
    pub pattern_depth: usize,
    /// Temporaries held until the outermost pattern assignment is lowered
    pub held_temps: Vec<(ScopeId, String)>,
}

impl<'u> Lowerer<'u> {
    pub fn new(unit: &'u mut Unit) -> Self {
        let renames = bindings::plan_renames(unit);
        Self {
            unit,
            renames,
            scopes: Vec::new(),
            function_depth: 0,
            loops: Vec::new(),
            classes: Vec::new(),
            arguments_aliases: HashMap::new(),
            pattern_depth: 0,
            held_temps: Vec::new(),
        }
    }

    pub fn range(&self, span: Span) -> TextRange {
        self.unit.range(span)
    }

    pub fn current_scope(&self) -> ScopeId {
        self.scopes
            .last()
            .copied()
            .unwrap_or_else(|| self.unit.program())
    }

    /// Source of `range` with the edits made so far inside it.
    pub fn render(&self, range: TextRange) -> LowerResult<String> {
        self.unit
            .edits
            .render(self.unit.source(), range)
            .map_err(|e| self.unit.assertion(range, &e.to_string()))
    }

    pub fn supersede(&mut self, range: TextRange, text: impl Into<String>) -> LowerResult<()> {
        match self.unit.edits.supersede(range, text) {
            Ok(_) => Ok(()),
            Err(e) => Err(self.unit.assertion(range, &e.to_string())),
        }
    }

    /// Name a binding identifier has in the output.
    pub fn binding_name(&self, ident: &Ident) -> String {
        let range = self.range(ident.span);
        self.unit
            .bindings
            .get(&range)
            .and_then(|id| self.renames.get(id))
            .cloned()
            .unwrap_or_else(|| ident.sym.to_string())
    }

    /// Name a referencing identifier has in the output.
    pub fn reference_name(&self, ident: &Ident) -> String {
        let range = self.range(ident.span);
        if let Some(alias) = self.arguments_alias_for(range) {
            return alias;
        }
        self.unit
            .reference(range)
            .and_then(|r| r.decl)
            .and_then(|id| self.renames.get(&id))
            .cloned()
            .unwrap_or_else(|| ident.sym.to_string())
    }
}

impl Visitor for Lowerer<'_> {
    fn enter_scope(&mut self, site: &ScopeSite) -> LowerResult<()> {
        let id = self.unit.scope_of(site.owner)?;
        self.scopes.push(id);
        Ok(())
    }

    fn leave_scope(&mut self, _site: &ScopeSite) -> LowerResult<()> {
        self.scopes.pop();
        Ok(())
    }

    fn declare(&mut self, binding: &Binding<'_>) -> LowerResult<()> {
        self.rename_binding(binding);
        Ok(())
    }

    fn reference(&mut self, site: &RefSite<'_>) -> LowerResult<()> {
        if self.alias_arguments(site)? {
            return Ok(());
        }
        self.rename_reference(site);
        Ok(())
    }

    fn enter_loop(&mut self, _range: TextRange) -> LowerResult<()> {
        self.loops.push(self.function_depth);
        Ok(())
    }

    fn leave_loop(&mut self, _range: TextRange) -> LowerResult<()> {
        self.loops.pop();
        Ok(())
    }

    fn enter_function(&mut self, _node: &FunctionNode<'_>) -> LowerResult<()> {
        self.function_depth += 1;
        Ok(())
    }

    fn leave_function(&mut self, node: &FunctionNode<'_>) -> LowerResult<()> {
        let prologue = self.lower_params(node)?;
        if let FunctionNode::Arrow(arrow) = node {
            self.lower_arrow(arrow, prologue)?;
        } else if !prologue.is_empty() {
            self.insert_prologue(node, &prologue)?;
        }
        self.function_depth -= 1;
        Ok(())
    }

    fn enter_class(&mut self, site: &ClassSite<'_>) -> LowerResult<()> {
        self.begin_class(site)
    }

    fn leave_class(&mut self, site: &ClassSite<'_>) -> LowerResult<()> {
        self.finish_class(site)
    }

    fn enter_member(&mut self, site: &MemberSite) -> LowerResult<()> {
        if let Some(frame) = self.classes.last_mut() {
            frame.member = Some(*site);
        }
        Ok(())
    }

    fn leave_member(&mut self, _site: &MemberSite) -> LowerResult<()> {
        if let Some(frame) = self.classes.last_mut() {
            frame.member = None;
        }
        Ok(())
    }

    fn leave_var_decl(&mut self, decl: &VarDecl, site: DeclSite) -> LowerResult<()> {
        self.lower_var_decl(decl, site)
    }

    fn enter_expr(&mut self, expr: &Expr) -> LowerResult<()> {
        if let Expr::Assign(assign) = expr {
            if is_pattern_assignment(assign) {
                self.pattern_depth += 1;
            }
        }
        Ok(())
    }

    fn leave_expr(&mut self, expr: &Expr) -> LowerResult<()> {
        match expr {
            Expr::Assign(assign) => {
                self.reject_super_write_assign(assign)?;
                self.lower_pattern_assignment(assign)
            }
            Expr::Update(update) => self.reject_super_write_update(update),
            Expr::Call(call) => self.lower_super_call(call),
            Expr::SuperProp(prop) => self.lower_super_get(prop),
            _ => Ok(()),
        }
    }
}
