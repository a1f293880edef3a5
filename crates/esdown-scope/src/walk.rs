//! Shared traversal of the script tree.
//!
//! Every pass (scope building, resolution, the loop-closure check and the
//! lowering driver) is a [`Visitor`] over the same walk, so they all agree
//! on which nodes open scopes, which identifiers are bindings and which are
//! references, and in what order they are seen. Hooks named `leave_*` fire
//! after the node's children, which gives the lowering passes their
//! post-order.

use crate::error::LowerResult;
use crate::range::TextRange;
use crate::text;
use crate::tree::{DeclKind, ScopeKind, ScopeOwner};
use swc_common::{Span, Spanned};
use swc_ecma_ast::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
    ReadWrite,
}

impl Access {
    pub fn is_write(&self) -> bool {
        !matches!(self, Access::Read)
    }
}

/// A use of a name.
pub struct RefSite<'a> {
    pub ident: &'a Ident,
    pub range: TextRange,
    pub access: Access,
    /// `{x}` in an object literal or assignment pattern
    pub shorthand: bool,
}

impl RefSite<'_> {
    pub fn name(&self) -> &str {
        self.ident.sym.as_ref()
    }
}

/// A binding identifier in a declaration, parameter list or catch clause.
pub struct Binding<'a> {
    pub ident: &'a Ident,
    pub range: TextRange,
    pub kind: DeclKind,
    pub visible_from: u32,
    pub origin: Option<TextRange>,
    /// `{x}` in an object pattern
    pub shorthand: bool,
}

impl Binding<'_> {
    pub fn name(&self) -> &str {
        self.ident.sym.as_ref()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ScopeSite {
    pub owner: ScopeOwner,
    pub kind: ScopeKind,
    pub range: TextRange,
    pub function: bool,
    pub arrow: bool,
    /// The body starts with a `"use strict"` directive.
    pub strict_directive: bool,
    pub insert_at: Option<u32>,
}

impl ScopeSite {
    fn block(owner: ScopeOwner, range: TextRange) -> Self {
        Self {
            owner,
            kind: ScopeKind::Block,
            range,
            function: false,
            arrow: false,
            strict_directive: false,
            insert_at: None,
        }
    }
}

/// Where a `var` / `let` / `const` declaration appears.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclSite {
    Statement,
    /// `for (HERE; ...)`
    ForInit,
    /// `for (HERE in ...)` / `for (HERE of ...)`
    ForHead,
}

pub struct ClassSite<'a> {
    pub class: &'a Class,
    pub ident: Option<&'a Ident>,
    pub is_decl: bool,
    pub range: TextRange,
}

#[derive(Debug, Clone, Copy)]
pub struct MemberSite {
    pub is_static: bool,
    pub range: TextRange,
}

/// Anything with parameters and a body of its own.
#[derive(Clone, Copy)]
pub enum FunctionNode<'a> {
    /// Function declarations and expressions, class and object methods.
    Function {
        function: &'a Function,
        ident: Option<&'a Ident>,
        is_decl: bool,
    },
    Constructor(&'a Constructor),
    Arrow(&'a ArrowExpr),
    Getter(&'a GetterProp),
    Setter(&'a SetterProp),
}

pub enum FunctionBody<'a> {
    Block(&'a BlockStmt),
    Expr(&'a Expr),
    None,
}

pub struct ParamSlot<'a> {
    pub pat: &'a Pat,
    pub range: TextRange,
}

impl<'a> FunctionNode<'a> {
    pub fn span(&self) -> Span {
        match *self {
            FunctionNode::Function { function, .. } => function.span,
            FunctionNode::Constructor(c) => c.span,
            FunctionNode::Arrow(a) => a.span,
            FunctionNode::Getter(g) => g.span,
            FunctionNode::Setter(s) => s.span,
        }
    }

    pub fn range(&self, base: u32) -> TextRange {
        TextRange::of(self.span(), base)
    }

    pub fn is_arrow(&self) -> bool {
        matches!(self, FunctionNode::Arrow(_))
    }

    pub fn params(&self, base: u32) -> Vec<ParamSlot<'a>> {
        match *self {
            FunctionNode::Function { function, .. } => function
                .params
                .iter()
                .map(|p| ParamSlot {
                    pat: &p.pat,
                    range: TextRange::of(p.span, base),
                })
                .collect(),
            FunctionNode::Constructor(c) => c
                .params
                .iter()
                .filter_map(|p| match p {
                    ParamOrTsParamProp::Param(p) => Some(ParamSlot {
                        pat: &p.pat,
                        range: TextRange::of(p.span, base),
                    }),
                    ParamOrTsParamProp::TsParamProp(_) => None,
                })
                .collect(),
            FunctionNode::Arrow(a) => a
                .params
                .iter()
                .map(|p| ParamSlot {
                    pat: p,
                    range: TextRange::of(p.span(), base),
                })
                .collect(),
            FunctionNode::Getter(_) => Vec::new(),
            FunctionNode::Setter(s) => vec![ParamSlot {
                pat: &*s.param,
                range: TextRange::of(s.param.span(), base),
            }],
        }
    }

    pub fn body(&self) -> FunctionBody<'a> {
        let block = |b: &'a Option<BlockStmt>| b.as_ref().map_or(FunctionBody::None, FunctionBody::Block);
        match *self {
            FunctionNode::Function { function, .. } => block(&function.body),
            FunctionNode::Constructor(c) => block(&c.body),
            FunctionNode::Arrow(a) => match &*a.body {
                BlockStmtOrExpr::BlockStmt(b) => FunctionBody::Block(b),
                BlockStmtOrExpr::Expr(e) => FunctionBody::Expr(&**e),
            },
            FunctionNode::Getter(g) => block(&g.body),
            FunctionNode::Setter(s) => block(&s.body),
        }
    }
}

/// Hooks called during [`walk_script`]. All default to doing nothing.
pub trait Visitor {
    fn enter_scope(&mut self, _site: &ScopeSite) -> LowerResult<()> {
        Ok(())
    }

    fn leave_scope(&mut self, _site: &ScopeSite) -> LowerResult<()> {
        Ok(())
    }

    fn declare(&mut self, _binding: &Binding<'_>) -> LowerResult<()> {
        Ok(())
    }

    fn reference(&mut self, _site: &RefSite<'_>) -> LowerResult<()> {
        Ok(())
    }

    /// `this`, or `super` in a call or property access.
    fn receiver(&mut self, _range: TextRange) -> LowerResult<()> {
        Ok(())
    }

    fn enter_loop(&mut self, _range: TextRange) -> LowerResult<()> {
        Ok(())
    }

    fn leave_loop(&mut self, _range: TextRange) -> LowerResult<()> {
        Ok(())
    }

    fn enter_function(&mut self, _node: &FunctionNode<'_>) -> LowerResult<()> {
        Ok(())
    }

    fn leave_function(&mut self, _node: &FunctionNode<'_>) -> LowerResult<()> {
        Ok(())
    }

    fn enter_class(&mut self, _site: &ClassSite<'_>) -> LowerResult<()> {
        Ok(())
    }

    fn leave_class(&mut self, _site: &ClassSite<'_>) -> LowerResult<()> {
        Ok(())
    }

    fn enter_member(&mut self, _site: &MemberSite) -> LowerResult<()> {
        Ok(())
    }

    fn leave_member(&mut self, _site: &MemberSite) -> LowerResult<()> {
        Ok(())
    }

    fn leave_var_decl(&mut self, _decl: &VarDecl, _site: DeclSite) -> LowerResult<()> {
        Ok(())
    }

    fn enter_expr(&mut self, _expr: &Expr) -> LowerResult<()> {
        Ok(())
    }

    fn leave_expr(&mut self, _expr: &Expr) -> LowerResult<()> {
        Ok(())
    }
}

/// Walk `script`, whose spans are offset by `base` relative to `source`.
pub fn walk_script<V: Visitor>(
    script: &Script,
    source: &str,
    base: u32,
    visitor: &mut V,
) -> LowerResult<()> {
    let mut walk = Walk {
        source,
        base,
        v: visitor,
    };
    walk.program(script)
}

struct Walk<'s, 'v, V> {
    source: &'s str,
    base: u32,
    v: &'v mut V,
}

impl<V: Visitor> Walk<'_, '_, V> {
    fn range(&self, span: Span) -> TextRange {
        TextRange::of(span, self.base)
    }

    fn program(&mut self, script: &Script) -> LowerResult<()> {
        let (strict, insert_at) = self.directives(&script.body, 0);
        let site = ScopeSite {
            owner: ScopeOwner::Program,
            kind: ScopeKind::Hoist,
            range: TextRange::new(0, self.source.len() as u32),
            function: false,
            arrow: false,
            strict_directive: strict,
            insert_at: Some(insert_at),
        };
        self.v.enter_scope(&site)?;
        self.stmts(&script.body)?;
        self.v.leave_scope(&site)
    }

    /// Strictness and end offset of the directive prologue of `stmts`.
    fn directives(&self, stmts: &[Stmt], body_start: u32) -> (bool, u32) {
        let mut strict = false;
        let mut end = body_start;
        for stmt in stmts {
            let Stmt::Expr(ExprStmt { span, expr }) = stmt else {
                break;
            };
            if !matches!(&**expr, Expr::Lit(Lit::Str(_))) {
                break;
            }
            let raw = self.range(expr.span());
            strict |= text::is_use_strict(&self.source[raw.as_usize()]);
            end = self.range(*span).end;
            if let Some(semi) = text::next_is(self.source, raw.end as usize, ';') {
                end = end.max(semi as u32 + 1);
            }
        }
        (strict, end)
    }

    fn stmts(&mut self, stmts: &[Stmt]) -> LowerResult<()> {
        for stmt in stmts {
            self.stmt(stmt)?;
        }
        Ok(())
    }

    fn stmt(&mut self, stmt: &Stmt) -> LowerResult<()> {
        match stmt {
            Stmt::Block(b) => self.block(b),
            Stmt::Empty(_) | Stmt::Debugger(_) | Stmt::Break(_) | Stmt::Continue(_) => Ok(()),
            Stmt::With(w) => {
                self.expr(&w.obj)?;
                self.stmt(&w.body)
            }
            Stmt::Return(r) => match &r.arg {
                Some(arg) => self.expr(arg),
                None => Ok(()),
            },
            Stmt::Labeled(l) => self.stmt(&l.body),
            Stmt::If(i) => {
                self.expr(&i.test)?;
                self.stmt(&i.cons)?;
                match &i.alt {
                    Some(alt) => self.stmt(alt),
                    None => Ok(()),
                }
            }
            Stmt::Switch(s) => self.switch(s),
            Stmt::Throw(t) => self.expr(&t.arg),
            Stmt::Try(t) => self.try_stmt(t),
            Stmt::While(w) => {
                let range = self.range(w.span);
                self.v.enter_loop(range)?;
                self.expr(&w.test)?;
                self.stmt(&w.body)?;
                self.v.leave_loop(range)
            }
            Stmt::DoWhile(d) => {
                let range = self.range(d.span);
                self.v.enter_loop(range)?;
                self.stmt(&d.body)?;
                self.expr(&d.test)?;
                self.v.leave_loop(range)
            }
            Stmt::For(f) => self.for_stmt(f),
            Stmt::ForIn(f) => self.for_each(f.span, &f.left, &f.right, &f.body),
            Stmt::ForOf(f) => self.for_each(f.span, &f.left, &f.right, &f.body),
            Stmt::Decl(decl) => self.decl(decl),
            Stmt::Expr(e) => self.expr(&e.expr),
        }
    }

    fn block(&mut self, block: &BlockStmt) -> LowerResult<()> {
        let range = self.range(block.span);
        let site = ScopeSite::block(ScopeOwner::Block(range), range);
        self.v.enter_scope(&site)?;
        self.stmts(&block.stmts)?;
        self.v.leave_scope(&site)
    }

    fn switch(&mut self, switch: &SwitchStmt) -> LowerResult<()> {
        self.expr(&switch.discriminant)?;
        let range = self.range(switch.span);
        let site = ScopeSite::block(ScopeOwner::Switch(range), range);
        self.v.enter_scope(&site)?;
        for case in &switch.cases {
            if let Some(test) = &case.test {
                self.expr(test)?;
            }
            self.stmts(&case.cons)?;
        }
        self.v.leave_scope(&site)
    }

    fn try_stmt(&mut self, stmt: &TryStmt) -> LowerResult<()> {
        self.block(&stmt.block)?;
        if let Some(handler) = &stmt.handler {
            let range = self.range(handler.span);
            let site = ScopeSite {
                kind: ScopeKind::Catch,
                ..ScopeSite::block(ScopeOwner::Catch(range), range)
            };
            self.v.enter_scope(&site)?;
            if let Some(param) = &handler.param {
                self.binding_pat(param, DeclKind::Caught, 0, Some(range))?;
            }
            self.stmts(&handler.body.stmts)?;
            self.v.leave_scope(&site)?;
        }
        if let Some(finalizer) = &stmt.finalizer {
            self.block(finalizer)?;
        }
        Ok(())
    }

    fn loop_head(&self, range: TextRange, scoped: bool) -> Option<ScopeSite> {
        scoped.then(|| ScopeSite::block(ScopeOwner::LoopHead(range), range))
    }

    fn for_stmt(&mut self, stmt: &ForStmt) -> LowerResult<()> {
        let range = self.range(stmt.span);
        self.v.enter_loop(range)?;
        let scoped = matches!(&stmt.init, Some(VarDeclOrExpr::VarDecl(d)) if d.kind != VarDeclKind::Var);
        let head = self.loop_head(range, scoped);
        if let Some(site) = &head {
            self.v.enter_scope(site)?;
        }
        match &stmt.init {
            Some(VarDeclOrExpr::VarDecl(d)) => self.var_decl(d, DeclSite::ForInit)?,
            Some(VarDeclOrExpr::Expr(e)) => self.expr(e)?,
            None => {}
        }
        if let Some(test) = &stmt.test {
            self.expr(test)?;
        }
        if let Some(update) = &stmt.update {
            self.expr(update)?;
        }
        self.stmt(&stmt.body)?;
        if let Some(site) = &head {
            self.v.leave_scope(site)?;
        }
        self.v.leave_loop(range)
    }

    fn for_each(&mut self, span: Span, left: &ForHead, right: &Expr, body: &Stmt) -> LowerResult<()> {
        let range = self.range(span);
        self.v.enter_loop(range)?;
        let scoped = matches!(left, ForHead::VarDecl(d) if d.kind != VarDeclKind::Var);
        let head = self.loop_head(range, scoped);
        if let Some(site) = &head {
            self.v.enter_scope(site)?;
        }
        match left {
            ForHead::VarDecl(d) => self.var_decl(d, DeclSite::ForHead)?,
            ForHead::Pat(p) => self.assign_pat(p)?,
            ForHead::UsingDecl(_) => {}
        }
        self.expr(right)?;
        self.stmt(body)?;
        if let Some(site) = &head {
            self.v.leave_scope(site)?;
        }
        self.v.leave_loop(range)
    }

    fn decl(&mut self, decl: &Decl) -> LowerResult<()> {
        match decl {
            Decl::Var(v) => self.var_decl(v, DeclSite::Statement),
            Decl::Fn(f) => {
                self.bind(&f.ident, DeclKind::Fun, 0, None, false)?;
                self.function(FunctionNode::Function {
                    function: &f.function,
                    ident: Some(&f.ident),
                    is_decl: true,
                })
            }
            Decl::Class(c) => {
                let range = self.range(c.class.span);
                self.bind(&c.ident, DeclKind::Let, range.end, Some(range), false)?;
                self.class(&c.class, Some(&c.ident), true)
            }
            _ => Ok(()),
        }
    }

    fn var_decl(&mut self, decl: &VarDecl, site: DeclSite) -> LowerResult<()> {
        let kind = match decl.kind {
            VarDeclKind::Var => DeclKind::Var,
            VarDeclKind::Let => DeclKind::Let,
            VarDeclKind::Const => DeclKind::Const,
        };
        for declarator in &decl.decls {
            let origin = self.range(declarator.span);
            let visible_from = if kind.is_block_scoped() { origin.end } else { 0 };
            self.binding_pat(&declarator.name, kind, visible_from, Some(origin))?;
            if let Some(init) = &declarator.init {
                self.expr(init)?;
            }
        }
        self.v.leave_var_decl(decl, site)
    }

    fn bind(
        &mut self,
        ident: &Ident,
        kind: DeclKind,
        visible_from: u32,
        origin: Option<TextRange>,
        shorthand: bool,
    ) -> LowerResult<()> {
        let range = self.range(ident.span);
        self.v.declare(&Binding {
            ident,
            range,
            kind,
            visible_from,
            origin,
            shorthand,
        })
    }

    fn refer(&mut self, ident: &Ident, access: Access, shorthand: bool) -> LowerResult<()> {
        let range = self.range(ident.span);
        self.v.reference(&RefSite {
            ident,
            range,
            access,
            shorthand,
        })
    }

    /// Declaration patterns: every identifier is a binding.
    fn binding_pat(
        &mut self,
        pat: &Pat,
        kind: DeclKind,
        visible_from: u32,
        origin: Option<TextRange>,
    ) -> LowerResult<()> {
        match pat {
            Pat::Ident(b) => self.bind(&b.id, kind, visible_from, origin, false),
            Pat::Array(array) => {
                for elem in array.elems.iter().flatten() {
                    self.binding_pat(elem, kind, visible_from, origin)?;
                }
                Ok(())
            }
            Pat::Rest(rest) => self.binding_pat(&rest.arg, kind, visible_from, origin),
            Pat::Object(object) => {
                for prop in &object.props {
                    match prop {
                        ObjectPatProp::KeyValue(kv) => {
                            self.prop_name(&kv.key)?;
                            self.binding_pat(&kv.value, kind, visible_from, origin)?;
                        }
                        ObjectPatProp::Assign(a) => {
                            self.bind(&a.key.id, kind, visible_from, origin, true)?;
                            if let Some(value) = &a.value {
                                self.expr(value)?;
                            }
                        }
                        ObjectPatProp::Rest(rest) => {
                            self.binding_pat(&rest.arg, kind, visible_from, origin)?
                        }
                    }
                }
                Ok(())
            }
            Pat::Assign(a) => {
                self.binding_pat(&a.left, kind, visible_from, origin)?;
                self.expr(&a.right)
            }
            Pat::Expr(e) => self.expr(e),
            Pat::Invalid(_) => Ok(()),
        }
    }

    /// Assignment patterns: every identifier is a written reference.
    fn assign_pat(&mut self, pat: &Pat) -> LowerResult<()> {
        match pat {
            Pat::Ident(b) => self.refer(&b.id, Access::Write, false),
            Pat::Array(array) => self.assign_array(array),
            Pat::Rest(rest) => self.assign_pat(&rest.arg),
            Pat::Object(object) => self.assign_object(object),
            Pat::Assign(a) => {
                self.assign_pat(&a.left)?;
                self.expr(&a.right)
            }
            Pat::Expr(e) => self.assign_target_expr(e),
            Pat::Invalid(_) => Ok(()),
        }
    }

    fn assign_array(&mut self, array: &ArrayPat) -> LowerResult<()> {
        for elem in array.elems.iter().flatten() {
            self.assign_pat(elem)?;
        }
        Ok(())
    }

    fn assign_object(&mut self, object: &ObjectPat) -> LowerResult<()> {
        for prop in &object.props {
            match prop {
                ObjectPatProp::KeyValue(kv) => {
                    self.prop_name(&kv.key)?;
                    self.assign_pat(&kv.value)?;
                }
                ObjectPatProp::Assign(a) => {
                    self.refer(&a.key.id, Access::Write, true)?;
                    if let Some(value) = &a.value {
                        self.expr(value)?;
                    }
                }
                ObjectPatProp::Rest(rest) => self.assign_pat(&rest.arg)?,
            }
        }
        Ok(())
    }

    fn assign_target_expr(&mut self, expr: &Expr) -> LowerResult<()> {
        match expr {
            Expr::Ident(i) => self.refer(i, Access::Write, false),
            Expr::Paren(p) => self.assign_target_expr(&p.expr),
            other => self.expr(other),
        }
    }

    fn prop_name(&mut self, key: &PropName) -> LowerResult<()> {
        match key {
            PropName::Computed(c) => self.expr(&c.expr),
            _ => Ok(()),
        }
    }

    fn args(&mut self, args: &[ExprOrSpread]) -> LowerResult<()> {
        for arg in args {
            self.expr(&arg.expr)?;
        }
        Ok(())
    }

    fn expr(&mut self, expr: &Expr) -> LowerResult<()> {
        self.v.enter_expr(expr)?;
        match expr {
            Expr::This(t) => {
                let range = self.range(t.span);
                self.v.receiver(range)?;
            }
            Expr::Ident(i) => self.refer(i, Access::Read, false)?,
            Expr::Array(array) => {
                for elem in array.elems.iter().flatten() {
                    self.expr(&elem.expr)?;
                }
            }
            Expr::Object(object) => self.object(object)?,
            Expr::Fn(f) => self.function(FunctionNode::Function {
                function: &f.function,
                ident: f.ident.as_ref(),
                is_decl: false,
            })?,
            Expr::Arrow(a) => self.function(FunctionNode::Arrow(a))?,
            Expr::Class(c) => self.class(&c.class, c.ident.as_ref(), false)?,
            Expr::Unary(u) => self.expr(&u.arg)?,
            Expr::Update(u) => match &*u.arg {
                Expr::Ident(i) => self.refer(i, Access::ReadWrite, false)?,
                other => self.expr(other)?,
            },
            Expr::Bin(b) => {
                self.expr(&b.left)?;
                self.expr(&b.right)?;
            }
            Expr::Assign(a) => self.assign(a)?,
            Expr::Member(m) => self.member(m)?,
            Expr::SuperProp(s) => self.super_prop(s)?,
            Expr::Cond(c) => {
                self.expr(&c.test)?;
                self.expr(&c.cons)?;
                self.expr(&c.alt)?;
            }
            Expr::Call(c) => self.call(c)?,
            Expr::New(n) => {
                self.expr(&n.callee)?;
                if let Some(args) = &n.args {
                    self.args(args)?;
                }
            }
            Expr::Seq(s) => {
                for e in &s.exprs {
                    self.expr(e)?;
                }
            }
            Expr::Tpl(t) => {
                for e in &t.exprs {
                    self.expr(e)?;
                }
            }
            Expr::TaggedTpl(t) => {
                self.expr(&t.tag)?;
                for e in &t.tpl.exprs {
                    self.expr(e)?;
                }
            }
            Expr::Yield(y) => {
                if let Some(arg) = &y.arg {
                    self.expr(arg)?;
                }
            }
            Expr::Await(a) => self.expr(&a.arg)?,
            Expr::Paren(p) => self.expr(&p.expr)?,
            Expr::OptChain(o) => match &*o.base {
                OptChainBase::Member(m) => self.member(m)?,
                OptChainBase::Call(c) => {
                    self.expr(&c.callee)?;
                    self.args(&c.args)?;
                }
            },
            _ => {}
        }
        self.v.leave_expr(expr)
    }

    fn object(&mut self, object: &ObjectLit) -> LowerResult<()> {
        for prop in &object.props {
            let prop = match prop {
                PropOrSpread::Spread(s) => {
                    self.expr(&s.expr)?;
                    continue;
                }
                PropOrSpread::Prop(p) => &**p,
            };
            match prop {
                Prop::Shorthand(i) => self.refer(i, Access::Read, true)?,
                Prop::KeyValue(kv) => {
                    self.prop_name(&kv.key)?;
                    self.expr(&kv.value)?;
                }
                Prop::Assign(a) => self.expr(&a.value)?,
                Prop::Getter(g) => {
                    self.prop_name(&g.key)?;
                    self.function(FunctionNode::Getter(g))?;
                }
                Prop::Setter(s) => {
                    self.prop_name(&s.key)?;
                    self.function(FunctionNode::Setter(s))?;
                }
                Prop::Method(m) => {
                    self.prop_name(&m.key)?;
                    self.function(FunctionNode::Function {
                        function: &m.function,
                        ident: None,
                        is_decl: false,
                    })?;
                }
            }
        }
        Ok(())
    }

    fn member(&mut self, member: &MemberExpr) -> LowerResult<()> {
        self.expr(&member.obj)?;
        if let MemberProp::Computed(c) = &member.prop {
            self.expr(&c.expr)?;
        }
        Ok(())
    }

    fn super_prop(&mut self, prop: &SuperPropExpr) -> LowerResult<()> {
        let range = self.range(prop.obj.span);
        self.v.receiver(range)?;
        if let SuperProp::Computed(c) = &prop.prop {
            self.expr(&c.expr)?;
        }
        Ok(())
    }

    fn call(&mut self, call: &CallExpr) -> LowerResult<()> {
        match &call.callee {
            Callee::Super(s) => {
                let range = self.range(s.span);
                self.v.receiver(range)?;
            }
            Callee::Import(_) => {}
            // a called super property is lowered together with its call
            Callee::Expr(callee) => match &**callee {
                Expr::SuperProp(s) => self.super_prop(s)?,
                other => self.expr(other)?,
            },
        }
        self.args(&call.args)
    }

    fn assign(&mut self, assign: &AssignExpr) -> LowerResult<()> {
        match &assign.left {
            AssignTarget::Simple(simple) => match simple {
                SimpleAssignTarget::Ident(b) => {
                    let access = if assign.op == AssignOp::Assign {
                        Access::Write
                    } else {
                        Access::ReadWrite
                    };
                    self.refer(&b.id, access, false)?;
                }
                SimpleAssignTarget::Member(m) => self.member(m)?,
                SimpleAssignTarget::SuperProp(s) => self.super_prop(s)?,
                SimpleAssignTarget::Paren(p) => self.assign_target_expr(&p.expr)?,
                _ => {}
            },
            AssignTarget::Pat(pat) => match pat {
                AssignTargetPat::Array(array) => self.assign_array(array)?,
                AssignTargetPat::Object(object) => self.assign_object(object)?,
                AssignTargetPat::Invalid(_) => {}
            },
        }
        self.expr(&assign.right)
    }

    fn function(&mut self, node: FunctionNode<'_>) -> LowerResult<()> {
        self.v.enter_function(&node)?;
        let range = node.range(self.base);
        let (strict, insert_at) = match node.body() {
            FunctionBody::Block(b) => {
                let start = self.range(b.span).start + 1;
                let (strict, at) = self.directives(&b.stmts, start);
                (strict, Some(at))
            }
            _ => (false, None),
        };
        let site = ScopeSite {
            owner: ScopeOwner::Function(range),
            kind: ScopeKind::Hoist,
            range,
            function: true,
            arrow: node.is_arrow(),
            strict_directive: strict,
            insert_at,
        };
        self.v.enter_scope(&site)?;
        for slot in node.params(self.base) {
            self.binding_pat(slot.pat, DeclKind::Param, 0, Some(slot.range))?;
        }
        match node.body() {
            FunctionBody::Block(b) => self.stmts(&b.stmts)?,
            FunctionBody::Expr(e) => self.expr(e)?,
            FunctionBody::None => {}
        }
        // a function expression's own name; params and vars shadow it
        if let FunctionNode::Function {
            ident: Some(ident),
            is_decl: false,
            ..
        } = node
        {
            self.bind(ident, DeclKind::Fun, 0, None, false)?;
        }
        self.v.leave_scope(&site)?;
        self.v.leave_function(&node)
    }

    fn class(&mut self, class: &Class, ident: Option<&Ident>, is_decl: bool) -> LowerResult<()> {
        let range = self.range(class.span);
        let site = ClassSite {
            class,
            ident,
            is_decl,
            range,
        };
        self.v.enter_class(&site)?;
        let inner = match (is_decl, ident) {
            (false, Some(ident)) => Some((ident, ScopeSite::block(ScopeOwner::Class(range), range))),
            _ => None,
        };
        if let Some((ident, scope)) = &inner {
            self.v.enter_scope(scope)?;
            self.bind(ident, DeclKind::Const, 0, Some(range), false)?;
        }
        if let Some(super_class) = &class.super_class {
            self.expr(super_class)?;
        }
        for member in &class.body {
            self.class_member(member)?;
        }
        if let Some((_, scope)) = &inner {
            self.v.leave_scope(scope)?;
        }
        self.v.leave_class(&site)
    }

    fn class_member(&mut self, member: &ClassMember) -> LowerResult<()> {
        let range = self.range(member.span());
        let mut site = MemberSite {
            is_static: false,
            range,
        };
        match member {
            ClassMember::Constructor(c) => {
                self.v.enter_member(&site)?;
                self.function(FunctionNode::Constructor(c))?;
            }
            ClassMember::Method(m) => {
                self.prop_name(&m.key)?;
                site.is_static = m.is_static;
                self.v.enter_member(&site)?;
                self.function(FunctionNode::Function {
                    function: &m.function,
                    ident: None,
                    is_decl: false,
                })?;
            }
            ClassMember::PrivateMethod(m) => {
                site.is_static = m.is_static;
                self.v.enter_member(&site)?;
                self.function(FunctionNode::Function {
                    function: &m.function,
                    ident: None,
                    is_decl: false,
                })?;
            }
            ClassMember::ClassProp(p) => {
                self.prop_name(&p.key)?;
                site.is_static = p.is_static;
                self.v.enter_member(&site)?;
                if let Some(value) = &p.value {
                    self.expr(value)?;
                }
            }
            ClassMember::PrivateProp(p) => {
                site.is_static = p.is_static;
                self.v.enter_member(&site)?;
                if let Some(value) = &p.value {
                    self.expr(value)?;
                }
            }
            ClassMember::StaticBlock(b) => {
                site.is_static = true;
                self.v.enter_member(&site)?;
                self.block(&b.body)?;
            }
            _ => return Ok(()),
        }
        self.v.leave_member(&site)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
    }

    impl Visitor for Recorder {
        fn enter_scope(&mut self, site: &ScopeSite) -> LowerResult<()> {
            self.events.push(format!("enter {:?}", site.kind));
            Ok(())
        }

        fn leave_scope(&mut self, site: &ScopeSite) -> LowerResult<()> {
            self.events.push(format!("leave {:?}", site.kind));
            Ok(())
        }

        fn declare(&mut self, binding: &Binding<'_>) -> LowerResult<()> {
            self.events
                .push(format!("decl {} {:?}", binding.name(), binding.kind));
            Ok(())
        }

        fn reference(&mut self, site: &RefSite<'_>) -> LowerResult<()> {
            self.events
                .push(format!("ref {} {:?}", site.name(), site.access));
            Ok(())
        }
    }

    fn record(source: &str) -> Vec<String> {
        let parsed = esdown_parser::parse_script(source, "walk.js").unwrap();
        let mut recorder = Recorder::default();
        walk_script(&parsed.script, source, parsed.base, &mut recorder).unwrap();
        recorder.events
    }

    #[test]
    fn test_declarations_and_references() {
        let events = record("let [a, {b, c: d}] = f(x); a += 1; d = a;");
        assert_eq!(
            events,
            vec![
                "enter Hoist",
                "decl a Let",
                "decl b Let",
                "decl d Let",
                "ref f Read",
                "ref x Read",
                "ref a ReadWrite",
                "ref d Write",
                "ref a Read",
                "leave Hoist",
            ]
        );
    }

    #[test]
    fn test_member_keys_are_not_references() {
        let events = record("o.p; o[q]; ({k: v});");
        assert_eq!(
            events,
            vec!["enter Hoist", "ref o Read", "ref o Read", "ref q Read", "ref v Read", "leave Hoist"]
        );
    }

    #[test]
    fn test_scopes_opened() {
        let events = record("for (let i = 0;;) { try {} catch (e) {} }");
        assert_eq!(
            events,
            vec![
                "enter Hoist",
                "enter Block",
                "decl i Let",
                "enter Block",
                "enter Block",
                "leave Block",
                "enter Catch",
                "decl e Caught",
                "leave Catch",
                "leave Block",
                "leave Block",
                "leave Hoist",
            ]
        );
    }

    #[test]
    fn test_function_expression_name_declared_last() {
        let events = record("(function g(a) { return a; });");
        assert_eq!(
            events,
            vec![
                "enter Hoist",
                "enter Hoist",
                "decl a Param",
                "ref a Read",
                "decl g Fun",
                "leave Hoist",
                "leave Hoist",
            ]
        );
    }
}
