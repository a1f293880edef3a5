//! Block-binding lowering: `let`/`const` become `var`, renamed where the
//! hoisted name would collide.

use crate::lower::Lowerer;
use esdown_scope::walk::{Binding, DeclSite, RefSite};
use esdown_scope::{DeclId, DeclKind, LowerResult, ScopeId, ScopeOwner, TextRange, Unit};
use std::collections::{HashMap, HashSet};
use swc_common::Spanned;
use swc_ecma_ast::{Pat, VarDecl, VarDeclKind};

/// Decide the output name of every block-scoped declaration that does not
/// live directly in a hoisting scope.
///
/// Scopes are visited in source pre-order, so outer bindings keep their
/// names and inner ones are renamed. A name is taken in a hoisting scope if
/// the scope declares it, uses it from further out, or an earlier hoisted
/// block binding claimed it.
pub(crate) fn plan_renames(unit: &mut Unit) -> HashMap<DeclId, String> {
    let mut renames = HashMap::new();
    let mut claimed: HashMap<ScopeId, HashSet<String>> = HashMap::new();
    let program = unit.program();
    let ambient = unit.tree.ambient();
    let scopes: Vec<ScopeId> = unit.tree.scope_ids().collect();

    for scope in scopes {
        let s = unit.tree.scope(scope);
        if s.is_hoist() || matches!(s.owner, ScopeOwner::Class(_)) {
            continue;
        }
        let mut decls: Vec<DeclId> = s
            .decls
            .values()
            .copied()
            .filter(|&d| unit.tree.decl(d).kind.is_block_scoped())
            .collect();
        decls.sort_by_key(|&d| unit.tree.decl(d).range.start);
        let hoist = unit.tree.hoist_scope(scope);

        for id in decls {
            let name = unit.tree.decl(id).name.clone();
            let h = unit.tree.scope(hoist);
            let taken = h.decls.contains_key(&name)
                || h.propagates.contains(&name)
                || (hoist == program && unit.tree.scope(ambient).decls.contains_key(&name))
                || claimed.get(&hoist).is_some_and(|c| c.contains(&name));
            let final_name = if taken {
                let fresh = unit.unique(&name, true);
                log::debug!("renaming block binding {} to {}", name, fresh);
                renames.insert(id, fresh.clone());
                fresh
            } else {
                name
            };
            claimed.entry(hoist).or_default().insert(final_name);
        }
    }
    renames
}

impl Lowerer<'_> {
    pub(crate) fn rename_binding(&mut self, binding: &Binding<'_>) {
        let Some(name) = self
            .unit
            .bindings
            .get(&binding.range)
            .and_then(|id| self.renames.get(id))
            .cloned()
        else {
            return;
        };
        let text = if binding.shorthand {
            format!("{}: {}", binding.name(), name)
        } else {
            name
        };
        self.unit.edits.replace(binding.range, text);
    }

    pub(crate) fn rename_reference(&mut self, site: &RefSite<'_>) {
        let Some(name) = self
            .unit
            .reference(site.range)
            .and_then(|r| r.decl)
            .and_then(|id| self.renames.get(&id))
            .cloned()
        else {
            return;
        };
        let text = if site.shorthand {
            format!("{}: {}", site.name(), name)
        } else {
            name
        };
        self.unit.edits.replace(site.range, text);
    }

    /// The function whose implicit `arguments` a use at `range` reads
    /// through an arrow function.
    fn arguments_owner(&self, range: TextRange) -> Option<ScopeId> {
        let reference = self.unit.reference(range)?;
        if reference.name != "arguments" {
            return None;
        }
        let tree = &self.unit.tree;
        let decl = tree.decl(reference.decl?);
        let implicit = decl.kind == DeclKind::Var && decl.range.is_empty();
        if !implicit || !tree.scope(decl.scope).is_function {
            return None;
        }
        (tree.function_scope(reference.scope) != Some(decl.scope)).then_some(decl.scope)
    }

    pub(crate) fn arguments_alias_for(&self, range: TextRange) -> Option<String> {
        let owner = self.arguments_owner(range)?;
        self.arguments_aliases.get(&owner).cloned()
    }

    /// Point `arguments` inside an arrow at an alias declared in the
    /// enclosing function. Returns whether the use was rewritten.
    pub(crate) fn alias_arguments(&mut self, site: &RefSite<'_>) -> LowerResult<bool> {
        let Some(owner) = self.arguments_owner(site.range) else {
            return Ok(false);
        };
        let alias = match self.arguments_aliases.get(&owner) {
            Some(alias) => alias.clone(),
            None => {
                let at = self
                    .unit
                    .tree
                    .scope(owner)
                    .insert_at
                    .ok_or_else(|| self.unit.assertion(site.range, "function without a body"))?;
                let alias = self.unit.unique("arguments", true);
                self.unit
                    .edits
                    .insert_after(at, format!("var {} = arguments;", alias));
                self.arguments_aliases.insert(owner, alias.clone());
                alias
            }
        };
        let text = if site.shorthand {
            format!("arguments: {}", alias)
        } else {
            alias
        };
        self.unit.edits.replace(site.range, text);
        Ok(true)
    }

    pub(crate) fn lower_var_decl(&mut self, decl: &VarDecl, site: DeclSite) -> LowerResult<()> {
        let range = self.range(decl.span);
        let keyword = match decl.kind {
            VarDeclKind::Var => None,
            VarDeclKind::Let => Some("let"),
            VarDeclKind::Const => Some("const"),
        };
        if let Some(keyword) = keyword {
            let at = TextRange::new(range.start, range.start + keyword.len() as u32);
            if self.unit.slice(at) != keyword {
                return Err(self.unit.assertion(at, "declaration does not start with its keyword"));
            }
            self.unit.edits.replace(at, "var");
        }

        // a loop body re-enters the declaration on every iteration
        let reinitialize = site == DeclSite::Statement
            && decl.kind == VarDeclKind::Let
            && self.loops.last() == Some(&self.function_depth);

        for declarator in &decl.decls {
            match &declarator.name {
                Pat::Ident(_) => {
                    if reinitialize && declarator.init.is_none() {
                        let end = self.range(declarator.span).end;
                        self.unit.edits.insert_after(end, " = void 0");
                    }
                }
                pattern if site == DeclSite::ForHead => {
                    log::warn!(
                        "destructuring in a for-in/of head is left as is (line {})",
                        self.unit.file.line_of(self.range(pattern.span()).start)
                    );
                }
                _ => self.lower_declarator_pattern(declarator)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::tests::lower;

    #[test]
    fn test_let_and_const_become_var() {
        assert_eq!(lower("let a = 1; const b = a;"), "var a = 1; var b = a;");
    }

    #[test]
    fn test_shadowing_block_binding_is_renamed() {
        assert_eq!(
            lower("function f(){ let x=1; { let x=2; return x; } }"),
            "function f(){ var x=1; { var x$0=2; return x$0; } }"
        );
    }

    #[test]
    fn test_sibling_blocks() {
        assert_eq!(
            lower("{ let a = 1; use(a); } { let a = 2; use(a); }"),
            "{ var a = 1; use(a); } { var a$0 = 2; use(a$0); }"
        );
    }

    #[test]
    fn test_outer_use_forces_rename() {
        assert_eq!(
            lower("function f(){ { let v = 1; } return v; }"),
            "function f(){ { var v$0 = 1; } return v; }"
        );
    }

    #[test]
    fn test_catch_parameter_is_protected() {
        assert_eq!(
            lower("try {} catch (e) { let e2 = e; { let e = 1; } }"),
            "try {} catch (e) { var e2 = e; { var e$0 = 1; } }"
        );
    }

    #[test]
    fn test_shorthand_property_keeps_its_key() {
        assert_eq!(
            lower("var x; { let x = 1; f({x}); }"),
            "var x; { var x$0 = 1; f({x: x$0}); }"
        );
    }

    #[test]
    fn test_let_in_loop_is_reinitialized() {
        assert_eq!(
            lower("for (;;) { let a; const b = 1; }"),
            "for (;;) { var a = void 0; var b = 1; }"
        );
        assert_eq!(lower("let a;"), "var a;");
        assert_eq!(
            lower("while (x) { (function(){ let a; }); }"),
            "while (x) { (function(){ var a; }); }"
        );
    }

    #[test]
    fn test_loop_head_binding() {
        assert_eq!(
            lower("var i; for (let i = 0; i < 2; i++) { use(i); }"),
            "var i; for (var i$0 = 0; i$0 < 2; i$0++) { use(i$0); }"
        );
    }

    #[test]
    fn test_global_names_are_not_clobbered() {
        assert_eq!(lower("{ let Object = 1; }"), "{ var Object$0 = 1; }");
    }

    #[test]
    fn test_arguments_in_arrow() {
        assert_eq!(
            lower("function f() { return () => arguments[0]; }"),
            "function f() {var arguments$0 = arguments; return function() { return arguments$0[0]}; }"
        );
    }
}
