//! Closure-in-loop capture check.
//!
//! Once `let` becomes `var`, every iteration of a loop shares one storage
//! cell per binding. That is only observable when a closure created inside
//! the loop captures a binding declared inside the same loop, so those
//! captures are rejected unless a function between the binding and the
//! loop already gives each iteration its own copy.

use crate::error::{ErrorKind, LowerResult};
use crate::range::TextRange;
use crate::tree::{ScopeId, ScopeOwner};
use crate::unit::Unit;
use crate::walk::{self, ClassSite, RefSite, ScopeSite, Visitor};
use swc_ecma_ast::Script;

pub fn check_loop_closures(unit: &Unit, script: &Script) -> LowerResult<()> {
    let mut checker = LoopChecker {
        unit,
        scopes: Vec::new(),
        loops: Vec::new(),
        class_decls: Vec::new(),
    };
    walk::walk_script(script, unit.source(), unit.base, &mut checker)
}

struct LoopChecker<'u> {
    unit: &'u Unit,
    scopes: Vec<ScopeId>,
    /// Loops enclosing the current position, outermost first
    loops: Vec<TextRange>,
    /// Class declarations enclosing the current position
    class_decls: Vec<TextRange>,
}

impl LoopChecker<'_> {
    /// Whether a function scope lies between `decl_scope` and the edge of
    /// `lp`.
    fn isolated(&self, decl_scope: ScopeId, lp: TextRange) -> bool {
        let tree = &self.unit.tree;
        tree.ancestors(decl_scope)
            .take_while(|&s| lp.contains(tree.scope(s).range))
            .any(|s| tree.scope(s).is_function)
    }
}

impl Visitor for LoopChecker<'_> {
    fn enter_scope(&mut self, site: &ScopeSite) -> LowerResult<()> {
        self.scopes.push(self.unit.scope_of(site.owner)?);
        Ok(())
    }

    fn leave_scope(&mut self, _site: &ScopeSite) -> LowerResult<()> {
        self.scopes.pop();
        Ok(())
    }

    fn enter_loop(&mut self, range: TextRange) -> LowerResult<()> {
        self.loops.push(range);
        Ok(())
    }

    fn leave_loop(&mut self, _range: TextRange) -> LowerResult<()> {
        self.loops.pop();
        Ok(())
    }

    fn enter_class(&mut self, site: &ClassSite<'_>) -> LowerResult<()> {
        if site.is_decl {
            self.class_decls.push(site.range);
        }
        Ok(())
    }

    fn leave_class(&mut self, site: &ClassSite<'_>) -> LowerResult<()> {
        if site.is_decl {
            self.class_decls.pop();
        }
        Ok(())
    }

    fn reference(&mut self, site: &RefSite<'_>) -> LowerResult<()> {
        if self.loops.is_empty() {
            return Ok(());
        }
        let Some(decl) = self.unit.reference(site.range).and_then(|r| r.decl) else {
            return Ok(());
        };
        let tree = &self.unit.tree;
        let decl = tree.decl(decl);
        if !decl.kind.is_block_scoped() {
            return Ok(());
        }
        // the class wrapper function rebinds a class expression's own name
        if matches!(tree.scope(decl.scope).owner, ScopeOwner::Class(_)) {
            return Ok(());
        }
        // and a class declaration's name inside its own body
        if decl
            .origin
            .is_some_and(|origin| self.class_decls.contains(&origin))
        {
            return Ok(());
        }
        let Some(&scope) = self.scopes.last() else {
            return Ok(());
        };
        if !tree.crosses_function(scope, decl.scope) {
            return Ok(());
        }
        let decl_range = tree.scope(decl.scope).range;
        for &lp in &self.loops {
            if lp.contains(decl_range) && !self.isolated(decl.scope, lp) {
                return Err(self.unit.error(
                    ErrorKind::UnsupportedLoopClosure,
                    site.range,
                    &[site.name()],
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzed;
    use crate::error::LowerError;
    use crate::options::Options;

    fn check(source: &str) -> Result<(), LowerError> {
        let parsed = esdown_parser::parse_script(source, "loops.js").unwrap();
        let unit = analyzed(source, Options::default())?;
        check_loop_closures(&unit, &parsed.script)
    }

    #[test]
    fn test_capture_of_loop_binding_is_rejected() {
        let err = check("for (let i=0;i<3;i++){ later(function(){ use(i); }); }")
            .err()
            .unwrap();
        assert_eq!(err.kind, ErrorKind::UnsupportedLoopClosure);
        assert_eq!(
            err.message,
            "can't transform closure. i is defined outside closure, inside loop"
        );
    }

    #[test]
    fn test_function_local_capture_is_accepted() {
        check("for (let i=0;i<3;i++){ (function(i){ later(function(){ use(i); }); })(i); }").unwrap();
    }

    #[test]
    fn test_binding_in_loop_body() {
        let err = check("while (more()) { const v = next(); later(() => v); }")
            .err()
            .unwrap();
        assert_eq!(err.kind, ErrorKind::UnsupportedLoopClosure);
        check("for (let i of xs) { (function(i){ let v = i; later(() => v); })(i); }").unwrap();
    }

    #[test]
    fn test_class_declaration_names_itself_in_a_loop() {
        check("for (let i = 0; i < 2; i++) { class K { static me(){ return K; } } made.push(K); }")
            .unwrap();
        let err = check("for (let i = 0; i < 2; i++) { class K { me(){ return i; } } made.push(K); }")
            .err()
            .unwrap();
        assert_eq!(err.kind, ErrorKind::UnsupportedLoopClosure);
    }

    #[test]
    fn test_bindings_outside_the_loop_are_fine() {
        check("let n = 0; for (var i = 0; i < 3; i++) { later(function(){ use(n, i); }); }").unwrap();
        check("for (let i=0;i<3;i++){ use(i); }").unwrap();
    }

    #[test]
    fn test_nested_loops() {
        let err = check("for (let i of a) { for (let j of b) { later(() => i + j); } }")
            .err()
            .unwrap();
        assert_eq!(err.range.start, 50);
    }
}
