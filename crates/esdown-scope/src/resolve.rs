//! Reference resolution and const-write detection.

use crate::error::{ErrorKind, LowerResult};
use crate::range::TextRange;
use crate::tree::{DeclKind, ScopeId};
use crate::unit::{Reference, Unit};
use crate::walk::{self, FunctionNode, RefSite, ScopeSite, Visitor};
use swc_ecma_ast::Script;

/// Resolve every use-site to a declaration (or leave it an unresolved
/// global), checking use-before-declaration along the way.
pub fn resolve_references(unit: &mut Unit, script: &Script) -> LowerResult<()> {
    let source = unit.file.source.clone();
    let base = unit.base;
    let mut resolver = Resolver {
        unit,
        stack: Vec::new(),
        functions: Vec::new(),
    };
    walk::walk_script(script, &source, base, &mut resolver)
}

/// Fail on the first (leftmost) write to a const binding.
pub fn detect_const_writes(unit: &Unit) -> LowerResult<()> {
    let mut writes: Vec<(&TextRange, &Reference)> = unit
        .references
        .iter()
        .filter(|(_, r)| r.access.is_write())
        .filter(|(_, r)| matches!(r.decl, Some(d) if unit.tree.decl(d).kind == DeclKind::Const))
        .collect();
    writes.sort_by_key(|(range, _)| range.start);
    match writes.first() {
        Some((range, reference)) => Err(unit.error(
            ErrorKind::ConstReassignment,
            **range,
            &[reference.name.as_str()],
        )),
        None => Ok(()),
    }
}

struct Resolver<'u> {
    unit: &'u mut Unit,
    stack: Vec<ScopeId>,
    /// Enclosing functions, innermost last: range and whether it is an arrow.
    functions: Vec<(TextRange, bool)>,
}

impl Resolver<'_> {
    fn current(&self) -> ScopeId {
        self.stack.last().copied().unwrap_or_else(|| self.unit.tree.ambient())
    }

    /// Record `name` as used-from-outside in every scope between the use
    /// and the declaring scope.
    fn propagate(&mut self, from: ScopeId, until: Option<ScopeId>, name: &str) {
        let path: Vec<ScopeId> = self
            .unit
            .tree
            .ancestors(from)
            .take_while(|&s| Some(s) != until)
            .collect();
        for scope in path {
            let propagates = &mut self.unit.tree.scope_mut(scope).propagates;
            if !propagates.contains(name) {
                propagates.insert(name.to_string());
            }
        }
    }
}

impl Visitor for Resolver<'_> {
    fn enter_scope(&mut self, site: &ScopeSite) -> LowerResult<()> {
        let id = self.unit.scope_of(site.owner)?;
        self.stack.push(id);
        Ok(())
    }

    fn leave_scope(&mut self, _site: &ScopeSite) -> LowerResult<()> {
        self.stack.pop();
        Ok(())
    }

    fn enter_function(&mut self, node: &FunctionNode<'_>) -> LowerResult<()> {
        self.functions
            .push((node.range(self.unit.base), node.is_arrow()));
        Ok(())
    }

    fn leave_function(&mut self, _node: &FunctionNode<'_>) -> LowerResult<()> {
        self.functions.pop();
        Ok(())
    }

    fn reference(&mut self, site: &RefSite<'_>) -> LowerResult<()> {
        let name = site.name();
        let scope = self.current();
        let decl = self.unit.tree.lookup(scope, name);
        match decl {
            Some(id) => {
                let found = self.unit.tree.decl(id);
                let decl_scope = found.scope;
                // a closure may run after the declaration executes
                if found.kind.is_block_scoped()
                    && site.range.start < found.visible_from
                    && !self.unit.tree.crosses_function(scope, decl_scope)
                {
                    return Err(self.unit.error(
                        ErrorKind::UseBeforeDeclaration,
                        site.range,
                        &[name],
                    ));
                }
                self.propagate(scope, Some(decl_scope), name);
            }
            None => {
                if self.unit.options.disallow_unknown_references {
                    return Err(self.unit.error(
                        ErrorKind::UnknownReference,
                        site.range,
                        &[name],
                    ));
                }
                self.propagate(scope, None, name);
            }
        }
        self.unit.references.insert(
            site.range,
            Reference {
                name: name.to_string(),
                scope,
                decl,
                access: site.access,
            },
        );
        Ok(())
    }

    fn receiver(&mut self, _range: TextRange) -> LowerResult<()> {
        for &(range, arrow) in self.functions.iter().rev() {
            if !arrow {
                break;
            }
            self.unit.bound_receivers.insert(range);
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

    fn fails(source: &str) -> LowerError {
        analyzed(source, Options::default()).err().unwrap()
    }

    fn decl_at(unit: &Unit, source: &str, needle: &str, nth: usize) -> Option<crate::tree::DeclId> {
        let start = source.match_indices(needle).nth(nth).unwrap().0 as u32;
        let range = TextRange::new(start, start + needle.len() as u32);
        unit.reference(range).unwrap().decl
    }

    #[test]
    fn test_let_self_reference_is_rejected() {
        let err = fails("let x = x;");
        assert_eq!(err.kind, ErrorKind::UseBeforeDeclaration);
        assert_eq!(err.range, TextRange::new(8, 9));
        assert_eq!(err.message, "x is referenced before its declaration");
    }

    #[test]
    fn test_closure_may_see_later_declaration() {
        analyzed("function f(){ return x; } let x = 1; f();", Options::default()).unwrap();
        analyzed("let g = () => y; const y = 2;", Options::default()).unwrap();
    }

    #[test]
    fn test_statement_order_within_a_block() {
        assert_eq!(fails("{ y; let y; }").kind, ErrorKind::UseBeforeDeclaration);
        assert_eq!(fails("{ { z; } let z; }").kind, ErrorKind::UseBeforeDeclaration);
        assert_eq!(fails("new C(); class C {}").kind, ErrorKind::UseBeforeDeclaration);
        // var has no temporal restriction
        analyzed("w; var w;", Options::default()).unwrap();
    }

    #[test]
    fn test_inner_binding_shadows_outer() {
        let source = "function f(){ let x=1; { let x=2; return x; } }";
        let unit = analyzed(source, Options::default()).unwrap();
        let inner = decl_at(&unit, source, "x", 2).unwrap();
        assert_eq!(unit.tree.decl(inner).range.start, source.find("x=2").unwrap() as u32);
    }

    #[test]
    fn test_unknown_references() {
        let unit = analyzed("missing();", Options::default()).unwrap();
        let source = "missing();";
        assert_eq!(decl_at(&unit, source, "missing", 0), None);
        assert!(unit.tree.scope(unit.program()).propagates.contains("missing"));

        let options = Options {
            disallow_unknown_references: true,
            ..Options::default()
        };
        let err = analyzed("Math.max(1); missing();", options.clone()).err().unwrap();
        assert_eq!(err.kind, ErrorKind::UnknownReference);
        assert_eq!(err.message, "reference to unknown global variable missing");

        let options = Options {
            globals: [("missing".to_string(), false)].into_iter().collect(),
            ..options
        };
        analyzed("missing();", options).unwrap();
    }

    #[test]
    fn test_const_writes() {
        let err = fails("const c = 1; c = 2;");
        assert_eq!(err.kind, ErrorKind::ConstReassignment);
        assert_eq!(fails("const c = 1; c++;").kind, ErrorKind::ConstReassignment);
        assert_eq!(fails("const c = 1; [c] = [2];").kind, ErrorKind::ConstReassignment);
        assert_eq!(fails("for (const k in o) { k += 1; }").kind, ErrorKind::ConstReassignment);
        assert_eq!(fails("undefined = 1;").kind, ErrorKind::ConstReassignment);
        analyzed("const c = {}; c.x = 2;", Options::default()).unwrap();
        analyzed("const c = 1; { let c; c = 2; }", Options::default()).unwrap();
    }

    #[test]
    fn test_propagated_names() {
        let source = "var a; function f() { { a; } }";
        let unit = analyzed(source, Options::default()).unwrap();
        let with_a: Vec<bool> = unit
            .tree
            .scope_ids()
            .map(|s| unit.tree.scope(s).propagates.contains("a"))
            .collect();
        // ambient, program, f, block
        assert_eq!(with_a, vec![false, false, true, true]);
    }

    #[test]
    fn test_receiver_marks_arrow_chain() {
        let source = "function f() { return () => () => this; } var g = () => function () { return () => 1; };";
        let unit = analyzed(source, Options::default()).unwrap();
        let outer = source.find("() => () =>").unwrap() as u32;
        let inner = source.find("() => this").unwrap() as u32;
        let mut marked: Vec<u32> = unit.bound_receivers.iter().map(|r| r.start).collect();
        marked.sort();
        assert_eq!(marked, vec![outer, inner]);
    }

    #[test]
    fn test_arguments_resolves_to_enclosing_function() {
        let source = "function f() { return () => arguments; }";
        let unit = analyzed(source, Options::default()).unwrap();
        let decl = decl_at(&unit, source, "arguments", 0).unwrap();
        assert!(unit.tree.scope(unit.tree.decl(decl).scope).is_function);
        assert!(!unit.tree.scope(unit.tree.decl(decl).scope).is_arrow);
    }
}
