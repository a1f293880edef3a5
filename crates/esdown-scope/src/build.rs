//! Scope building: the first analysis pass.

use crate::env;
use crate::error::{ErrorKind, LowerResult};
use crate::names::NameRegistry;
use crate::range::TextRange;
use crate::tree::{DeclKind, Declaration, ScopeId, ScopeTree};
use crate::unit::Unit;
use crate::walk::{self, Binding, ClassSite, RefSite, ScopeSite, Visitor};
use swc_ecma_ast::Script;

/// Populate `unit.tree` for `script` and record every binding site.
pub fn build_scopes(unit: &mut Unit, script: &Script) -> LowerResult<()> {
    inject_globals(unit);
    let source = unit.file.source.clone();
    let mut builder = Builder {
        unit,
        stack: Vec::new(),
        class_depth: 0,
    };
    walk::walk_script(script, &source, builder.unit.base, &mut builder)
}

/// Seed the ambient scope: `builtin`, each configured environment, then
/// the explicit globals. Later entries replace earlier ones.
fn inject_globals(unit: &mut Unit) {
    let ambient = unit.tree.ambient();
    let mut presets = vec![env::BUILTIN];
    presets.extend(
        unit.options
            .environments
            .iter()
            .map(String::as_str)
            .filter(|&name| name != env::BUILTIN),
    );
    for name in presets {
        match env::preset(name) {
            Some(globals) => {
                for &(global, writable) in globals {
                    inject(&mut unit.tree, &mut unit.names, ambient, global, writable);
                }
            }
            None => log::warn!("unknown environment {}", name),
        }
    }
    for (global, &writable) in &unit.options.globals {
        inject(&mut unit.tree, &mut unit.names, ambient, global, writable);
    }
}

fn inject(tree: &mut ScopeTree, names: &mut NameRegistry, ambient: ScopeId, name: &str, writable: bool) {
    names.reserve(name);
    tree.override_decl(
        ambient,
        Declaration {
            name: name.to_string(),
            kind: if writable { DeclKind::Var } else { DeclKind::Const },
            scope: ambient,
            range: TextRange::default(),
            visible_from: 0,
            origin: None,
        },
    );
}

struct Builder<'u> {
    unit: &'u mut Unit,
    stack: Vec<ScopeId>,
    class_depth: u32,
}

impl Builder<'_> {
    fn current(&self) -> ScopeId {
        self.stack.last().copied().unwrap_or_else(|| self.unit.tree.ambient())
    }
}

impl Builder<'_> {
    /// In sloppy code a function declared in a block is also visible in
    /// the enclosing function once the block has run.
    fn hoist_block_function(&mut self, current: ScopeId, binding: &Binding<'_>) {
        let tree = &mut self.unit.tree;
        if tree.scope(current).is_hoist() || tree.scope(current).strict {
            return;
        }
        let name = binding.name();
        let hoist = tree.hoist_scope(current);
        let taken = tree
            .ancestors(current)
            .skip(1)
            .take_while(|&s| s != hoist)
            .chain(std::iter::once(hoist))
            .any(|s| tree.scope(s).decls.contains_key(name));
        if taken {
            return;
        }
        tree.declare(
            hoist,
            Declaration {
                name: name.to_string(),
                kind: DeclKind::Fun,
                scope: hoist,
                range: TextRange::empty_at(binding.range.start),
                visible_from: 0,
                origin: None,
            },
        );
    }
}

impl Visitor for Builder<'_> {
    fn enter_scope(&mut self, site: &ScopeSite) -> LowerResult<()> {
        let parent = self.current();
        let parent_strict = self.unit.tree.scope(parent).strict;
        let tree = &mut self.unit.tree;
        let id = tree.add_scope(parent, site.kind, site.owner, site.range);
        let scope = tree.scope_mut(id);
        scope.is_function = site.function;
        scope.is_arrow = site.arrow;
        scope.insert_at = site.insert_at;
        scope.strict = site.strict_directive || parent_strict || self.class_depth > 0;
        if site.function && !site.arrow {
            tree.declare(
                id,
                Declaration {
                    name: "arguments".to_string(),
                    kind: DeclKind::Var,
                    scope: id,
                    range: TextRange::empty_at(site.range.start),
                    visible_from: 0,
                    origin: None,
                },
            );
        }
        self.stack.push(id);
        Ok(())
    }

    fn leave_scope(&mut self, _site: &ScopeSite) -> LowerResult<()> {
        self.stack.pop();
        Ok(())
    }

    fn enter_class(&mut self, _site: &ClassSite<'_>) -> LowerResult<()> {
        self.class_depth += 1;
        Ok(())
    }

    fn leave_class(&mut self, _site: &ClassSite<'_>) -> LowerResult<()> {
        self.class_depth -= 1;
        Ok(())
    }

    fn declare(&mut self, binding: &Binding<'_>) -> LowerResult<()> {
        let name = binding.name();
        self.unit.names.reserve(name);
        let current = self.current();
        let target = match binding.kind {
            DeclKind::Var => {
                if self.unit.options.disallow_vars {
                    return Err(self.unit.error(ErrorKind::DisallowedVar, binding.range, &[name]));
                }
                self.unit.tree.hoist_scope(current)
            }
            DeclKind::Caught => {
                // a later hoisted declaration of this name would capture
                // uses meant for the catch parameter
                let hoist = self.unit.tree.hoist_scope(current);
                self.unit.tree.scope_mut(hoist).propagates.insert(name.to_string());
                current
            }
            _ => current,
        };
        let id = self.unit.tree.declare(
            target,
            Declaration {
                name: name.to_string(),
                kind: binding.kind,
                scope: target,
                range: binding.range,
                visible_from: binding.visible_from,
                origin: binding.origin,
            },
        );
        self.unit.bindings.insert(binding.range, id);
        if binding.kind == DeclKind::Fun {
            self.hoist_block_function(current, binding);
        }
        Ok(())
    }

    fn reference(&mut self, site: &RefSite<'_>) -> LowerResult<()> {
        self.unit.names.reserve(site.name());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzed;
    use crate::options::Options;
    use crate::tree::{ScopeKind, ScopeOwner};

    fn kinds(unit: &Unit) -> Vec<ScopeKind> {
        unit.tree.scope_ids().map(|s| unit.tree.scope(s).kind).collect()
    }

    #[test]
    fn test_scope_kinds() {
        let unit = analyzed(
            "function f() { { } try {} catch (e) {} for (let i of a) {} for (var j in o) {} }",
            Options::default(),
        )
        .unwrap();
        assert_eq!(
            kinds(&unit),
            vec![
                ScopeKind::Hoist, // ambient
                ScopeKind::Hoist, // program
                ScopeKind::Hoist, // f
                ScopeKind::Block, // { }
                ScopeKind::Block, // try block
                ScopeKind::Catch,
                ScopeKind::Block, // let head
                ScopeKind::Block, // for-of body
                ScopeKind::Block, // for-in body
            ]
        );
    }

    #[test]
    fn test_var_hoists_and_let_stays() {
        let source = "function f() { { var a; let b; } }";
        let unit = analyzed(source, Options::default()).unwrap();
        let a = unit.tree.decl(unit.bindings[&TextRange::new(21, 22)]);
        let b = unit.tree.decl(unit.bindings[&TextRange::new(28, 29)]);
        assert_eq!(a.name, "a");
        assert!(matches!(unit.tree.scope(a.scope).owner, ScopeOwner::Function(_)));
        assert_eq!(b.name, "b");
        assert!(matches!(unit.tree.scope(b.scope).owner, ScopeOwner::Block(_)));
        assert_eq!(b.visible_from, 29);
    }

    #[test]
    fn test_destructuring_is_flattened() {
        let unit = analyzed("const {a, b: [c, ...d], e = 1} = o;", Options::default()).unwrap();
        let program = unit.program();
        for name in ["a", "c", "d", "e"] {
            let decl = unit.tree.scope(program).decls[name];
            assert_eq!(unit.tree.decl(decl).kind, DeclKind::Const, "{name}");
        }
        assert!(!unit.tree.scope(program).decls.contains_key("b"));
    }

    #[test]
    fn test_catch_param_taints_hoist_scope() {
        let unit = analyzed("try {} catch (err) {}", Options::default()).unwrap();
        assert!(unit.tree.scope(unit.program()).propagates.contains("err"));
    }

    #[test]
    fn test_globals_override_presets() {
        let mut options = Options::default();
        options.environments = vec!["node".into()];
        options.globals.insert("require".into(), true);
        options.globals.insert("jQuery".into(), false);
        let unit = analyzed("x;", options).unwrap();
        let ambient = unit.tree.ambient();
        let kind = |name: &str| unit.tree.decl(unit.tree.scope(ambient).decls[name]).kind;
        assert_eq!(kind("require"), DeclKind::Var);
        assert_eq!(kind("jQuery"), DeclKind::Const);
        assert_eq!(kind("process"), DeclKind::Const);
        assert_eq!(kind("Array"), DeclKind::Var);
    }

    #[test]
    fn test_disallowed_var() {
        let mut options = Options::default();
        options.disallow_vars = true;
        let err = analyzed("let a; var b;", options).err().unwrap();
        assert_eq!(err.kind, ErrorKind::DisallowedVar);
        assert_eq!(err.message, "var b is not allowed (use let or const)");
    }

    #[test]
    fn test_sloppy_block_function_is_visible_after_the_block() {
        let options = Options {
            disallow_unknown_references: true,
            ..Options::default()
        };
        analyzed("function f() { if (a) { function g() {} } return g; } var a;", options.clone())
            .unwrap();
        let err = analyzed(
            "function f() { 'use strict'; { function g() {} } return g; }",
            options,
        )
        .err()
        .unwrap();
        assert_eq!(err.kind, ErrorKind::UnknownReference);
    }

    #[test]
    fn test_strictness_is_inherited() {
        let source = "function f() { 'use strict'; function g() {} } function h() {}";
        let unit = analyzed(source, Options::default()).unwrap();
        let strict: Vec<bool> = unit
            .tree
            .scope_ids()
            .skip(2)
            .map(|s| unit.tree.scope(s).strict)
            .collect();
        assert_eq!(strict, vec![true, true, false]);
    }

    #[test]
    fn test_insertion_points() {
        let source = "'use strict'\nfunction f() { \"use strict\"; } var g = () => 1;";
        let unit = analyzed(source, Options::default()).unwrap();
        let points: Vec<Option<u32>> = unit
            .tree
            .scope_ids()
            .skip(1)
            .map(|s| unit.tree.scope(s).insert_at)
            .collect();
        let f_directive_end = source.find("\"; }").unwrap() as u32 + 2;
        assert_eq!(points, vec![Some(12), Some(f_directive_end), None]);
    }
}
