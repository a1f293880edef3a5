//! Shared helper declarations and scope temporaries.
//!
//! A helper (for instance `var DP$0 = Object.defineProperty;`) is declared
//! once, in the hoisting scope that is the lowest common ancestor of all
//! scopes that asked for it. When a request arrives from outside the
//! current installation's view, the helper is rebased: its insertion edit
//! is cancelled and a new one is made higher up. The name never changes,
//! so text already generated with it stays valid.

use crate::edits::EditId;
use crate::error::LowerResult;
use crate::range::TextRange;
use crate::tree::ScopeId;
use crate::unit::Unit;
use std::collections::HashMap;

/// How a helper is initialised.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HelperInit {
    /// `var NAME = EXPR;`
    Value(String),
    /// `function NAME(PARAMS){BODY}`; holds the text after the name.
    Function(String),
}

impl HelperInit {
    fn declaration(&self, name: &str) -> String {
        match self {
            HelperInit::Value(init) => format!("var {} = {};", name, init),
            HelperInit::Function(rest) => format!("function {}{}", name, rest),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HelperState {
    Uninstalled,
    InstalledAt { scope: ScopeId, edit: EditId },
    /// The old edit is cancelled and a new site is being chosen.
    Rebasing { from: ScopeId },
}

#[derive(Debug, Clone)]
pub struct BubbledVariable {
    pub name: String,
    /// Insertion scopes of every request so far
    pub requesters: Vec<ScopeId>,
    pub state: HelperState,
}

/// Live helpers, keyed by `(logical name, initializer)`.
#[derive(Debug, Clone, Default)]
pub struct Helpers {
    table: HashMap<(String, HelperInit), BubbledVariable>,
}

impl Helpers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, logical: &str, init: &HelperInit) -> Option<&BubbledVariable> {
        self.table.get(&(logical.to_string(), init.clone()))
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn clear(&mut self) {
        self.table.clear();
    }
}

/// Name of the helper `logical` = `init`, making sure its declaration is
/// visible from `scope`.
pub fn bubbled_variable_declaration(
    unit: &mut Unit,
    scope: ScopeId,
    logical: &str,
    init: HelperInit,
) -> LowerResult<String> {
    let target = unit.tree.insertion_scope(scope);
    let key = (logical.to_string(), init);
    if !unit.helpers.table.contains_key(&key) {
        let name = unit.names.unique(logical, true);
        log::debug!("new helper {}", name);
        unit.helpers.table.insert(
            key.clone(),
            BubbledVariable {
                name,
                requesters: Vec::new(),
                state: HelperState::Uninstalled,
            },
        );
    }

    let (name, state, requesters) = match unit.helpers.table.get_mut(&key) {
        Some(helper) => {
            helper.requesters.push(target);
            (helper.name.clone(), helper.state, helper.requesters.clone())
        }
        None => return Err(unit.assertion(TextRange::default(), "helper table lost an entry")),
    };

    match state {
        HelperState::Uninstalled => install(unit, &key, &name, target)?,
        HelperState::InstalledAt { scope: at, .. } if unit.tree.is_ancestor_or_self(at, target) => {}
        HelperState::InstalledAt { scope: at, edit } => {
            set_state(unit, &key, HelperState::Rebasing { from: at });
            unit.edits.cancel(edit);
            let common = requesters
                .iter()
                .fold(at, |acc, &s| unit.tree.lca(acc, s));
            let common = unit.tree.insertion_scope(common);
            log::debug!("rebasing helper {} from {:?} to {:?}", name, at, common);
            install(unit, &key, &name, common)?;
        }
        HelperState::Rebasing { .. } => {
            return Err(unit.assertion(
                TextRange::default(),
                &format!("helper {} requested while rebasing", name),
            ))
        }
    }
    Ok(name)
}

fn install(unit: &mut Unit, key: &(String, HelperInit), name: &str, scope: ScopeId) -> LowerResult<()> {
    let at = unit
        .tree
        .scope(scope)
        .insert_at
        .ok_or_else(|| unit.assertion(TextRange::default(), "no insertion point for helper"))?;
    let edit = unit.edits.insert_after(at, key.1.declaration(name));
    set_state(unit, key, HelperState::InstalledAt { scope, edit });
    Ok(())
}

fn set_state(unit: &mut Unit, key: &(String, HelperInit), state: HelperState) {
    if let Some(helper) = unit.helpers.table.get_mut(key) {
        helper.state = state;
    }
}

/// A temporary declared in the hoisting scope of `scope`: a released one
/// if available, otherwise a fresh `$D$n` declared at the insertion point.
pub fn get_scope_temp_var(unit: &mut Unit, scope: ScopeId) -> LowerResult<String> {
    let hoist = unit.tree.insertion_scope(scope);
    if let Some(name) = unit.tree.scope_mut(hoist).temps.pop() {
        return Ok(name);
    }
    let at = unit
        .tree
        .scope(hoist)
        .insert_at
        .ok_or_else(|| unit.assertion(TextRange::default(), "no insertion point for temporary"))?;
    let name = unit.names.unique("$D", true);
    unit.edits.insert_after(at, format!("var {};", name));
    Ok(name)
}

/// Give a temporary back for reuse within the same hoisting scope.
pub fn set_scope_temp_var(unit: &mut Unit, scope: ScopeId, name: String) {
    let hoist = unit.tree.insertion_scope(scope);
    unit.tree.scope_mut(hoist).temps.push(name);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzed;
    use crate::options::Options;
    use crate::tree::ScopeOwner;

    /// Innermost function scope around the end of `header`.
    fn function_scope(unit: &Unit, source: &str, header: &str) -> ScopeId {
        let at = (source.find(header).unwrap() + header.len()) as u32;
        unit.tree
            .scope_ids()
            .filter(|&s| matches!(unit.tree.scope(s).owner, ScopeOwner::Function(r) if r.contains_offset(at)))
            .max_by_key(|&s| unit.tree.scope(s).depth)
            .unwrap()
    }

    fn active_texts(unit: &Unit) -> Vec<(u32, String)> {
        unit.edits.active().map(|e| (e.start, e.text.clone())).collect()
    }

    #[test]
    fn test_helper_rebases_to_common_ancestor() {
        let source = "function f() { function g() {} } function h() {}";
        let mut unit = analyzed(source, Options::default()).unwrap();
        let (f, g, h) = (
            function_scope(&unit, source, "function f"),
            function_scope(&unit, source, "function g"),
            function_scope(&unit, source, "function h"),
        );
        let init = HelperInit::Value("1".into());
        let g_body = unit.tree.scope(g).insert_at.unwrap();
        let f_body = unit.tree.scope(f).insert_at.unwrap();

        let name = unit.bubbled_variable_declaration(g, "H", init.clone()).unwrap();
        assert_eq!(name, "H$0");
        assert_eq!(active_texts(&unit), vec![(g_body, "var H$0 = 1;".to_string())]);

        // a request from the enclosing function moves it up
        let again = unit.bubbled_variable_declaration(f, "H", init.clone()).unwrap();
        assert_eq!(again, name);
        assert_eq!(active_texts(&unit), vec![(f_body, "var H$0 = 1;".to_string())]);

        // already visible from g, nothing changes
        unit.bubbled_variable_declaration(g, "H", init.clone()).unwrap();
        assert_eq!(unit.edits.len(), 1);

        unit.bubbled_variable_declaration(h, "H", init.clone()).unwrap();
        assert_eq!(active_texts(&unit), vec![(0, "var H$0 = 1;".to_string())]);
        assert!(matches!(
            unit.helpers.get("H", &init).unwrap().state,
            HelperState::InstalledAt { scope, .. } if scope == unit.program()
        ));
    }

    #[test]
    fn test_distinct_initializers_are_distinct_helpers() {
        let mut unit = analyzed("x;", Options::default()).unwrap();
        let program = unit.program();
        let a = unit
            .bubbled_variable_declaration(program, "H", HelperInit::Value("1".into()))
            .unwrap();
        let b = unit
            .bubbled_variable_declaration(program, "H", HelperInit::Function("(){}".into()))
            .unwrap();
        assert_ne!(a, b);
        assert_eq!(unit.helpers.len(), 2);
        let texts: Vec<String> = unit.edits.active().map(|e| e.text.clone()).collect();
        assert_eq!(texts, vec!["var H$0 = 1;", "function H$1(){}"]);
    }

    #[test]
    fn test_helper_goes_after_directives() {
        let source = "'use strict'; f();";
        let mut unit = analyzed(source, Options::default()).unwrap();
        let program = unit.program();
        unit.bubbled_variable_declaration(program, "H", HelperInit::Value("0".into()))
            .unwrap();
        assert_eq!(active_texts(&unit)[0].0, 13);
    }

    #[test]
    fn test_temp_vars_are_reused() {
        let source = "function f() { a; }";
        let mut unit = analyzed(source, Options::default()).unwrap();
        let f = function_scope(&unit, source, "function f");
        let first = unit.get_scope_temp_var(f).unwrap();
        let second = unit.get_scope_temp_var(f).unwrap();
        assert_ne!(first, second);
        unit.set_scope_temp_var(f, first.clone());
        assert_eq!(unit.get_scope_temp_var(f).unwrap(), first);
        // two declarations, no more
        assert_eq!(unit.edits.len(), 2);
    }
}
