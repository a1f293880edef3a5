//! Parameter lowering.
//!
//! Parameters up to the first default or rest slot stay in the list
//! (destructured ones become a fresh name expanded in the prologue). From
//! that slot on, every parameter is removed from the list and read from
//! `arguments` in the prologue, which keeps the function's `length`.
//! Setters are the exception: they need exactly one formal parameter, so
//! theirs stays and only the default moves into the body.

use crate::destructuring::{bound_idents, Expansion, Form};
use crate::lower::Lowerer;
use esdown_scope::text;
use esdown_scope::walk::{FunctionNode, ParamSlot};
use esdown_scope::{DeclId, ErrorKind, LowerResult, ScopeOwner, TextRange};
use std::collections::HashSet;
use swc_common::Spanned;
use swc_ecma_ast::{AssignPat, Pat};

impl Lowerer<'_> {
    /// Rewrite the parameter list of `node` and return the prologue that
    /// must run first in its body.
    pub(crate) fn lower_params(&mut self, node: &FunctionNode<'_>) -> LowerResult<String> {
        let slots = node.params(self.unit.base);
        if let (FunctionNode::Setter(_), Some(slot)) = (node, slots.first()) {
            if let Pat::Assign(assign) = slot.pat {
                return self.setter_default(node, slot, assign);
            }
        }
        let first_removed = slots
            .iter()
            .position(|s| matches!(s.pat, Pat::Assign(_) | Pat::Rest(_)))
            .unwrap_or(slots.len());
        let mut prologue = String::new();

        for slot in &slots[..first_removed] {
            if matches!(slot.pat, Pat::Ident(_)) {
                continue;
            }
            let temp = self.unit.unique("$D", true);
            let mut exp = Expansion::new(Form::Declare);
            self.expand_pattern(slot.pat, temp.clone(), &mut exp)?;
            self.supersede(slot.range, temp)?;
            prologue.push_str(&exp.statement());
        }

        if first_removed == slots.len() {
            return Ok(prologue);
        }
        for (i, slot) in slots.iter().enumerate().skip(first_removed) {
            prologue.push_str(&self.removed_param(node, slot, i)?);
        }
        let start = match first_removed {
            0 => slots[0].range.start,
            k => slots[k - 1].range.end,
        };
        let end = slots[slots.len() - 1].range.end;
        let end = text::next_is(self.unit.source(), end as usize, ',').map_or(end, |c| c as u32 + 1);
        self.supersede(TextRange::new(start, end), "")?;
        log::debug!(
            "lowered {} parameter(s) at {}",
            slots.len() - first_removed,
            slots[first_removed].range.start
        );
        Ok(prologue)
    }

    /// Prologue statements reading parameter `index` from `arguments`.
    fn removed_param(&mut self, node: &FunctionNode<'_>, slot: &ParamSlot<'_>, index: usize) -> LowerResult<String> {
        let arg = format!("arguments[{}]", index);
        let mut exp = Expansion::new(Form::Declare);
        match slot.pat {
            Pat::Rest(rest) => {
                let tail = format!("[].slice.call(arguments, {})", index);
                self.expand_pattern(&rest.arg, tail, &mut exp)?;
            }
            Pat::Assign(assign) => {
                self.check_self_reference(node, assign)?;
                let default = self.render(self.range(assign.right.span()))?;
                let (target, pattern) = match &*assign.left {
                    Pat::Ident(b) => (self.binding_name(&b.id), None),
                    left => (self.unit.unique("$D", true), Some(left)),
                };
                let mut out = format!(
                    "var {0} = {1}; if ({0} === void 0) {0} = {2};",
                    target, arg, default
                );
                if let Some(pattern) = pattern {
                    self.expand_pattern(pattern, target, &mut exp)?;
                    out.push_str(&exp.statement());
                }
                return Ok(out);
            }
            pat => self.expand_pattern(pat, arg, &mut exp)?,
        }
        Ok(exp.statement())
    }

    fn setter_default(&mut self, node: &FunctionNode<'_>, slot: &ParamSlot<'_>, assign: &AssignPat) -> LowerResult<String> {
        self.check_self_reference(node, assign)?;
        let default = self.render(self.range(assign.right.span()))?;
        let (target, pattern) = match &*assign.left {
            Pat::Ident(b) => (self.binding_name(&b.id), None),
            left => (self.unit.unique("$D", true), Some(left)),
        };
        self.supersede(slot.range, target.clone())?;
        let mut out = format!("if ({0} === void 0) {0} = {1};", target, default);
        if let Some(pattern) = pattern {
            let mut exp = Expansion::new(Form::Declare);
            self.expand_pattern(pattern, target, &mut exp)?;
            out.push_str(&exp.statement());
        }
        Ok(out)
    }

    /// Reject a default value that reads a binding of its own parameter.
    fn check_self_reference(&self, node: &FunctionNode<'_>, assign: &AssignPat) -> LowerResult<()> {
        let function = self
            .unit
            .scope_of(ScopeOwner::Function(node.range(self.unit.base)))?;
        let mut idents = Vec::new();
        bound_idents(&assign.left, &mut idents);
        let own: HashSet<DeclId> = idents
            .iter()
            .filter_map(|i| self.unit.bindings.get(&self.range(i.span)).copied())
            .collect();

        let default = self.range(assign.right.span());
        let tree = &self.unit.tree;
        let hit = self
            .unit
            .references
            .iter()
            .filter(|(range, reference)| {
                default.contains(**range)
                    && reference.decl.is_some_and(|d| own.contains(&d))
                    && !tree.crosses_function(reference.scope, function)
            })
            .min_by_key(|(range, _)| range.start);
        match hit {
            Some((range, reference)) => Err(self.unit.error(
                ErrorKind::SelfReferentialDefault,
                *range,
                &[reference.name.as_str()],
            )),
            None => Ok(()),
        }
    }

    /// Put `prologue` at the start of the body of `node`.
    pub(crate) fn insert_prologue(&mut self, node: &FunctionNode<'_>, prologue: &str) -> LowerResult<()> {
        let range = node.range(self.unit.base);
        let scope = self.unit.scope_of(ScopeOwner::Function(range))?;
        let at = self
            .unit
            .tree
            .scope(scope)
            .insert_at
            .ok_or_else(|| self.unit.assertion(range, "parameters on a function without a body"))?;
        self.unit.edits.insert_after(at, prologue.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::tests::{lower, lower_err};
    use esdown_scope::ErrorKind;

    #[test]
    fn test_default_and_rest() {
        assert_eq!(
            lower("function f(a, b = 2, ...rest){ return [a,b,rest]; }"),
            "function f(a){var b = arguments[1]; if (b === void 0) b = 2;var rest = [].slice.call(arguments, 2); return [a,b,rest]; }"
        );
    }

    #[test]
    fn test_parameters_after_a_default() {
        assert_eq!(
            lower("function f(a = 1, b){}"),
            "function f(){var a = arguments[0]; if (a === void 0) a = 1;var b = arguments[1];}"
        );
    }

    #[test]
    fn test_destructured_parameter() {
        assert_eq!(
            lower("function f([a, b], c){ return a + b + c; }"),
            "function f($D$0, c){var a = $D$0[0], b = $D$0[1]; return a + b + c; }"
        );
    }

    #[test]
    fn test_defaulted_pattern() {
        assert_eq!(
            lower("function f({x} = {}){ return x; }"),
            "function f(){var $D$0 = arguments[0]; if ($D$0 === void 0) $D$0 = {};var x = $D$0.x; return x; }"
        );
    }

    #[test]
    fn test_prologue_follows_directives() {
        assert_eq!(
            lower("function f(...r){ 'use strict'; return r; }"),
            "function f(){ 'use strict';var r = [].slice.call(arguments, 0); return r; }"
        );
    }

    #[test]
    fn test_trailing_comma_is_removed() {
        assert_eq!(
            lower("function f(a, b = 1,){}"),
            "function f(a){var b = arguments[1]; if (b === void 0) b = 1;}"
        );
    }

    #[test]
    fn test_setter_keeps_its_parameter() {
        assert_eq!(
            lower("var o = { set x(v = 1) { this.v = v; } };"),
            "var o = { set x(v) {if (v === void 0) v = 1; this.v = v; } };"
        );
        assert_eq!(
            lower("var o = { set x({a} = {}) { use(a); } };"),
            "var o = { set x($D$0) {if ($D$0 === void 0) $D$0 = {};var a = $D$0.a; use(a); } };"
        );
    }

    #[test]
    fn test_self_referential_default() {
        let err = lower_err("function f(a = a){}");
        assert_eq!(err.kind, ErrorKind::SelfReferentialDefault);
        assert_eq!(err.message, "default value of parameter a references the parameter itself");
        assert_eq!(err.range.start, 15);
    }

    #[test]
    fn test_default_may_close_over_its_parameter() {
        assert_eq!(
            lower("function f(a = function(){ return a; }){}"),
            "function f(){var a = arguments[0]; if (a === void 0) a = function(){ return a; };}"
        );
    }

    #[test]
    fn test_default_reads_earlier_parameter() {
        assert_eq!(
            lower("function f(a, b = a){}"),
            "function f(a){var b = arguments[1]; if (b === void 0) b = a;}"
        );
    }
}
