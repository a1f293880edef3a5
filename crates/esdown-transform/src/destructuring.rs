//! Destructuring expansion.
//!
//! A pattern and the text of the value it takes apart become a flat list of
//! `target = access` pieces. Declarations put the pieces in a declarator
//! list and declare their own temporaries inline; assignment expressions
//! become a parenthesised sequence over borrowed scope temporaries.

use crate::lower::Lowerer;
use esdown_scope::LowerResult;
use swc_common::Spanned;
use swc_ecma_ast::{
    ArrayPat, AssignExpr, AssignOp, AssignTarget, AssignTargetPat, Ident, ObjectPat,
    ObjectPatProp, Pat, PropName, VarDeclarator,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Form {
    Declare,
    Assign,
}

pub(crate) struct Expansion {
    form: Form,
    pub parts: Vec<String>,
    /// Scope temporaries borrowed for the assignment form
    temps: Vec<String>,
}

impl Expansion {
    pub fn new(form: Form) -> Self {
        Self {
            form,
            parts: Vec::new(),
            temps: Vec::new(),
        }
    }

    /// The pieces as one `var` statement.
    pub fn statement(&self) -> String {
        format!("var {};", self.parts.join(", "))
    }
}

/// Text that can be read more than once without re-evaluation.
fn is_simple(value: &str) -> bool {
    let mut chars = value.chars();
    matches!(chars.next(), Some(c) if c.is_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

fn defaulted(target: &str, value: &str, default: &str) -> String {
    format!("{0} = ({0} = {1}) === void 0 ? {2} : {0}", target, value, default)
}

/// Every identifier a declaration pattern binds, in source order.
pub(crate) fn bound_idents<'a>(pat: &'a Pat, out: &mut Vec<&'a Ident>) {
    match pat {
        Pat::Ident(b) => out.push(&b.id),
        Pat::Array(array) => {
            for elem in array.elems.iter().flatten() {
                bound_idents(elem, out);
            }
        }
        Pat::Rest(rest) => bound_idents(&rest.arg, out),
        Pat::Object(object) => {
            for prop in &object.props {
                match prop {
                    ObjectPatProp::KeyValue(kv) => bound_idents(&kv.value, out),
                    ObjectPatProp::Assign(a) => out.push(&a.key.id),
                    ObjectPatProp::Rest(rest) => bound_idents(&rest.arg, out),
                }
            }
        }
        Pat::Assign(a) => bound_idents(&a.left, out),
        Pat::Expr(_) | Pat::Invalid(_) => {}
    }
}

/// `[a] = v` or `({a} = v)`, lowered to a temporary-based sequence.
pub(crate) fn is_pattern_assignment(assign: &AssignExpr) -> bool {
    assign.op == AssignOp::Assign && matches!(assign.left, AssignTarget::Pat(_))
}

impl Lowerer<'_> {
    fn target_name(&self, ident: &Ident, form: Form) -> String {
        match form {
            Form::Declare => self.binding_name(ident),
            Form::Assign => self.reference_name(ident),
        }
    }

    fn fresh_temp(&mut self, exp: &mut Expansion) -> LowerResult<String> {
        match exp.form {
            Form::Declare => Ok(self.unit.unique("$D", true)),
            Form::Assign => {
                let scope = self.current_scope();
                let temp = self.unit.get_scope_temp_var(scope)?;
                exp.temps.push(temp.clone());
                Ok(temp)
            }
        }
    }

    fn reusable(&mut self, value: String, exp: &mut Expansion) -> LowerResult<String> {
        if is_simple(&value) {
            return Ok(value);
        }
        let temp = self.fresh_temp(exp)?;
        exp.parts.push(format!("{} = {}", temp, value));
        Ok(temp)
    }

    pub(crate) fn property_access(&self, source: &str, key: &PropName) -> LowerResult<String> {
        Ok(match key {
            PropName::Ident(i) => format!("{}.{}", source, i.sym),
            PropName::Str(_) | PropName::Num(_) => {
                format!("{}[{}]", source, self.unit.slice(self.range(key.span())))
            }
            PropName::Computed(c) => {
                format!("{}[{}]", source, self.render(self.range(c.expr.span()))?)
            }
            PropName::BigInt(b) => {
                return Err(self.unit.assertion(self.range(b.span), "bigint property key"))
            }
        })
    }

    /// Expand `pat` against `value`, appending to `exp`.
    pub(crate) fn expand_pattern(
        &mut self,
        pat: &Pat,
        value: String,
        exp: &mut Expansion,
    ) -> LowerResult<()> {
        match pat {
            Pat::Ident(b) => {
                let name = self.target_name(&b.id, exp.form);
                exp.parts.push(format!("{} = {}", name, value));
            }
            Pat::Expr(e) => {
                let target = self.render(self.range(e.span()))?;
                exp.parts.push(format!("{} = {}", target, value));
            }
            Pat::Assign(a) => {
                let default = self.render(self.range(a.right.span()))?;
                match &*a.left {
                    Pat::Ident(b) => {
                        let name = self.target_name(&b.id, exp.form);
                        exp.parts.push(defaulted(&name, &value, &default));
                    }
                    left => {
                        let temp = self.fresh_temp(exp)?;
                        exp.parts.push(defaulted(&temp, &value, &default));
                        self.expand_pattern(left, temp, exp)?;
                    }
                }
            }
            Pat::Array(array) => self.expand_array(array, value, exp)?,
            Pat::Object(object) => self.expand_object(object, value, exp)?,
            Pat::Rest(rest) => {
                return Err(self
                    .unit
                    .assertion(self.range(rest.span), "rest element outside an array pattern"))
            }
            Pat::Invalid(i) => {
                return Err(self.unit.assertion(self.range(i.span), "invalid pattern"))
            }
        }
        Ok(())
    }

    fn expand_array(&mut self, array: &ArrayPat, value: String, exp: &mut Expansion) -> LowerResult<()> {
        let source = self.reusable(value, exp)?;
        for (i, elem) in array.elems.iter().enumerate() {
            match elem {
                None => {}
                Some(Pat::Rest(rest)) => {
                    let tail = format!("[].slice.call({}, {})", source, i);
                    self.expand_pattern(&rest.arg, tail, exp)?;
                }
                Some(elem) => self.expand_pattern(elem, format!("{}[{}]", source, i), exp)?,
            }
        }
        Ok(())
    }

    fn expand_object(&mut self, object: &ObjectPat, value: String, exp: &mut Expansion) -> LowerResult<()> {
        let source = self.reusable(value, exp)?;
        for prop in &object.props {
            match prop {
                ObjectPatProp::KeyValue(kv) => {
                    let access = self.property_access(&source, &kv.key)?;
                    self.expand_pattern(&kv.value, access, exp)?;
                }
                ObjectPatProp::Assign(a) => {
                    let name = self.target_name(&a.key.id, exp.form);
                    let access = format!("{}.{}", source, a.key.id.sym);
                    match &a.value {
                        Some(default) => {
                            let default = self.render(self.range(default.span()))?;
                            exp.parts.push(defaulted(&name, &access, &default));
                        }
                        None => exp.parts.push(format!("{} = {}", name, access)),
                    }
                }
                ObjectPatProp::Rest(rest) => {
                    return Err(self
                        .unit
                        .assertion(self.range(rest.span), "object rest pattern"))
                }
            }
        }
        Ok(())
    }

    /// `var PATTERN = init` as a flat declarator list.
    pub(crate) fn lower_declarator_pattern(&mut self, declarator: &VarDeclarator) -> LowerResult<()> {
        let range = self.range(declarator.span);
        let Some(init) = &declarator.init else {
            return Err(self
                .unit
                .assertion(range, "destructuring declaration without initializer"));
        };
        let value = self.render(self.range(init.span()))?;
        let mut exp = Expansion::new(Form::Declare);
        self.expand_pattern(&declarator.name, value.clone(), &mut exp)?;
        if exp.parts.is_empty() {
            // `var [] = f()` still evaluates f()
            let temp = self.unit.unique("$D", true);
            exp.parts.push(format!("{} = {}", temp, value));
        }
        self.supersede(range, exp.parts.join(", "))
    }

    /// `PATTERN = value` as `($D$0 = value, a = $D$0[0], ..., $D$0)`.
    pub(crate) fn lower_pattern_assignment(&mut self, assign: &AssignExpr) -> LowerResult<()> {
        let AssignTarget::Pat(target) = &assign.left else {
            return Ok(());
        };
        if assign.op != AssignOp::Assign {
            return Ok(());
        }
        self.pattern_depth = self.pattern_depth.saturating_sub(1);
        let range = self.range(assign.span);
        let value = self.render(self.range(assign.right.span()))?;
        let mut exp = Expansion::new(Form::Assign);
        let temp = self.fresh_temp(&mut exp)?;
        exp.parts.push(format!("{} = {}", temp, value));
        match target {
            AssignTargetPat::Array(array) => self.expand_array(array, temp.clone(), &mut exp)?,
            AssignTargetPat::Object(object) => self.expand_object(object, temp.clone(), &mut exp)?,
            AssignTargetPat::Invalid(i) => {
                return Err(self.unit.assertion(self.range(i.span), "invalid assignment pattern"))
            }
        }
        exp.parts.push(temp);

        // an enclosing pattern may still be reading from these
        let scope = self.current_scope();
        self.held_temps
            .extend(exp.temps.drain(..).map(|temp| (scope, temp)));
        if self.pattern_depth == 0 {
            for (scope, temp) in std::mem::take(&mut self.held_temps) {
                self.unit.set_scope_temp_var(scope, temp);
            }
        }
        self.supersede(range, format!("({})", exp.parts.join(", ")))
    }
}

#[cfg(test)]
mod tests {
    use crate::tests::{lower, lower_err};
    use esdown_scope::ErrorKind;

    #[test]
    fn test_array_declaration() {
        assert_eq!(lower("var [a, b] = xs;"), "var a = xs[0], b = xs[1];");
        assert_eq!(
            lower("let [a, , ...r] = f();"),
            "var $D$0 = f(), a = $D$0[0], r = [].slice.call($D$0, 2);"
        );
    }

    #[test]
    fn test_object_declaration() {
        assert_eq!(
            lower("const {a, b: c, 'd e': g, [k]: h} = o;"),
            "var a = o.a, c = o.b, g = o['d e'], h = o[k];"
        );
    }

    #[test]
    fn test_nested_and_defaults() {
        assert_eq!(
            lower("var {a: [x = 1], b = 2} = o;"),
            "var $D$0 = o.a, x = (x = $D$0[0]) === void 0 ? 1 : x, b = (b = o.b) === void 0 ? 2 : b;"
        );
    }

    #[test]
    fn test_empty_pattern_keeps_initializer() {
        assert_eq!(lower("var [] = f();"), "var $D$0 = f();");
    }

    #[test]
    fn test_assignment_expression() {
        assert_eq!(
            lower("var a, b; [a, b] = [b, a];"),
            "var $D$0;var a, b; ($D$0 = [b, a], a = $D$0[0], b = $D$0[1], $D$0);"
        );
    }

    #[test]
    fn test_assignment_temps_are_reused() {
        let out = lower("var a, b; ({a} = x); ({b} = y);");
        assert_eq!(
            out,
            "var $D$0;var a, b; (($D$0 = x, a = $D$0.a, $D$0)); (($D$0 = y, b = $D$0.b, $D$0));"
        );
    }

    #[test]
    fn test_nested_assignment_in_default_gets_its_own_temp() {
        let out = lower("var a, b, c; [a = ([b] = [9], 1), c] = [void 0, 2];");
        assert!(out.contains("var $D$0;") && out.contains("var $D$1;"), "{}", out);
        assert!(
            out.contains(
                "($D$1 = [void 0, 2], a = (a = $D$1[0]) === void 0 ? (($D$0 = [9], b = $D$0[0], $D$0), 1) : a, c = $D$1[1], $D$1)"
            ),
            "{}",
            out
        );
    }

    #[test]
    fn test_temps_released_after_outermost_assignment() {
        let out = lower("var a, b, c; [a = ([b] = [9], 1)] = xs; [c] = ys;");
        assert!(out.contains("($D$0 = ys, c = $D$0[0], $D$0)") || out.contains("($D$1 = ys, c = $D$1[0], $D$1)"), "{}", out);
        assert!(!out.contains("$D$2"), "{}", out);
    }

    #[test]
    fn test_object_rest_is_rejected() {
        let err = lower_err("var {a, ...r} = o;");
        assert_eq!(err.kind, ErrorKind::StructuralAssertion);
    }

    #[test]
    fn test_renamed_bindings_in_patterns() {
        assert_eq!(
            lower("var a; { let [a] = xs; use(a); }"),
            "var a; { var a$0 = xs[0]; use(a$0); }"
        );
    }
}
