//! Arrow functions become function expressions.

use crate::lower::Lowerer;
use esdown_scope::text;
use esdown_scope::walk::FunctionNode;
use esdown_scope::{LowerResult, TextRange};
use swc_common::Spanned;
use swc_ecma_ast::{ArrowExpr, BlockStmtOrExpr};

impl Lowerer<'_> {
    pub(crate) fn lower_arrow(&mut self, arrow: &ArrowExpr, prologue: String) -> LowerResult<()> {
        let range = self.range(arrow.span);
        if arrow.is_async || arrow.is_generator {
            return Err(self.unit.assertion(range, "async arrow function"));
        }
        let body = self.range(arrow.body.span());
        let params_end = arrow
            .params
            .last()
            .map_or(range.start, |p| self.range(p.span()).end);

        let source = self.unit.source();
        let parenthesized = source.as_bytes().get(range.start as usize) == Some(&b'(');
        let Some(at) = text::find_token(source, params_end as usize, body.start as usize, "=>") else {
            return Err(self.unit.assertion(range, "arrow without `=>`"));
        };
        let at = at as u32;
        // blanks after `=>` before a block body
        let blanks = source[at as usize + 2..body.start as usize]
            .bytes()
            .take_while(|b| matches!(b, b' ' | b'\t'))
            .count() as u32;

        if parenthesized {
            self.unit.edits.insert_before(range.start, "function");
        } else {
            self.unit.edits.insert_before(range.start, "function(");
            self.unit.edits.insert_after(params_end, ")");
        }

        match &*arrow.body {
            BlockStmtOrExpr::BlockStmt(_) => {
                self.unit
                    .edits
                    .replace(TextRange::new(at, at + 2 + blanks), "");
                if !prologue.is_empty() {
                    self.insert_prologue(&FunctionNode::Arrow(arrow), &prologue)?;
                }
            }
            BlockStmtOrExpr::Expr(_) => {
                self.unit
                    .edits
                    .replace(TextRange::new(at, at + 2), format!("{{{}", prologue));
                self.unit.edits.insert_after(body.start, "return ");
                self.unit.edits.insert_after(body.end, "}");
            }
        }

        if self.unit.bound_receivers.contains(&range) {
            log::debug!("binding receiver of arrow at {}", range.start);
            self.unit.edits.insert_after(range.end, ".bind(this)");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::tests::lower;

    #[test]
    fn test_expression_body() {
        assert_eq!(lower("var f = x => x * 2;"), "var f = function(x) { return x * 2};");
        assert_eq!(lower("var f = (a, b)=>a;"), "var f = function(a, b){return a};");
    }

    #[test]
    fn test_block_body() {
        assert_eq!(
            lower("var f = () => { return 1; };"),
            "var f = function() { return 1; };"
        );
    }

    #[test]
    fn test_receiver_is_bound() {
        assert_eq!(
            lower("function f() { return () => this.x; }"),
            "function f() { return function() { return this.x}.bind(this); }"
        );
    }

    #[test]
    fn test_nested_arrows() {
        assert_eq!(
            lower("var f = a => b => a + b;"),
            "var f = function(a) { return function(b) { return a + b}};"
        );
        assert_eq!(
            lower("function f() { return () => () => this; }"),
            "function f() { return function() { return function() { return this}.bind(this)}.bind(this); }"
        );
    }

    #[test]
    fn test_parameters_of_an_arrow() {
        assert_eq!(
            lower("var f = (a, ...r) => r;"),
            "var f = function(a) {var r = [].slice.call(arguments, 1); return r};"
        );
        assert_eq!(
            lower("var g = (x = 1) => { return x; };"),
            "var g = function() {var x = arguments[0]; if (x === void 0) x = 1; return x; };"
        );
    }

    #[test]
    fn test_object_body() {
        assert_eq!(lower("var f = () => ({a: 1});"), "var f = function() { return ({a: 1})};");
    }
}
