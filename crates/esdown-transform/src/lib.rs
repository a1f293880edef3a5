//! Lowering passes for esdown
//!
//! Rewrites an analyzed ES6 script into ES5 text edits:
//! - Block bindings (`let`/`const` to renamed `var`)
//! - Arrow functions
//! - Default, rest and destructured parameters
//! - Destructuring declarations and assignments
//! - Classes, including inheritance and `super`
//!
//! All passes share one post-order walk over the script.

mod arrows;
mod bindings;
mod classes;
mod destructuring;
mod lower;
mod params;

use anyhow::Result;
use esdown_scope::{apply_edits, check_loop_closures, walk_script, LowerError, Options, TextEdit, Unit};
use lower::Lowerer;
use swc_ecma_ast::Script;

/// Output of [`lower_source`].
#[derive(Debug, Clone)]
pub struct Lowered {
    pub code: String,
    /// Number of edits applied to the input
    pub edit_count: usize,
}

/// Analysis only: scopes, references, const writes and loop closures.
pub fn check_unit(unit: &mut Unit, script: &Script) -> Result<(), LowerError> {
    unit.analyze(script)?;
    check_loop_closures(unit, script)
}

/// Run the whole pipeline on a fresh or reset unit and return its edits.
pub fn lower_unit(unit: &mut Unit, script: &Script) -> Result<Vec<TextEdit>, LowerError> {
    check_unit(unit, script)?;
    log::debug!("lowering");
    let source = unit.source().to_string();
    let base = unit.base;
    let mut lowerer = Lowerer::new(unit);
    walk_script(script, &source, base, &mut lowerer)?;
    let edits = std::mem::take(&mut unit.edits).into_edits();
    log::debug!("{} edits", edits.len());
    Ok(edits)
}

pub fn lower_script(
    script: &Script,
    source: &str,
    base: u32,
    options: Options,
) -> Result<Vec<TextEdit>, LowerError> {
    let mut unit = Unit::new(source, base, options);
    lower_unit(&mut unit, script)
}

/// Parse, lower and apply in one step.
pub fn lower_source(source: &str, filename: &str, options: Options) -> Result<Lowered> {
    let parsed = esdown_parser::parse_script(source, filename)?;
    let edits = lower_script(&parsed.script, source, parsed.base, options)?;
    let code = apply_edits(source, &edits)?;
    Ok(Lowered {
        code,
        edit_count: edits.len(),
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use esdown_scope::ErrorKind;

    pub(crate) fn lower(source: &str) -> String {
        lower_source(source, "test.js", Options::default())
            .unwrap()
            .code
    }

    pub(crate) fn lower_err(source: &str) -> LowerError {
        let err = lower_source(source, "test.js", Options::default()).unwrap_err();
        err.downcast::<LowerError>().unwrap()
    }

    #[test]
    fn test_nothing_to_lower_is_byte_identical() {
        let sources = [
            "var a = 1;\nfunction f(x) { return x + a; }\n",
            "// comment\n\tvar o = {a: 1, 'b': [1, 2]};  /* trailing */\n",
            "'use strict';\nfor (var i = 0; i < 3; i++) { (function(j){ return j; })(i); }",
        ];
        for source in sources {
            let lowered = lower_source(source, "test.js", Options::default()).unwrap();
            assert_eq!(lowered.code, source);
            assert_eq!(lowered.edit_count, 0);
        }
    }

    #[test]
    fn test_inner_block_binding_does_not_leak() {
        let out = lower("function f(){ let x=1; { let x=2; return x; } }");
        assert_eq!(out, "function f(){ var x=1; { var x$0=2; return x$0; } }");
    }

    #[test]
    fn test_use_before_declaration() {
        let err = lower_err("let x = x;");
        assert_eq!(err.kind, ErrorKind::UseBeforeDeclaration);
        assert_eq!(err.line, 1);
    }

    #[test]
    fn test_use_from_a_function_called_later() {
        assert_eq!(
            lower("function f(){ return x; } let x = 1; f();"),
            "function f(){ return x; } var x = 1; f();"
        );
    }

    #[test]
    fn test_const_reassignment() {
        let err = lower_err("const c = 1;\nc = 2;");
        assert_eq!(err.kind, ErrorKind::ConstReassignment);
        assert_eq!(err.line, 2);
    }

    #[test]
    fn test_loop_closure() {
        let err = lower_err("for (let i = 0; i < 3; i++) { fs.push(function(){ return i; }); }");
        assert_eq!(err.kind, ErrorKind::UnsupportedLoopClosure);

        let out = lower(
            "for (let i = 0; i < 3; i++) { (function(i){ fs.push(function(){ return i; }); })(i); }",
        );
        assert!(out.starts_with("for (var i = 0;"));
    }

    #[test]
    fn test_class_lowering() {
        let out = lower(
            "class A { constructor(x){this.x=x;} get y(){return this.x*2;} static z(){return 1;} }\nclass B extends A { constructor(x){ super(x); } y(){ return super.y + 1; } }",
        );
        assert_eq!(out.lines().count(), 2);
        assert!(out.contains("var A = (function(){"));
        assert!(out.contains("var B = (function(super$0){"));
        assert!(out.contains("return B;})(A);"));
        assert!(!out.contains("class "));
    }

    #[test]
    fn test_parameters() {
        assert_eq!(
            lower("function f(a, b = 2, ...rest){}"),
            "function f(a){var b = arguments[1]; if (b === void 0) b = 2;var rest = [].slice.call(arguments, 2);}"
        );
        assert_eq!(lower_err("function f(a = a){}").kind, ErrorKind::SelfReferentialDefault);
    }

    #[test]
    fn test_lines_are_preserved() {
        let source = "let a = 1;\nconst f = (x) => {\n  return x + a;\n};\nclass C {\n  m() { return f(1); }\n}\n";
        let out = lower(source);
        assert_eq!(out.lines().count(), source.lines().count());
    }

    #[test]
    fn test_unit_can_be_rerun_after_reset() {
        let source = "{ let a = 1; } { let a = 2; }";
        let parsed = esdown_parser::parse_script(source, "test.js").unwrap();
        let mut unit = Unit::new(source, parsed.base, Options::default());
        let first = lower_unit(&mut unit, &parsed.script).unwrap();
        unit.reset();
        let second = lower_unit(&mut unit, &parsed.script).unwrap();
        assert_eq!(
            apply_edits(source, &first).unwrap(),
            apply_edits(source, &second).unwrap()
        );
    }

    #[test]
    fn test_parse_errors_are_not_lowering_errors() {
        let err = lower_source("let = ;", "test.js", Options::default()).unwrap_err();
        assert!(err.downcast_ref::<LowerError>().is_none());
        assert!(err.downcast_ref::<esdown_parser::ParseError>().is_some());
    }
}
