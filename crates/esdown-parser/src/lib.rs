//! ECMAScript parser wrapper using SWC
//!
//! Parses classic (non-module) scripts and reports where the file starts in
//! SWC's byte-position space, so every node span can be mapped back to an
//! offset into the original text.

use anyhow::Result;
use esdown_diagnostics::{Diagnostic, DiagnosticCode, Diagnostics, FileId, SourceCache, Span};
use swc_common::{input::StringInput, sync::Lrc, FileName, SourceMap};
use swc_ecma_ast::Script;
use swc_ecma_parser::{lexer::Lexer, EsSyntax, Parser, Syntax};

// Re-export AST types for consumers that need to inspect the AST
pub use swc_ecma_ast;

// Re-export Spanned trait for getting spans from AST nodes
pub use swc_common::Spanned;

/// Result of parsing one script.
#[derive(Debug)]
pub struct ParseResult {
    pub script: Script,
    /// The file ID in the source cache
    pub file_id: FileId,
    /// SWC byte position of the first byte of the file. Subtract it from
    /// any node span to get an offset into the source text.
    pub base: u32,
    /// Recoverable parse errors, reported as warnings
    pub diagnostics: Diagnostics,
}

/// A fatal syntax error.
#[derive(Debug, thiserror::Error)]
#[error("parse error: {}", .diagnostic.message)]
pub struct ParseError {
    pub diagnostic: Diagnostic,
}

/// Parse a script, registering its text in `cache` for later diagnostics.
///
/// A fatal syntax error is returned as an `anyhow` error wrapping
/// [`ParseError`], so callers can downcast to render it.
pub fn parse_script_with_cache(
    source: &str,
    filename: &str,
    cache: &mut SourceCache,
) -> Result<ParseResult> {
    let file_id = cache.add_file(filename, source.to_string());

    // SWC keeps its own source map; only the start offset is needed from it
    let source_map: Lrc<SourceMap> = Default::default();
    let source_file = source_map.new_source_file(
        Lrc::new(FileName::Custom(filename.to_string())),
        source.to_string(),
    );
    let base = source_file.start_pos.0;

    let lexer = Lexer::new(
        Syntax::Es(EsSyntax::default()),
        swc_ecma_ast::EsVersion::Es2022,
        StringInput::from(&*source_file),
        None,
    );

    let mut parser = Parser::new_from(lexer);
    let to_span = |span: swc_common::Span| {
        Span::new(
            file_id,
            span.lo.0.saturating_sub(base),
            span.hi.0.saturating_sub(base),
        )
    };

    let script = match parser.parse_script() {
        Ok(script) => script,
        Err(e) => {
            let diagnostic =
                Diagnostic::error(DiagnosticCode::ParseError, e.kind().msg().to_string())
                    .with_span(to_span(e.span()))
                    .build();
            return Err(ParseError { diagnostic }.into());
        }
    };

    let mut diagnostics = Diagnostics::new();
    for error in parser.take_errors() {
        diagnostics.push(
            Diagnostic::warning(DiagnosticCode::ParseError, error.kind().msg().to_string())
                .with_span(to_span(error.span()))
                .build(),
        );
    }

    Ok(ParseResult {
        script,
        file_id,
        base,
        diagnostics,
    })
}

/// Parse a script without a diagnostics cache.
pub fn parse_script(source: &str, filename: &str) -> Result<ParseResult> {
    let mut cache = SourceCache::new();
    parse_script_with_cache(source, filename, &mut cache)
}

#[cfg(test)]
mod tests {
    use super::*;
    use swc_common::Spanned;

    #[test]
    fn test_parse_es6_constructs() {
        let source = r#"
            class A extends B { constructor(x) { super(x); } get y() { return 1; } }
            let [a, ...rest] = list;
            const f = (x = 1, ...r) => x;
        "#;
        let result = parse_script(source, "test.js").unwrap();
        assert_eq!(result.script.body.len(), 3);
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn test_spans_are_file_relative() {
        let source = "var answer = 42;";
        let result = parse_script(source, "test.js").unwrap();
        let span = result.script.body[0].span();
        let start = (span.lo.0 - result.base) as usize;
        let end = (span.hi.0 - result.base) as usize;
        assert!(source[start..end].starts_with("var answer = 42"));
    }

    #[test]
    fn test_parse_error_is_typed() {
        let mut cache = SourceCache::new();
        let err = parse_script_with_cache("let x = ;", "bad.js", &mut cache).unwrap_err();
        let parse_error = err.downcast_ref::<ParseError>().unwrap();
        assert_eq!(parse_error.diagnostic.code, DiagnosticCode::ParseError);
        assert!(cache.get_id("bad.js").is_some());
    }
}
