//! Explain command - explain error codes

use anyhow::{anyhow, Result};
use clap::Args;
use esdown_diagnostics::DiagnosticCode;

use crate::{Output, OutputFormat};

#[derive(Args, Debug)]
pub struct ExplainArgs {
    /// Error code to explain (e.g., E004)
    pub code: String,
}

struct ErrorExplanation {
    code: DiagnosticCode,
    title: &'static str,
    description: &'static str,
    example: Option<&'static str>,
    suggestion: Option<&'static str>,
    related: &'static [&'static str],
}

const ERROR_EXPLANATIONS: &[ErrorExplanation] = &[
    ErrorExplanation {
        code: DiagnosticCode::ParseError,
        title: "Parse Error",
        description: "The input is not a syntactically valid ES6 script. Modules (import/export) are not accepted.",
        example: Some("let = ;"),
        suggestion: Some("Fix the syntax error reported at the location shown."),
        related: &["E001"],
    },
    ErrorExplanation {
        code: DiagnosticCode::StructuralAssertion,
        title: "Unsupported Construct",
        description: r#"The script uses a construct outside the dialect esdown lowers, or the
syntax tree has a shape the lowering passes do not expect.

Class fields, private members, static blocks, object rest patterns,
async arrows and writes to super properties all end up here."#,
        example: Some("class A { x = 1; }  // class field"),
        suggestion: Some("Rewrite the construct with ES6 features, e.g. assign fields in the constructor."),
        related: &["P001"],
    },
    ErrorExplanation {
        code: DiagnosticCode::UnknownReference,
        title: "Unknown Reference",
        description: "A name resolves to no declaration and to no known global while disallow-unknown-references is on.",
        example: Some("console.log(undeclaredVar);"),
        suggestion: Some(r#"Declare the variable, or make it known:

  esdown lower --env browser in.js
  esdown lower --global undeclaredVar in.js"#),
        related: &["E004"],
    },
    ErrorExplanation {
        code: DiagnosticCode::UseBeforeDeclaration,
        title: "Use Before Declaration",
        description: r#"A let, const or class binding is read, in the same function, before its
declaration has run. After lowering to var the read would silently see
undefined instead of throwing."#,
        example: Some("let x = x;"),
        suggestion: Some("Move the declaration above its first use. Uses inside functions called later are fine."),
        related: &["E006"],
    },
    ErrorExplanation {
        code: DiagnosticCode::ConstReassignment,
        title: "Const Reassignment",
        description: "A const binding, or a global declared read-only, is assigned or updated.",
        example: Some("const c = 1;\nc = 2;"),
        suggestion: Some("Declare the binding with let if it must change."),
        related: &["E002"],
    },
    ErrorExplanation {
        code: DiagnosticCode::UnsupportedLoopClosure,
        title: "Closure Captures Loop Binding",
        description: r#"A function created inside a loop captures a let or const binding declared
in that loop. ES6 gives every iteration a fresh binding; after lowering
to var all closures would share one."#,
        example: Some("for (let i = 0; i < 3; i++) { fs.push(function(){ return i; }); }"),
        suggestion: Some(r#"Pass the binding through an immediately invoked function:

for (let i = 0; i < 3; i++) {
  (function(i){ fs.push(function(){ return i; }); })(i);
}"#),
        related: &[],
    },
    ErrorExplanation {
        code: DiagnosticCode::SelfReferentialDefault,
        title: "Self-Referential Default",
        description: "The default value of a parameter reads the parameter it initializes.",
        example: Some("function f(a = a) {}"),
        suggestion: Some("Use an earlier parameter or an outer variable as the default."),
        related: &["E003"],
    },
    ErrorExplanation {
        code: DiagnosticCode::DisallowedVar,
        title: "Disallowed var",
        description: "A var declaration appears while disallow-vars is on.",
        example: Some("var x = 1;"),
        suggestion: Some("Declare the binding with let or const."),
        related: &[],
    },
];

pub fn run(args: ExplainArgs, output: Output) -> Result<()> {
    let code = args.code.to_uppercase();

    let explanation = DiagnosticCode::from_code(&code)
        .and_then(|c| ERROR_EXPLANATIONS.iter().find(|e| e.code == c))
        .ok_or_else(|| anyhow!("Unknown error code: {}", code))?;

    match output.format {
        OutputFormat::Text => {
            let underline = "=".repeat(code.len() + explanation.title.len() + 2);
            if output.use_color {
                println!(
                    "\n{}: {}\n{}",
                    console::style(&code).bold().cyan(),
                    console::style(explanation.title).bold(),
                    underline
                );
            } else {
                println!("\n{}: {}\n{}", code, explanation.title, underline);
            }

            println!("\n{}\n", explanation.description);

            if let Some(example) = explanation.example {
                if output.use_color {
                    println!("{}:", console::style("Example").bold());
                } else {
                    println!("Example:");
                }
                for line in example.lines() {
                    println!("  {}", line);
                }
                println!();
            }

            if let Some(suggestion) = explanation.suggestion {
                if output.use_color {
                    println!("{}:", console::style("Suggestion").bold().green());
                } else {
                    println!("Suggestion:");
                }
                for line in suggestion.lines() {
                    println!("  {}", line);
                }
                println!();
            }

            if !explanation.related.is_empty() {
                if output.use_color {
                    println!(
                        "{}: {}",
                        console::style("Related").dim(),
                        explanation.related.join(", ")
                    );
                } else {
                    println!("Related: {}", explanation.related.join(", "));
                }
            }
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "code": explanation.code.as_str(),
                "title": explanation.title,
                "description": explanation.description,
                "example": explanation.example,
                "suggestion": explanation.suggestion,
                "related": explanation.related,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_code_is_explained() {
        for code in DiagnosticCode::ALL {
            assert!(
                ERROR_EXPLANATIONS.iter().any(|e| e.code == code),
                "{} has no explanation",
                code
            );
        }
    }

    #[test]
    fn test_related_codes_exist() {
        for explanation in ERROR_EXPLANATIONS {
            for related in explanation.related {
                assert!(DiagnosticCode::from_code(related).is_some(), "{}", related);
            }
        }
    }
}
