//! Check command - analyze scripts without writing output

use anyhow::{anyhow, Result};
use clap::Args;
use esdown_diagnostics::{Diagnostics, SourceCache};
use std::path::PathBuf;

use super::{collect_js_files, emit_diagnostics, process_file, Mode};
use crate::config::ConfigArgs;
use crate::{Output, OutputFormat};

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Input script or directory
    #[arg(default_value = ".")]
    pub input: PathBuf,

    #[command(flatten)]
    pub config: ConfigArgs,
}

pub fn run(args: CheckArgs, output: Output) -> Result<()> {
    let options = args.config.load()?;
    let files = collect_js_files(&args.input)?;

    let mut cache = SourceCache::new();
    let mut diagnostics = Diagnostics::new();
    let mut failed = 0;
    for file in &files {
        log::info!("checking {}", file.display());
        if process_file(file, &options, Mode::Check, &mut cache, &mut diagnostics)?.is_none() {
            failed += 1;
        }
    }

    emit_diagnostics(&diagnostics, &cache, output)?;

    match output.format {
        OutputFormat::Text if !output.quiet => {
            if failed == 0 {
                let message = format!("All checks passed - {} file(s) checked", files.len());
                if output.use_color {
                    println!("{}", console::style(message).green().bold());
                } else {
                    println!("{}", message);
                }
            } else {
                let message = format!("Check failed: {} of {} file(s)", failed, files.len());
                if output.use_color {
                    println!("{}", console::style(message).red().bold());
                } else {
                    println!("{}", message);
                }
            }
        }
        OutputFormat::Text => {}
        OutputFormat::Json => {
            let summary = serde_json::json!({
                "type": "summary",
                "success": failed == 0,
                "files_checked": files.len(),
                "files_failed": failed,
                "errors": diagnostics.error_count(),
                "warnings": diagnostics.warning_count(),
            });
            println!("{}", serde_json::to_string(&summary)?);
        }
    }

    if failed > 0 {
        Err(anyhow!("Check failed with errors"))
    } else {
        Ok(())
    }
}
