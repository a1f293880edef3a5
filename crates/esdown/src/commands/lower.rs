//! Lower command - rewrite scripts as ES5

use anyhow::{anyhow, bail, Context, Result};
use clap::Args;
use esdown_diagnostics::{Diagnostics, SourceCache};
use similar::TextDiff;
use std::fs;
use std::path::{Path, PathBuf};

use super::{collect_js_files, emit_diagnostics, process_file, Mode};
use crate::config::ConfigArgs;
use crate::{Output, OutputFormat};

#[derive(Args, Debug)]
pub struct LowerArgs {
    /// Input script or directory
    pub input: PathBuf,

    /// Output file, or output directory when the input is a directory
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Print a unified diff instead of the lowered code
    #[arg(long)]
    pub diff: bool,

    #[command(flatten)]
    pub config: ConfigArgs,
}

/// Where the lowered text of `file` goes.
fn destination(args: &LowerArgs, file: &Path) -> Result<Option<PathBuf>> {
    let Some(output) = &args.output else {
        return Ok(None);
    };
    if args.input.is_file() {
        return Ok(Some(output.clone()));
    }
    let relative = file
        .strip_prefix(&args.input)
        .with_context(|| format!("{} is outside {}", file.display(), args.input.display()))?;
    Ok(Some(output.join(relative)))
}

fn unified_diff(file: &Path, before: &str, after: &str) -> String {
    let name = file.display().to_string();
    TextDiff::from_lines(before, after)
        .unified_diff()
        .context_radius(3)
        .header(&name, &name)
        .to_string()
}

pub fn run(args: LowerArgs, output: Output) -> Result<()> {
    if args.input.is_dir() && args.output.is_none() && !args.diff {
        bail!("Lowering a directory needs --output DIR");
    }
    let options = args.config.load()?;
    let files = collect_js_files(&args.input)?;

    let mut cache = SourceCache::new();
    let mut diagnostics = Diagnostics::new();
    let mut failed = 0;
    let mut written = 0;
    for file in &files {
        log::info!("lowering {}", file.display());
        let Some(lowered) = process_file(file, &options, Mode::Lower, &mut cache, &mut diagnostics)?
        else {
            failed += 1;
            continue;
        };

        if args.diff {
            let before = fs::read_to_string(file)?;
            let diff = unified_diff(file, &before, &lowered.code);
            match output.format {
                OutputFormat::Text => print!("{}", diff),
                OutputFormat::Json => println!(
                    "{}",
                    serde_json::json!({
                        "type": "diff",
                        "file": file.display().to_string(),
                        "edits": lowered.edit_count,
                        "diff": diff,
                    })
                ),
            }
            continue;
        }

        match destination(&args, file)? {
            Some(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    fs::create_dir_all(parent)
                        .with_context(|| format!("Failed to create {}", parent.display()))?;
                }
                fs::write(&path, &lowered.code)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                log::debug!("{} edit(s), wrote {}", lowered.edit_count, path.display());
                written += 1;
            }
            None => match output.format {
                OutputFormat::Text => print!("{}", lowered.code),
                OutputFormat::Json => println!(
                    "{}",
                    serde_json::json!({
                        "type": "output",
                        "file": file.display().to_string(),
                        "edits": lowered.edit_count,
                        "code": lowered.code,
                    })
                ),
            },
        }
    }

    emit_diagnostics(&diagnostics, &cache, output)?;

    if written > 0 && !output.quiet && matches!(output.format, OutputFormat::Text) {
        let message = format!("Lowered {} file(s)", written);
        if output.use_color {
            eprintln!("{}", console::style(message).green());
        } else {
            eprintln!("{}", message);
        }
    }

    if failed > 0 {
        Err(anyhow!("{} file(s) failed to lower", failed))
    } else {
        Ok(())
    }
}
