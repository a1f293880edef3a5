//! CLI command implementations

pub mod check;
pub mod explain;
pub mod lower;

use anyhow::{Context, Result};
use esdown_diagnostics::{
    DiagnosticEmitter, Diagnostics, JsonEmitter, SourceCache, TerminalEmitter,
};
use esdown_parser::ParseError;
use esdown_scope::{apply_edits, Options, Unit};
use esdown_transform::{check_unit, lower_unit, Lowered};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::{Output, OutputFormat};

/// How far to take one file through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Check,
    Lower,
}

/// Collect the scripts under `path`, or `path` itself if it is a file.
pub fn collect_js_files(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    if !path.is_dir() {
        anyhow::bail!("No such file or directory: {}", path.display());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(path)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if path.components().any(|c| c.as_os_str() == "node_modules") {
            continue;
        }
        if path.is_file() && path.extension().is_some_and(|ext| ext == "js") {
            files.push(path.to_path_buf());
        }
    }
    Ok(files)
}

/// Run the pipeline on one file. Parse and lowering errors are recorded in
/// `diagnostics`; `Ok(None)` means the file failed.
pub fn process_file(
    path: &Path,
    options: &Options,
    mode: Mode,
    cache: &mut SourceCache,
    diagnostics: &mut Diagnostics,
) -> Result<Option<Lowered>> {
    let source = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let filename = path.to_string_lossy().to_string();

    let parsed = match esdown_parser::parse_script_with_cache(&source, &filename, cache) {
        Ok(parsed) => parsed,
        Err(e) => match e.downcast::<ParseError>() {
            Ok(parse_error) => {
                diagnostics.push(parse_error.diagnostic);
                return Ok(None);
            }
            Err(e) => return Err(e),
        },
    };
    diagnostics.extend(parsed.diagnostics);

    let mut unit = Unit::new(source.as_str(), parsed.base, options.clone());
    let result = match mode {
        Mode::Check => check_unit(&mut unit, &parsed.script).map(|()| Vec::new()),
        Mode::Lower => lower_unit(&mut unit, &parsed.script),
    };
    let edits = match result {
        Ok(edits) => edits,
        Err(e) => {
            log::debug!("{}: {}", filename, e);
            diagnostics.push(e.to_diagnostic(parsed.file_id));
            return Ok(None);
        }
    };

    let code = apply_edits(&source, &edits)
        .with_context(|| format!("Failed to apply edits to {}", path.display()))?;
    Ok(Some(Lowered {
        code,
        edit_count: edits.len(),
    }))
}

/// Print diagnostics in the requested format: text on stderr, JSON lines
/// on stdout.
pub fn emit_diagnostics(
    diagnostics: &Diagnostics,
    cache: &SourceCache,
    output: Output,
) -> Result<()> {
    match output.format {
        OutputFormat::Text => {
            let stderr = std::io::stderr();
            let mut emitter = TerminalEmitter::new(stderr.lock(), output.use_color);
            emitter.emit_all(diagnostics, cache)?;
            emitter.emit_summary(diagnostics)?;
        }
        OutputFormat::Json => {
            let mut emitter = JsonEmitter::new(std::io::stdout().lock());
            emitter.emit_all(diagnostics, cache)?;
        }
    }
    Ok(())
}
