//! Options from `esdown.toml` and the command line.

use anyhow::{anyhow, bail, Context, Result};
use clap::Args;
use esdown_scope::{env, Options};
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG: &str = "esdown.toml";

#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Config file (defaults to ./esdown.toml when present)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Reject `var` declarations
    #[arg(long)]
    pub disallow_vars: bool,

    /// Report names that resolve to no declaration or known global
    #[arg(long)]
    pub disallow_unknown_references: bool,

    /// Add an environment preset (browser, node, worker, test)
    #[arg(long = "env", value_name = "NAME")]
    pub environments: Vec<String>,

    /// Declare a global; append `:rw` to make it writable
    #[arg(long = "global", value_name = "NAME[:rw]")]
    pub globals: Vec<String>,
}

impl ConfigArgs {
    /// Config file first, command-line flags on top.
    pub fn load(&self) -> Result<Options> {
        let mut options = match &self.config {
            Some(path) => read_config(path)?,
            None if Path::new(DEFAULT_CONFIG).is_file() => read_config(Path::new(DEFAULT_CONFIG))?,
            None => Options::default(),
        };
        self.apply(&mut options)?;
        validate(&options)?;
        Ok(options)
    }

    fn apply(&self, options: &mut Options) -> Result<()> {
        options.disallow_vars |= self.disallow_vars;
        options.disallow_unknown_references |= self.disallow_unknown_references;
        for name in &self.environments {
            if !options.environments.contains(name) {
                options.environments.push(name.clone());
            }
        }
        for entry in &self.globals {
            let (name, writable) = parse_global(entry)?;
            options.globals.insert(name, writable);
        }
        Ok(())
    }
}

fn read_config(path: &Path) -> Result<Options> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let options = toml::from_str(&text)
        .with_context(|| format!("Invalid config {}", path.display()))?;
    log::info!("using config {}", path.display());
    Ok(options)
}

/// `NAME` or `NAME:rw`.
fn parse_global(entry: &str) -> Result<(String, bool)> {
    let (name, writable) = match entry.split_once(':') {
        Some((name, "rw")) => (name, true),
        Some((name, "ro")) => (name, false),
        Some((_, flag)) => bail!("Unknown global flag `{}` in `{}` (expected rw or ro)", flag, entry),
        None => (entry, false),
    };
    if name.is_empty() {
        return Err(anyhow!("Empty global name in `{}`", entry));
    }
    Ok((name.to_string(), writable))
}

fn validate(options: &Options) -> Result<()> {
    for name in &options.environments {
        if env::preset(name).is_none() {
            bail!(
                "Unknown environment `{}` (known: {})",
                name,
                env::preset_names().join(", ")
            );
        }
    }
    Ok(())
}
