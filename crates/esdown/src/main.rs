//! esdown - ES6 to ES5 lowering
//!
//! CLI driver for lowering scripts and reporting lowering errors.

mod commands;
mod config;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};

/// Lower ES6 scripts to ES5
#[derive(Parser, Debug)]
#[command(name = "esdown")]
#[command(author, version, about = "Rewrite ES6 scripts as equivalent ES5")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// How a command should print.
#[derive(Clone, Copy, Debug)]
pub struct Output {
    pub format: OutputFormat,
    pub use_color: bool,
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Lower a script, or every script in a directory
    Lower(commands::lower::LowerArgs),

    /// Analyze scripts and report errors without writing output
    Check(commands::check::CheckArgs),

    /// Explain an error code
    Explain(commands::explain::ExplainArgs),
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp(None)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let output = Output {
        format: cli.format,
        use_color: !cli.no_color && !cli.quiet && atty::is(atty::Stream::Stdout),
        quiet: cli.quiet,
    };

    let Some(command) = cli.command else {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        cmd.print_help()?;
        println!();
        return Ok(());
    };

    match command {
        Commands::Lower(args) => commands::lower::run(args, output),
        Commands::Check(args) => commands::check::run(args, output),
        Commands::Explain(args) => commands::explain::run(args, output),
    }
}
