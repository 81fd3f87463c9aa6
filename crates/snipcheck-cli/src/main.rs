//! snipcheck command-line tool
//!
//! Compiles the TypeScript code blocks of the current package's markdown
//! documentation and reports every block that fails to compile.

mod commands;
mod output;

use clap::Parser;
use commands::check::{self, CheckArgs};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "snipcheck")]
#[command(about = "Compile-check TypeScript snippets in markdown documentation", long_about = None)]
#[command(version)]
struct Cli {
    /// Documentation files or glob patterns (default: README.md)
    #[arg(long = "input-files", num_args = 1..)]
    input_files: Vec<String>,

    /// tsconfig to extend, relative to the package root
    #[arg(long)]
    project: Option<PathBuf>,

    /// TypeScript compiler executable
    #[arg(long)]
    tsc: Option<PathBuf>,

    /// Maximum parallel compilations
    #[arg(short, long)]
    jobs: Option<NonZeroUsize>,

    /// Compile script snippets without the isolating wrapper
    #[arg(long)]
    no_wrap: bool,

    /// Report format
    #[arg(long, default_value = "pretty", value_parser = ["pretty", "json"])]
    reporter: String,

    /// Color output
    #[arg(long, default_value = "auto", value_parser = ["auto", "always", "never"])]
    color: String,

    /// Log pipeline activity to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    check::execute(CheckArgs {
        input_files: cli.input_files,
        project: cli.project,
        tsc: cli.tsc,
        jobs: cli.jobs.map(NonZeroUsize::get),
        no_wrap: cli.no_wrap,
        reporter: cli.reporter,
        color: cli.color,
    })
}

/// `RUST_LOG` wins over the default level.
fn init_tracing(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
