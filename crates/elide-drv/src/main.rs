//! Elide CLI - runs the GC barrier elision pass over method descriptions.
//!
//! It uses clap for argument parsing, loads the pass configuration, and
//! dispatches to the command handlers.

mod analyze;
mod config;
mod error;
mod input;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use elide_opt::ElisionMode;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use analyze::{run_analyze, AnalyzeArgs};
use config::Config;
use error::{DriverError, Result};

/// Elide - GC barrier elision for JIT-compiled methods
///
/// Reads methods as JSON memory-op graphs, decides which collector barriers
/// are redundant, and reports required versus elided barrier counts.
#[derive(Parser, Debug)]
#[command(name = "elide")]
#[command(author = "Elide Team")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "GC barrier elision for JIT-compiled methods", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true, env = "ELIDE_VERBOSE")]
    verbose: bool,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "ELIDE_CONFIG")]
    config: Option<PathBuf>,

    /// Disable color output
    #[arg(long, global = true, env = "ELIDE_NO_COLOR")]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands for the elide CLI.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Analyze method descriptions
    ///
    /// Runs the pass over every file in parallel and prints one report per
    /// method, plus a total when more than one method was analyzed.
    Analyze(AnalyzeCommand),
}

/// Arguments for the analyze subcommand.
#[derive(Parser, Debug)]
struct AnalyzeCommand {
    /// Method description files (JSON)
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Print reports as JSON
    #[arg(long)]
    json: bool,

    /// Print each annotated graph after its report
    #[arg(long)]
    dump: bool,

    /// Decision formulation (dataflow, dominators)
    #[arg(short, long)]
    mode: Option<ElisionMode>,

    /// Cross-check the dominator formulation against the dataflow one
    #[arg(long)]
    verify: bool,

    /// Read barriers stay valid across safepoints
    #[arg(long)]
    read_survives_safepoint: bool,

    /// Write barriers stay valid across safepoints
    #[arg(long)]
    write_survives_safepoint: bool,

    /// A write barrier also satisfies a read barrier
    #[arg(long)]
    write_implies_read: bool,

    /// Treat fields of fresh allocations as barriered
    #[arg(long)]
    fresh_allocations: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.no_color)?;

    let config = Config::load(cli.config.as_deref()).context("failed to load configuration")?;

    execute_command(cli.command, config)
}

/// Initialize the logging system.
///
/// Output goes to stderr so reports on stdout stay machine-readable.
fn init_logging(verbose: bool, no_color: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    let subscriber = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(!no_color)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(subscriber)
        .try_init()
        .map_err(|e| DriverError::Config(format!("Failed to initialize logging: {}", e)))?;

    Ok(())
}

fn execute_command(command: Commands, config: Config) -> anyhow::Result<()> {
    match command {
        Commands::Analyze(args) => execute_analyze(args, config),
    }
}

/// Execute the analyze command.
fn execute_analyze(args: AnalyzeCommand, config: Config) -> anyhow::Result<()> {
    let analyze_args = AnalyzeArgs {
        files: args.files,
        json: args.json || config.json,
        dump: args.dump,
        mode: args.mode,
        verify: args.verify,
        read_survives_safepoint: args.read_survives_safepoint,
        write_survives_safepoint: args.write_survives_safepoint,
        write_implies_read: args.write_implies_read,
        fresh_allocations: args.fresh_allocations,
    };
    run_analyze(analyze_args, config.elision)
}
