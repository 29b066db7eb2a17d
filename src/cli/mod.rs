//! Command-line interface for context-scout.
//!
//! `select` runs the full scoring pipeline against a project directory;
//! `override` and `outcome` feed corrections back into the learning
//! store; `search` queries the text index; `info` shows scan statistics.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod feedback;
mod info;
mod search;
mod select;
mod utils;

/// Recommend the files most relevant to an engineering task
#[derive(Parser)]
#[command(name = "context-scout")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging (sets log level to DEBUG)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Score a project's files against a task and select under budget
    Select(select::SelectArgs),

    /// Record explicit file overrides for a previous session
    Override(feedback::OverrideArgs),

    /// Report whether a session's selection worked out
    Outcome(feedback::OutcomeArgs),

    /// Search file contents with the lightweight text index
    Search(search::SearchArgs),

    /// Show scan statistics for a project directory
    Info(info::InfoArgs),
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG always takes precedence; --verbose falls back to DEBUG.
    let filter = if cli.verbose {
        EnvFilter::from_default_env().add_directive(Level::DEBUG.into())
    } else {
        EnvFilter::from_default_env().add_directive(Level::WARN.into())
    };
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();

    match cli.command {
        Commands::Select(args) => select::run(args),
        Commands::Override(args) => feedback::run_override(args),
        Commands::Outcome(args) => feedback::run_outcome(args),
        Commands::Search(args) => search::run(args),
        Commands::Info(args) => info::run(args),
    }
}
