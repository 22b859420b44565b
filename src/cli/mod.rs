//! Command-line interface for treeage
//!
//! Provides `classify`, `replay` and `graph` subcommands over a cached issues file.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod classify;
mod graph;
mod replay;
mod utils;

/// Triage GitHub issues with declarative dispatch rules
#[derive(Parser)]
#[command(name = "treeage")]
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
    /// Classify issues with a rules file, now or as of past dates
    Classify(classify::ClassifyArgs),

    /// Print issues as they were at a past instant
    Replay(replay::ReplayArgs),

    /// Print the dispatch graph built from a rules file as Graphviz DOT
    Graph(graph::GraphArgs),
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG in the environment always takes precedence; --verbose falls back to DEBUG.
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
        Commands::Classify(args) => classify::run(args),
        Commands::Replay(args) => replay::run(args),
        Commands::Graph(args) => graph::run(args),
    }
}
