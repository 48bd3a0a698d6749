//! Daily LOTUS: a natural product occurrence a day, and a follow-up when
//! Wikidata changes underneath it.
//!
//! # Usage
//!
//! ```text
//! daily-lotus post [--dry-run] [--use-cache]
//! daily-lotus check-edits [--dry-run]
//! daily-lotus candidates
//! daily-lotus status [--json]
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    candidates::CandidatesArgs, check_edits::CheckEditsArgs, post::PostArgs, status::StatusArgs,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "daily-lotus",
    version,
    about = "Post a daily LOTUS occurrence and follow up on Wikidata edits",
    long_about = None,
)]
struct Cli {
    /// Log debug output (RUST_LOG takes precedence).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Publish today's occurrence.
    Post(PostArgs),

    /// Check published occurrences for edits and reply to changed ones.
    CheckEdits(CheckEditsArgs),

    /// Refresh the cached list of candidate compounds.
    Candidates(CandidatesArgs),

    /// Show the tracked records.
    Status(StatusArgs),
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.command {
        Commands::Post(args) => args.run(),
        Commands::CheckEdits(args) => args.run(),
        Commands::Candidates(args) => args.run(),
        Commands::Status(args) => args.run(),
    }
}
