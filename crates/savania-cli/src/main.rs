//! # savania CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use savania_cli::check::{run_check, CheckArgs};
use savania_cli::export::{run_export, ExportArgs};
use savania_cli::scan::{run_scan, ScanArgs};
use savania_cli::stats::{run_stats, StatsArgs};

/// SAVANIA back-office operator tooling.
///
/// Works offline against a JSON store snapshot: contact export, dashboard
/// figures, input guard checks and snapshot validation.
#[derive(Parser, Debug)]
#[command(name = "savania", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Export contacts in a range of local days as semicolon CSV.
    Export(ExportArgs),

    /// Print the dashboard statistics for a day.
    Stats(StatsArgs),

    /// Screen text with the advisory input guard.
    Scan(ScanArgs),

    /// Decode every document in a snapshot and report failures.
    CheckSnapshot(CheckArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity level.
    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Export(args) => run_export(&args),
        Commands::Stats(args) => run_stats(&args),
        Commands::Scan(args) => run_scan(&args),
        Commands::CheckSnapshot(args) => run_check(&args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}
