//! ledgris - import, check, and report on legacy Grisbi exports.

use clap::{Parser, Subcommand};
use std::process::ExitCode;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;

mod cmd;

/// Import and inspect legacy Grisbi XML exports.
#[derive(Parser, Debug)]
#[command(name = "ledgris", author, version, about, long_about = None)]
struct Cli {
    /// Show verbose output including timing information
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Import an export file and summarize what was stored
    Import(cmd::import::Args),
    /// Import an export file and run the consistency checker
    Check(cmd::check::Args),
    /// Import an export file and print time-bucketed totals
    Report(cmd::report::Args),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt()
            .with_max_level(Level::DEBUG)
            .with_span_events(FmtSpan::CLOSE)
            .init();
    }

    let result = match &cli.command {
        Command::Import(args) => cmd::import::run(args),
        Command::Check(args) => cmd::check::run(args),
        Command::Report(args) => cmd::report::run(args),
    };
    match result {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(2)
        }
    }
}
