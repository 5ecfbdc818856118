//! The check subcommand: import and reconcile balances.

use anyhow::Result;
use clap::ValueEnum;
use serde::Serialize;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use super::load_ledger;

/// Output format for results.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output (default)
    #[default]
    Text,
    /// JSON output for tooling integration
    Json,
}

/// Arguments for `ledgris check`.
#[derive(clap::Args, Debug)]
pub struct Args {
    /// The export file to import and check
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Suppress progress output
    #[arg(short, long)]
    pub quiet: bool,

    /// Output format (text or json)
    #[arg(long, short = 'f', value_enum, default_value = "text")]
    pub format: OutputFormat,
}

/// One mismatch in JSON form; values are decimal strings.
#[derive(Debug, Serialize)]
struct JsonFinding {
    subject: String,
    left: String,
    left_value: String,
    right: String,
    right_value: String,
}

#[derive(Debug, Serialize)]
struct JsonReport {
    passed: bool,
    findings: Vec<JsonFinding>,
}

/// Run the check subcommand. Exit code 1 signals an inconsistent ledger.
///
/// # Errors
///
/// Unreadable file or any import failure.
pub fn run(args: &Args) -> Result<ExitCode> {
    let (store, _) = load_ledger(&args.file, args.quiet)?;
    let report = ledgris_check::check(&store);

    let mut stdout = io::stdout().lock();
    match args.format {
        OutputFormat::Json => {
            let json = JsonReport {
                passed: report.passed(),
                findings: report
                    .findings()
                    .iter()
                    .map(|f| JsonFinding {
                        subject: f.subject.clone(),
                        left: f.left.to_string(),
                        left_value: f.left_value.to_string(),
                        right: f.right.to_string(),
                        right_value: f.right_value.to_string(),
                    })
                    .collect(),
            };
            writeln!(stdout, "{}", serde_json::to_string_pretty(&json)?)?;
        }
        OutputFormat::Text => {
            if report.passed() {
                writeln!(
                    stdout,
                    "consistency check passed ({} accounts, {} currencies)",
                    store.account_count(),
                    store.currency_count()
                )?;
            } else {
                for finding in report.findings() {
                    writeln!(stdout, "mismatch: {finding}")?;
                }
            }
        }
    }

    if report.passed() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
