//! The import subcommand: load an export and summarize the ledger.

use anyhow::Result;
use ledgris_check::check;
use ledgris_store::LedgerStore;
use serde::Serialize;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use super::load_ledger;
use crate::cmd::check::OutputFormat;

/// Arguments for `ledgris import`.
#[derive(clap::Args, Debug)]
pub struct Args {
    /// The export file to import
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Suppress progress output
    #[arg(short, long)]
    pub quiet: bool,

    /// Skip the post-import consistency check
    #[arg(long)]
    pub no_check: bool,

    /// Output format (text or json)
    #[arg(long, short = 'f', value_enum, default_value = "text")]
    pub format: OutputFormat,
}

/// Table sizes after a completed import.
#[derive(Debug, Serialize)]
struct Summary {
    source: String,
    duration_ms: u64,
    currencies: usize,
    accounts: usize,
    categories: usize,
    payees: usize,
    transactions: usize,
    consistent: Option<bool>,
}

impl Summary {
    fn new(store: &LedgerStore, source: String, duration_ms: u64) -> Self {
        Self {
            source,
            duration_ms,
            currencies: store.currency_count(),
            accounts: store.account_count(),
            categories: store.category_count(),
            payees: store.payee_count(),
            transactions: store.transaction_count(),
            consistent: None,
        }
    }
}

/// Run the import subcommand.
///
/// # Errors
///
/// Unreadable file, any import failure, or a cancelled run.
pub fn run(args: &Args) -> Result<ExitCode> {
    let (store, outcome) = load_ledger(&args.file, args.quiet)?;
    let duration_ms = u64::try_from(outcome.duration.as_millis()).unwrap_or(u64::MAX);

    let mut summary = Summary::new(&store, args.file.display().to_string(), duration_ms);
    if !args.no_check {
        summary.consistent = Some(check(&store).passed());
    }

    let mut stdout = io::stdout().lock();
    match args.format {
        OutputFormat::Json => {
            writeln!(stdout, "{}", serde_json::to_string_pretty(&summary)?)?;
        }
        OutputFormat::Text => {
            writeln!(stdout, "imported {} in {duration_ms} ms", summary.source)?;
            writeln!(stdout, "  currencies:   {}", summary.currencies)?;
            writeln!(stdout, "  accounts:     {}", summary.accounts)?;
            writeln!(stdout, "  categories:   {}", summary.categories)?;
            writeln!(stdout, "  payees:       {}", summary.payees)?;
            writeln!(stdout, "  transactions: {}", summary.transactions)?;
            if let Some(consistent) = summary.consistent {
                writeln!(
                    stdout,
                    "  consistency:  {}",
                    if consistent { "ok" } else { "MISMATCH" }
                )?;
            }
        }
    }

    if summary.consistent == Some(false) {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
