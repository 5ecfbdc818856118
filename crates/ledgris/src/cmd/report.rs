//! The report subcommand: time-bucketed income/expense totals.

use anyhow::{Context, Result};
use clap::ValueEnum;
use ledgris_core::{parse_date, NaiveDate, PeriodKind, Periods};
use ledgris_query::{QueryEngine, SearchCriteria};
use serde::Serialize;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use super::load_ledger;
use crate::cmd::check::OutputFormat;

/// Calendar bucket size for the report.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum Bucket {
    /// One row per day
    Day,
    /// One row per ISO week (Monday to Sunday)
    Week,
    /// One row per calendar month (default)
    #[default]
    Month,
    /// One row per calendar year
    Year,
    /// A single row covering the whole range
    Free,
}

impl From<Bucket> for PeriodKind {
    fn from(bucket: Bucket) -> Self {
        match bucket {
            Bucket::Day => Self::Day,
            Bucket::Week => Self::Week,
            Bucket::Month => Self::Month,
            Bucket::Year => Self::Year,
            Bucket::Free => Self::Free,
        }
    }
}

/// Arguments for `ledgris report`.
#[derive(clap::Args, Debug)]
pub struct Args {
    /// The export file to import and report on
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Bucket size
    #[arg(long, short = 'u', value_enum, default_value = "month")]
    pub unit: Bucket,

    /// First date to report, day/month/year; defaults to the earliest
    /// transaction
    #[arg(long, value_name = "DATE")]
    pub from: Option<String>,

    /// Last date to report, day/month/year; defaults to the latest
    /// transaction
    #[arg(long, value_name = "DATE")]
    pub to: Option<String>,

    /// Suppress progress output
    #[arg(short, long)]
    pub quiet: bool,

    /// Output format (text or json)
    #[arg(long, short = 'f', value_enum, default_value = "text")]
    pub format: OutputFormat,
}

/// One bucket's totals in JSON form; amounts are decimal strings.
#[derive(Debug, Serialize)]
struct JsonRow {
    start: NaiveDate,
    end: NaiveDate,
    income: String,
    expenses: String,
    balance: String,
}

/// Run the report subcommand.
///
/// # Errors
///
/// Unreadable file, import failure, or an unparseable `--from`/`--to`.
pub fn run(args: &Args) -> Result<ExitCode> {
    let (store, _) = load_ledger(&args.file, args.quiet)?;
    let mut stdout = io::stdout().lock();

    let Some(range) = transaction_range(&store) else {
        writeln!(stdout, "no transactions to report")?;
        return Ok(ExitCode::SUCCESS);
    };
    let start = match &args.from {
        Some(text) => parse_date(text).with_context(|| format!("invalid --from '{text}'"))?,
        None => range.0,
    };
    let end = match &args.to {
        Some(text) => parse_date(text).with_context(|| format!("invalid --to '{text}'"))?,
        None => range.1,
    };

    let periods = Periods::new(start, end, args.unit.into())
        .with_context(|| format!("cannot bucket {start} to {end}"))?;
    let engine = QueryEngine::new(&store);

    // One query per bucket, sequentially.
    let mut rows = Vec::with_capacity(periods.len());
    for period in &periods {
        let criteria = SearchCriteria::new().with_period(*period);
        rows.push(JsonRow {
            start: period.start(),
            end: period.end(),
            income: engine.total_income(&criteria).to_string(),
            expenses: engine.total_expenses(&criteria).to_string(),
            balance: engine.balance(&criteria).to_string(),
        });
    }

    match args.format {
        OutputFormat::Json => {
            writeln!(stdout, "{}", serde_json::to_string_pretty(&rows)?)?;
        }
        OutputFormat::Text => {
            writeln!(
                stdout,
                "{:<12} {:<12} {:>14} {:>14} {:>14}",
                "start", "end", "income", "expenses", "balance"
            )?;
            for row in &rows {
                writeln!(
                    stdout,
                    "{:<12} {:<12} {:>14} {:>14} {:>14}",
                    row.start.to_string(),
                    row.end.to_string(),
                    row.income,
                    row.expenses,
                    row.balance
                )?;
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Earliest and latest transaction dates, if any transactions exist.
fn transaction_range(store: &ledgris_store::LedgerStore) -> Option<(NaiveDate, NaiveDate)> {
    let mut dates = store.transactions().map(|t| t.date);
    let first = dates.next()?;
    let (min, max) = dates.fold((first, first), |(min, max), date| {
        (min.min(date), max.max(date))
    });
    Some((min, max))
}
