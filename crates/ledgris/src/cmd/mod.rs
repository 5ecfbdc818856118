//! Command implementations.
//!
//! Each module owns one subcommand: its clap arguments and its `run`
//! function. The shared import plumbing lives here.

use anyhow::{Context, Result};
use ledgris_import::{run_import, CancelToken, ExportDocument, ImportOutcome, NullProgress,
    ProgressSink};
use ledgris_store::LedgerStore;
use std::path::Path;
use std::thread;

pub mod check;
pub mod import;
pub mod report;

/// Prints progress messages to stderr, keeping stdout for results.
struct ConsoleProgress;

impl ProgressSink for ConsoleProgress {
    fn report(&self, message: &str) {
        eprintln!("{message}");
    }
}

/// Parse `file` and import it on a dedicated worker thread, keeping the
/// pipeline off the calling thread per its concurrency contract.
///
/// The CLI wires no cancellation trigger, so the worker's token is never
/// set and a finished run is always a completed one.
pub(crate) fn load_ledger(file: &Path, quiet: bool) -> Result<(LedgerStore, ImportOutcome)> {
    let doc = ExportDocument::from_file(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let source = file.display().to_string();

    let worker = thread::spawn(move || {
        let mut store = LedgerStore::new();
        let progress: Box<dyn ProgressSink> = if quiet {
            Box::new(NullProgress)
        } else {
            Box::new(ConsoleProgress)
        };
        let cancel = CancelToken::new();
        let result = run_import(&mut store, &doc, &source, &cancel, progress.as_ref());
        (store, result)
    });
    let (store, result) = worker
        .join()
        .map_err(|_| anyhow::anyhow!("import worker panicked"))?;

    let outcome = result.with_context(|| format!("import of {} failed", file.display()))?;
    Ok((store, outcome))
}
