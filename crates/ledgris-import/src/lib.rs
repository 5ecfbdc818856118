//! Import pipeline for legacy Grisbi XML exports.
//!
//! [`ExportDocument`] parses the XML into an element tree; [`run_import`]
//! walks it in five stages (payees, categories, currencies, accounts,
//! transactions) and commits normalized rows into a
//! [`ledgris_store::LedgerStore`]. Long imports can be cancelled
//! cooperatively through a [`CancelToken`] and observed through a
//! [`ProgressSink`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cancel;
pub mod document;
pub mod pipeline;
pub mod progress;

pub use cancel::CancelToken;
pub use document::{DocumentError, ExportDocument, Node};
pub use pipeline::{import_file, run_import, ImportError, ImportOutcome};
pub use progress::{NullProgress, ProgressSink, TracingProgress};
