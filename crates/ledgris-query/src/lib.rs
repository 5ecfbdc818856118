//! Filter and aggregation queries over the ledgris ledger.
//!
//! A [`SearchCriteria`] value describes what to look at; [`compose`] turns
//! it into an ordered list of typed [`Predicate`] fragments under
//! caller-chosen [`PlanOptions`]; [`QueryEngine`] runs the composed plan
//! against a [`ledgris_store::LedgerStore`] and returns totals, breakdowns,
//! or transaction listings.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod criteria;
pub mod engine;
pub mod predicate;

pub use criteria::SearchCriteria;
pub use engine::QueryEngine;
pub use predicate::{compose, PlanOptions, Predicate};
