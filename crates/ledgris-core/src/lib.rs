//! Core types for ledgris
//!
//! This crate provides the fundamental types used throughout the ledgris
//! project:
//!
//! - Entity types for the normalized ledger: [`Currency`], [`Account`],
//!   [`Category`], [`Payee`], [`Transaction`], [`ImportLog`]
//! - Money parsing with comma decimal separators and half-even rounding
//! - Day-first date parsing for the legacy export format
//! - [`Period`] / [`Periods`] - validated calendar buckets for
//!   time-segmented queries
//!
//! # Example
//!
//! ```
//! use ledgris_core::{parse_money, Period, PeriodKind, Periods};
//! use chrono::NaiveDate;
//!
//! let amount = parse_money("1234,565").unwrap();
//! assert_eq!(amount.to_string(), "1234.56");
//!
//! let start = NaiveDate::from_ymd_opt(2006, 5, 20).unwrap();
//! let end = NaiveDate::from_ymd_opt(2006, 7, 2).unwrap();
//! let buckets = Periods::new(start, end, PeriodKind::Month).unwrap();
//! assert_eq!(buckets.len(), 3);
//! assert!(buckets.periods().iter().all(|p| p.kind() == PeriodKind::Month));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod date;
pub mod entity;
pub mod number;
pub mod period;

pub use date::{parse_date, DateError};
pub use entity::{
    Account, AccountId, Category, CategoryId, CategoryKey, Currency, CurrencyId, ImportLog, Payee,
    PayeeId, Transaction, TransactionId, BREAKDOWN_OF_TRANSACTIONS, NO_CATEGORY, NO_PAYEE,
    NO_PAYEE_ID, NO_SUB_CATEGORY, TRANSFER,
};
pub use number::{parse_decimal, parse_money, round_money, NumberError};
pub use period::{Period, PeriodError, PeriodKind, Periods};

// Re-export commonly used external types
pub use chrono::NaiveDate;
pub use rust_decimal::Decimal;
