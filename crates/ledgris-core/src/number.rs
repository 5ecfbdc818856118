//! Money parsing and rounding.
//!
//! The source document writes amounts with a comma decimal separator
//! ("1234,56"); all stored amounts are rounded half-even to two places.

use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;
use thiserror::Error;

/// Non-numeric text where a number was required.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid number '{text}'")]
pub struct NumberError {
    /// The offending text.
    pub text: String,
}

/// Parse a decimal, accepting ',' as the decimal separator.
///
/// # Errors
///
/// Returns [`NumberError`] if the text is not a number.
pub fn parse_decimal(text: &str) -> Result<Decimal, NumberError> {
    let normalized = text.trim().replace(',', ".");
    Decimal::from_str(&normalized).map_err(|_| NumberError {
        text: text.to_string(),
    })
}

/// Round to two decimal places, ties to even (banker's rounding).
#[must_use]
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven)
}

/// Parse a monetary amount: comma-decimal text, rounded half-even to 2dp.
///
/// # Errors
///
/// Returns [`NumberError`] if the text is not a number.
pub fn parse_money(text: &str) -> Result<Decimal, NumberError> {
    parse_decimal(text).map(round_money)
}
