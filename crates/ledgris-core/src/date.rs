//! Date parsing for the source document's "day/month/year" format.

use chrono::NaiveDate;
use thiserror::Error;

/// Malformed text where a "day/month/year" date was required.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid date '{text}', expected day/month/year")]
pub struct DateError {
    /// The offending text.
    pub text: String,
}

/// Parse a "day/month/year" date string.
///
/// # Errors
///
/// Returns [`DateError`] if the text does not parse as a valid date.
pub fn parse_date(text: &str) -> Result<NaiveDate, DateError> {
    NaiveDate::parse_from_str(text.trim(), "%d/%m/%Y").map_err(|_| DateError {
        text: text.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_day_month_year() {
        assert_eq!(
            parse_date("15/01/2024").unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
        );
        assert_eq!(
            parse_date("5/1/2024").unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 5).unwrap()
        );
    }

    #[test]
    fn test_parse_date_rejects_iso_order() {
        // Month 15 does not exist: the format is day-first.
        assert!(parse_date("2024/01/15").is_err());
    }

    #[test]
    fn test_parse_date_rejects_impossible_dates() {
        assert!(parse_date("31/02/2024").is_err());
        assert!(parse_date("").is_err());
        assert!(parse_date("soon").is_err());
    }
}
