//! Calendar segmentation.
//!
//! A [`Period`] is an immutable, validated date range that covers exactly one
//! whole calendar unit (or is free-form). [`Periods`] partitions an arbitrary
//! range into a gap-free sequence of such units, one query bucket each.

use chrono::{Datelike, Days, Months, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};
use thiserror::Error;

/// The calendar unit a period covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PeriodKind {
    /// A single day.
    Day,
    /// Monday through the following Sunday.
    Week,
    /// First through last day of one month.
    Month,
    /// January 1 through December 31 of one year.
    Year,
    /// Arbitrary range, no calendar constraint.
    Free,
}

impl PeriodKind {
    /// Lowercase name, for display.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
            Self::Year => "year",
            Self::Free => "free",
        }
    }
}

/// Invalid arguments to a period constructor or setter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PeriodError {
    /// The start date lies after the end date.
    #[error("period start {start} is after end {end}")]
    StartAfterEnd {
        /// Requested start date.
        start: NaiveDate,
        /// Requested end date.
        end: NaiveDate,
    },
    /// The range is not one whole calendar unit of the requested kind.
    #[error("{start}..{end} is not a whole {} period", kind.name())]
    NotFullUnit {
        /// Requested start date.
        start: NaiveDate,
        /// Requested end date.
        end: NaiveDate,
        /// Requested kind.
        kind: PeriodKind,
    },
}

/// A validated calendar period.
///
/// Construction validates atomically: a non-[`Free`](PeriodKind::Free)
/// period must cover exactly one whole unit of its kind. Fields cannot be
/// changed individually; the `with_*` methods re-validate the full triple.
///
/// Equality and hashing compare the start date only; two periods produced
/// by the same segmentation never share a start, and that is the dedup rule.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Period {
    start: NaiveDate,
    end: NaiveDate,
    kind: PeriodKind,
}

impl PartialEq for Period {
    fn eq(&self, other: &Self) -> bool {
        self.start == other.start
    }
}

impl Eq for Period {}

impl Hash for Period {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.start.hash(state);
    }
}

impl Period {
    /// Create a validated period.
    ///
    /// # Errors
    ///
    /// [`PeriodError::StartAfterEnd`] if `start > end`;
    /// [`PeriodError::NotFullUnit`] if the range is not one whole unit of
    /// `kind`.
    pub fn new(start: NaiveDate, end: NaiveDate, kind: PeriodKind) -> Result<Self, PeriodError> {
        validate(start, end, kind)?;
        Ok(Self { start, end, kind })
    }

    /// First day of the period.
    #[must_use]
    pub const fn start(&self) -> NaiveDate {
        self.start
    }

    /// Last day of the period (inclusive).
    #[must_use]
    pub const fn end(&self) -> NaiveDate {
        self.end
    }

    /// The calendar unit.
    #[must_use]
    pub const fn kind(&self) -> PeriodKind {
        self.kind
    }

    /// Whether `date` falls inside the period (inclusive on both ends).
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Replace the start date, re-validating the whole triple.
    ///
    /// # Errors
    ///
    /// Same as [`Period::new`].
    pub fn with_start(self, start: NaiveDate) -> Result<Self, PeriodError> {
        Self::new(start, self.end, self.kind)
    }

    /// Replace the end date, re-validating the whole triple.
    ///
    /// # Errors
    ///
    /// Same as [`Period::new`].
    pub fn with_end(self, end: NaiveDate) -> Result<Self, PeriodError> {
        Self::new(self.start, end, self.kind)
    }

    /// Replace the kind, re-validating the whole triple.
    ///
    /// # Errors
    ///
    /// Same as [`Period::new`].
    pub fn with_kind(self, kind: PeriodKind) -> Result<Self, PeriodError> {
        Self::new(self.start, self.end, kind)
    }
}

fn validate(start: NaiveDate, end: NaiveDate, kind: PeriodKind) -> Result<(), PeriodError> {
    if start > end {
        return Err(PeriodError::StartAfterEnd { start, end });
    }
    let full = match kind {
        PeriodKind::Free => true,
        PeriodKind::Day => start == end,
        PeriodKind::Week => start.weekday() == Weekday::Mon && end == unit_end(start, kind),
        PeriodKind::Month => start.day() == 1 && end == unit_end(start, kind),
        PeriodKind::Year => {
            start.month() == 1 && start.day() == 1 && end == unit_end(start, kind)
        }
    };
    if full {
        Ok(())
    } else {
        Err(PeriodError::NotFullUnit { start, end, kind })
    }
}

/// First day of the calendar unit containing `date`. Identity for
/// [`PeriodKind::Day`] and [`PeriodKind::Free`].
fn unit_start(date: NaiveDate, kind: PeriodKind) -> NaiveDate {
    match kind {
        PeriodKind::Day | PeriodKind::Free => date,
        PeriodKind::Week => date
            .checked_sub_days(Days::new(u64::from(date.weekday().num_days_from_monday())))
            .expect("date arithmetic"),
        PeriodKind::Month => date.with_day(1).expect("first of month"),
        PeriodKind::Year => {
            NaiveDate::from_ymd_opt(date.year(), 1, 1).expect("first of year")
        }
    }
}

/// Last day of the calendar unit containing `date`.
fn unit_end(date: NaiveDate, kind: PeriodKind) -> NaiveDate {
    match kind {
        PeriodKind::Day | PeriodKind::Free => date,
        PeriodKind::Week => unit_start(date, kind)
            .checked_add_days(Days::new(6))
            .expect("date arithmetic"),
        PeriodKind::Month => unit_start(date, kind)
            .checked_add_months(Months::new(1))
            .and_then(|d| d.pred_opt())
            .expect("last of month"),
        PeriodKind::Year => {
            NaiveDate::from_ymd_opt(date.year(), 12, 31).expect("last of year")
        }
    }
}

/// Advance a unit-start cursor by exactly one unit.
fn advance(date: NaiveDate, kind: PeriodKind) -> NaiveDate {
    match kind {
        PeriodKind::Day | PeriodKind::Free => {
            date.checked_add_days(Days::new(1)).expect("date arithmetic")
        }
        PeriodKind::Week => date.checked_add_days(Days::new(7)).expect("date arithmetic"),
        PeriodKind::Month => date
            .checked_add_months(Months::new(1))
            .expect("date arithmetic"),
        PeriodKind::Year => date
            .checked_add_months(Months::new(12))
            .expect("date arithmetic"),
    }
}

/// A gap-free partition of a date range into whole calendar units.
///
/// The requested range is widened outward to unit boundaries (the start down
/// to the first day of its unit, the end up to the last), then one period is
/// emitted per unit. [`PeriodKind::Free`] emits exactly one period over the
/// original, unadjusted range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Periods {
    periods: Vec<Period>,
}

impl Periods {
    /// Decompose `[start, end]` into full periods of `kind`.
    ///
    /// # Errors
    ///
    /// [`PeriodError::StartAfterEnd`] if `start > end`.
    pub fn new(start: NaiveDate, end: NaiveDate, kind: PeriodKind) -> Result<Self, PeriodError> {
        if start > end {
            return Err(PeriodError::StartAfterEnd { start, end });
        }
        if kind == PeriodKind::Free {
            return Ok(Self {
                periods: vec![Period::new(start, end, kind)?],
            });
        }

        let last = unit_end(end, kind);
        let mut periods = Vec::new();
        let mut cursor = unit_start(start, kind);
        while cursor <= last {
            periods.push(Period::new(cursor, unit_end(cursor, kind), kind)?);
            cursor = advance(cursor, kind);
        }

        // Violations here are construction bugs, not runtime conditions.
        debug_assert!(!periods.is_empty());
        debug_assert!(periods.windows(2).all(|w| w[0].start() < w[1].start()));
        Ok(Self { periods })
    }

    /// The periods, in chronological order.
    #[must_use]
    pub fn periods(&self) -> &[Period] {
        &self.periods
    }

    /// Iterate over the periods.
    pub fn iter(&self) -> std::slice::Iter<'_, Period> {
        self.periods.iter()
    }

    /// Number of periods.
    #[must_use]
    pub fn len(&self) -> usize {
        self.periods.len()
    }

    /// A segmentation is never empty; kept for API symmetry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }
}

impl<'a> IntoIterator for &'a Periods {
    type Item = &'a Period;
    type IntoIter = std::slice::Iter<'a, Period>;

    fn into_iter(self) -> Self::IntoIter {
        self.periods.iter()
    }
}
