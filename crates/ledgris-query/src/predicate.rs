//! Typed predicate fragments and their composition rules.
//!
//! The engine never builds ad hoc filter closures: every query is an
//! ordered, ANDed list of [`Predicate`] values produced by [`compose`], so
//! the precedence rules are auditable and testable without a store full of
//! data.

use crate::SearchCriteria;
use chrono::NaiveDate;
use ledgris_core::{AccountId, CategoryId, CurrencyId, PayeeId, Transaction};
use ledgris_store::LedgerStore;
use rust_decimal::Decimal;

/// One filter fragment over a transaction row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// The owning account must be active.
    ActiveAccount,
    /// The owning account is one of these.
    AccountIn(Vec<AccountId>),
    /// The owning account is denominated in this currency.
    AccountCurrency(CurrencyId),
    /// Only top-level transactions; breakdown children are invisible to
    /// aggregates.
    TopLevelOnly,
    /// Value date on or after this date.
    NotBefore(NaiveDate),
    /// Value date on or before this date.
    NotAfter(NaiveDate),
    /// Category is one of these.
    CategoryIn(Vec<CategoryId>),
    /// Payee is one of these.
    PayeeIn(Vec<PayeeId>),
    /// Category is not this one (transfer exclusion).
    NotCategory(CategoryId),
    /// Comment contains any of these lowercase keywords (OR semantics).
    KeywordAny(Vec<String>),
    /// Amount strictly positive (income).
    AmountPositive,
    /// Amount strictly negative (expense).
    AmountNegative,
}

impl Predicate {
    /// Whether `transaction` satisfies this fragment.
    #[must_use]
    pub fn matches(&self, store: &LedgerStore, transaction: &Transaction) -> bool {
        match self {
            Self::ActiveAccount => store
                .account(transaction.account)
                .is_some_and(|account| account.active),
            Self::AccountIn(accounts) => accounts.contains(&transaction.account),
            Self::AccountCurrency(currency) => store
                .account(transaction.account)
                .is_some_and(|account| account.currency == *currency),
            Self::TopLevelOnly => transaction.is_top_level(),
            Self::NotBefore(date) => transaction.date >= *date,
            Self::NotAfter(date) => transaction.date <= *date,
            Self::CategoryIn(categories) => categories.contains(&transaction.category),
            Self::PayeeIn(payees) => payees.contains(&transaction.payee),
            Self::NotCategory(category) => transaction.category != *category,
            Self::KeywordAny(keywords) => {
                let comment = transaction.comment.to_lowercase();
                keywords.iter().any(|keyword| comment.contains(keyword))
            }
            Self::AmountPositive => transaction.amount > Decimal::ZERO,
            Self::AmountNegative => transaction.amount < Decimal::ZERO,
        }
    }
}

/// Which optional parts of the criteria a query applies.
///
/// Aggregates differ only in these flags: a total-income query ignores the
/// category/payee/keyword filters by design, a point-in-time balance drops
/// the start bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanOptions {
    /// Apply the period's start date as a lower bound.
    pub start_bound: bool,
    /// Apply the period's end date as an upper bound.
    pub end_bound: bool,
    /// Apply the category filter if present.
    pub categories: bool,
    /// Apply the payee filter if present.
    pub payees: bool,
    /// Apply the keyword filter if present.
    pub keywords: bool,
}

impl PlanOptions {
    /// Apply every filter the criteria carries.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            start_bound: true,
            end_bound: true,
            categories: true,
            payees: true,
            keywords: true,
        }
    }

    /// Date bounds only; category/payee/keyword filters are ignored.
    #[must_use]
    pub const fn bounds_only() -> Self {
        Self {
            start_bound: true,
            end_bound: true,
            categories: false,
            payees: false,
            keywords: false,
        }
    }

    /// Drop the start bound, keeping everything else.
    #[must_use]
    pub const fn without_start_bound(mut self) -> Self {
        self.start_bound = false;
        self
    }

    /// Drop both date bounds.
    #[must_use]
    pub const fn without_bounds(mut self) -> Self {
        self.start_bound = false;
        self.end_bound = false;
        self
    }
}

/// Compose the ordered predicate list for one query.
///
/// Rules, in order: active accounts only; accounts filter, else currency
/// filter; top-level only; date bounds per the options; category filter;
/// payee filter; transfer exclusion; keyword filter. `transfer` is the
/// synthetic transfer category's id, when one exists. `extra` is the
/// query-specific fragment (income/expense sign restriction).
#[must_use]
pub fn compose(
    criteria: &SearchCriteria,
    options: PlanOptions,
    extra: Option<Predicate>,
    transfer: Option<CategoryId>,
) -> Vec<Predicate> {
    let mut predicates = vec![Predicate::ActiveAccount];

    if !criteria.accounts.is_empty() {
        predicates.push(Predicate::AccountIn(criteria.accounts.clone()));
    } else if let Some(currency) = criteria.currency {
        predicates.push(Predicate::AccountCurrency(currency));
    }

    predicates.push(Predicate::TopLevelOnly);

    if let Some(period) = &criteria.period {
        if options.start_bound {
            predicates.push(Predicate::NotBefore(period.start()));
        }
        if options.end_bound {
            predicates.push(Predicate::NotAfter(period.end()));
        }
    }

    if options.categories && !criteria.categories.is_empty() {
        predicates.push(Predicate::CategoryIn(criteria.categories.clone()));
    }
    if options.payees && !criteria.payees.is_empty() {
        predicates.push(Predicate::PayeeIn(criteria.payees.clone()));
    }
    if !criteria.include_transfers {
        if let Some(transfer) = transfer {
            predicates.push(Predicate::NotCategory(transfer));
        }
    }
    if options.keywords && !criteria.keywords().is_empty() {
        predicates.push(Predicate::KeywordAny(criteria.keywords().to_vec()));
    }

    if let Some(extra) = extra {
        predicates.push(extra);
    }
    predicates
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accounts_filter_takes_precedence_over_currency() {
        let criteria = SearchCriteria::new()
            .with_currency(CurrencyId(1))
            .with_accounts([AccountId(3)]);
        let predicates = compose(&criteria, PlanOptions::all(), None, None);
        assert!(predicates.contains(&Predicate::AccountIn(vec![AccountId(3)])));
        assert!(!predicates
            .iter()
            .any(|p| matches!(p, Predicate::AccountCurrency(_))));
    }

    #[test]
    fn test_currency_filter_used_when_no_accounts() {
        let criteria = SearchCriteria::new().with_currency(CurrencyId(1));
        let predicates = compose(&criteria, PlanOptions::all(), None, None);
        assert!(predicates.contains(&Predicate::AccountCurrency(CurrencyId(1))));
    }

    #[test]
    fn test_bounds_only_ignores_entity_filters() {
        let criteria = SearchCriteria::new()
            .with_categories([CategoryId(7)])
            .with_payees([PayeeId(2)])
            .with_keywords(["rent"]);
        let predicates = compose(&criteria, PlanOptions::bounds_only(), None, None);
        assert_eq!(predicates, vec![Predicate::ActiveAccount, Predicate::TopLevelOnly]);
    }

    #[test]
    fn test_transfer_exclusion_only_when_requested() {
        let transfer = Some(CategoryId(1));
        let with = compose(
            &SearchCriteria::new().without_transfers(),
            PlanOptions::all(),
            None,
            transfer,
        );
        assert!(with.contains(&Predicate::NotCategory(CategoryId(1))));
        let without = compose(&SearchCriteria::new(), PlanOptions::all(), None, transfer);
        assert!(!without
            .iter()
            .any(|p| matches!(p, Predicate::NotCategory(_))));
    }

    #[test]
    fn test_extra_predicate_comes_last() {
        let predicates = compose(
            &SearchCriteria::new(),
            PlanOptions::all(),
            Some(Predicate::AmountPositive),
            None,
        );
        assert_eq!(predicates.last(), Some(&Predicate::AmountPositive));
    }
}
