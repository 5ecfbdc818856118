//! Aggregate and listing queries over the ledger store.

use crate::{compose, PlanOptions, Predicate, SearchCriteria};
use ledgris_core::{AccountId, CategoryId, CurrencyId, Transaction};
use ledgris_store::LedgerStore;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// Read-only query engine borrowing the store for its lifetime.
///
/// Every operation runs one synchronous pass over the transaction table;
/// time-bucketed views issue one query per bucket, sequentially.
#[derive(Debug, Clone, Copy)]
pub struct QueryEngine<'a> {
    store: &'a LedgerStore,
}

impl<'a> QueryEngine<'a> {
    /// Create an engine over `store`.
    #[must_use]
    pub const fn new(store: &'a LedgerStore) -> Self {
        Self { store }
    }

    fn transfer_category(&self) -> Option<CategoryId> {
        self.store.special_categories().map(|s| s.transfer)
    }

    fn select<'p>(
        &self,
        predicates: &'p [Predicate],
    ) -> impl Iterator<Item = &'a Transaction> + 'p
    where
        'a: 'p,
    {
        let store = self.store;
        store
            .transactions()
            .filter(move |transaction| predicates.iter().all(|p| p.matches(store, transaction)))
    }

    fn sum(&self, predicates: &[Predicate]) -> Decimal {
        self.select(predicates).map(|t| t.amount).sum()
    }

    /// Sum of positive amounts. Ignores the category/payee/keyword filters
    /// by design; only account/currency restriction and date bounds apply.
    #[must_use]
    pub fn total_income(&self, criteria: &SearchCriteria) -> Decimal {
        let predicates = compose(
            criteria,
            PlanOptions::bounds_only(),
            Some(Predicate::AmountPositive),
            self.transfer_category(),
        );
        self.sum(&predicates)
    }

    /// Sum of negative amounts, under the same filter rules as
    /// [`Self::total_income`].
    #[must_use]
    pub fn total_expenses(&self, criteria: &SearchCriteria) -> Decimal {
        let predicates = compose(
            criteria,
            PlanOptions::bounds_only(),
            Some(Predicate::AmountNegative),
            self.transfer_category(),
        );
        self.sum(&predicates)
    }

    /// Net balance over the period: income plus expenses.
    #[must_use]
    pub fn balance(&self, criteria: &SearchCriteria) -> Decimal {
        let predicates = compose(
            criteria,
            PlanOptions::bounds_only(),
            None,
            self.transfer_category(),
        );
        self.sum(&predicates)
    }

    /// Net amount per category over the period, honoring every filter.
    #[must_use]
    pub fn category_balances(&self, criteria: &SearchCriteria) -> BTreeMap<CategoryId, Decimal> {
        let predicates = compose(criteria, PlanOptions::all(), None, self.transfer_category());
        let mut totals = BTreeMap::new();
        for transaction in self.select(&predicates) {
            *totals.entry(transaction.category).or_insert(Decimal::ZERO) += transaction.amount;
        }
        totals
    }

    /// Point-in-time balance per account: everything up to the period's
    /// end, the start bound deliberately ignored.
    #[must_use]
    pub fn account_balances(&self, criteria: &SearchCriteria) -> BTreeMap<AccountId, Decimal> {
        let predicates = compose(
            criteria,
            PlanOptions::all().without_start_bound(),
            None,
            self.transfer_category(),
        );
        let mut totals = BTreeMap::new();
        for transaction in self.select(&predicates) {
            *totals.entry(transaction.account).or_insert(Decimal::ZERO) += transaction.amount;
        }
        totals
    }

    /// Sum of the stored balance of a currency's active accounts.
    ///
    /// Not a transaction query: reads the account rows directly. Used for
    /// verification against the transaction-derived totals.
    #[must_use]
    pub fn currency_total_balance(&self, currency: CurrencyId) -> Decimal {
        self.store
            .accounts()
            .filter(|account| account.active && account.currency == currency)
            .map(|account| account.balance)
            .sum()
    }

    /// Sum of one account's top-level transaction amounts, unbounded in
    /// time.
    #[must_use]
    pub fn account_total_balance(&self, account: AccountId) -> Decimal {
        let criteria = SearchCriteria::new().with_accounts([account]);
        let predicates = compose(
            &criteria,
            PlanOptions::bounds_only().without_bounds(),
            None,
            self.transfer_category(),
        );
        self.sum(&predicates)
    }

    /// List the matching transactions, honoring every filter, in id order.
    #[must_use]
    pub fn transactions(&self, criteria: &SearchCriteria) -> Vec<&'a Transaction> {
        let predicates = compose(criteria, PlanOptions::all(), None, self.transfer_category());
        let rows: Vec<&Transaction> = self.select(&predicates).collect();
        tracing::debug!(
            predicates = predicates.len(),
            rows = rows.len(),
            "transaction listing"
        );
        rows
    }
}
