//! Post-import consistency checking.
//!
//! Recomputes every active currency's and account's balance along
//! independent paths and reports any divergence. Findings are collected,
//! never thrown: an inconsistent ledger stays fully queryable, the report
//! just tells the operator what disagrees and by which two quantities.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use ledgris_query::{QueryEngine, SearchCriteria};
use ledgris_store::LedgerStore;
use rust_decimal::Decimal;
use std::fmt;

/// One balance disagreement: the subject and the two quantities compared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    /// What was checked, e.g. `currency 1 (Euro)`.
    pub subject: String,
    /// Name of the first quantity.
    pub left: &'static str,
    /// Its value.
    pub left_value: Decimal,
    /// Name of the second quantity.
    pub right: &'static str,
    /// Its value.
    pub right_value: Decimal,
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} = {} but {} = {}",
            self.subject, self.left, self.left_value, self.right, self.right_value
        )
    }
}

/// Outcome of a consistency run: pass/fail plus the individual findings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsistencyReport {
    findings: Vec<Finding>,
}

impl ConsistencyReport {
    /// Whether every compared quantity agreed.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.findings.is_empty()
    }

    /// The disagreements, in check order.
    #[must_use]
    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    fn compare(
        &mut self,
        subject: &str,
        left: &'static str,
        left_value: Decimal,
        right: &'static str,
        right_value: Decimal,
    ) {
        // Numeric equality; 245 and 245.00 agree.
        if left_value != right_value {
            tracing::warn!(
                subject,
                %left_value,
                %right_value,
                "consistency mismatch"
            );
            self.findings.push(Finding {
                subject: subject.to_string(),
                left,
                left_value,
                right,
                right_value,
            });
        }
    }
}

/// Check every active currency and every active account against
/// independently recomputed balances.
///
/// Per currency, three quantities must agree: the stored running balance,
/// the sum of its active accounts' stored balances, and the sum of its
/// top-level transactions plus its active accounts' initial amounts. Per
/// account: the stored balance, the aggregate transaction total plus the
/// initial amount, and the same total recomputed through the listing path.
#[must_use]
pub fn check(store: &LedgerStore) -> ConsistencyReport {
    let engine = QueryEngine::new(store);
    let mut report = ConsistencyReport::default();

    for currency in store.currencies().filter(|c| c.active) {
        let subject = format!("currency {} ({})", currency.id, currency.name);
        let stored = currency.balance;
        let from_accounts = engine.currency_total_balance(currency.id);
        let criteria = SearchCriteria::new().with_currency(currency.id);
        let initial: Decimal = store
            .accounts()
            .filter(|a| a.active && a.currency == currency.id)
            .map(|a| a.initial_amount)
            .sum();
        let from_transactions = engine.balance(&criteria) + initial;

        report.compare(
            &subject,
            "stored balance",
            stored,
            "sum of account balances",
            from_accounts,
        );
        report.compare(
            &subject,
            "stored balance",
            stored,
            "transactions plus initial amounts",
            from_transactions,
        );

        for account in store
            .accounts()
            .filter(|a| a.active && a.currency == currency.id)
        {
            let subject = format!("account {} ({})", account.id, account.name);
            let aggregate =
                engine.account_total_balance(account.id) + account.initial_amount;
            let listing_criteria = SearchCriteria::new().with_accounts([account.id]);
            let listed: Decimal = engine
                .transactions(&listing_criteria)
                .iter()
                .map(|t| t.amount)
                .sum();
            let listed = listed + account.initial_amount;

            report.compare(
                &subject,
                "stored balance",
                account.balance,
                "transactions plus initial amount",
                aggregate,
            );
            report.compare(
                &subject,
                "aggregate total",
                aggregate,
                "listing total",
                listed,
            );
        }
    }

    if report.passed() {
        tracing::info!("consistency check passed");
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use ledgris_core::{
        Account, AccountId, Currency, CurrencyId, Payee, Transaction, TransactionId, NO_PAYEE_ID,
    };
    use rust_decimal_macros::dec;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    /// One euro currency with two accounts whose stored balances match
    /// their transactions.
    fn consistent_store() -> LedgerStore {
        let mut store = LedgerStore::new();
        let mut euro = Currency::new(CurrencyId(1), "Euro", "€", "EUR");
        euro.active = true;
        euro.initial_amount = dec!(600.00);
        euro.balance = dec!(770.00);
        store.insert_currency(euro).unwrap();
        store
            .insert_account(Account::new(
                AccountId(1),
                "Checking",
                CurrencyId(1),
                dec!(100.00),
                dec!(250.00),
                true,
            ))
            .unwrap();
        store
            .insert_account(Account::new(
                AccountId(2),
                "Savings",
                CurrencyId(1),
                dec!(500.00),
                dec!(520.00),
                true,
            ))
            .unwrap();
        store.insert_payee(Payee::no_payee()).unwrap();
        let specials = store.ensure_special_categories();

        let rows = [
            (1, AccountId(1), dec!(2000.00)),
            (2, AccountId(1), dec!(-1850.00)),
            (3, AccountId(2), dec!(25.00)),
            (4, AccountId(2), dec!(-5.00)),
        ];
        for (id, account, amount) in rows {
            store
                .insert_transaction(Transaction::new(
                    TransactionId(id),
                    date(2024, 1, 15),
                    amount,
                    account,
                    specials.no_category,
                    NO_PAYEE_ID,
                ))
                .unwrap();
        }
        store
    }

    #[test]
    fn test_consistent_ledger_passes() {
        let store = consistent_store();
        let report = check(&store);
        assert!(report.passed(), "unexpected findings: {:?}", report.findings());
    }

    #[test]
    fn test_account_invariant_holds() {
        let store = consistent_store();
        let engine = QueryEngine::new(&store);
        for account in store.accounts() {
            assert_eq!(
                engine.account_total_balance(account.id) + account.initial_amount,
                account.balance
            );
        }
    }

    #[test]
    fn test_tampered_account_balance_is_reported() {
        let mut store = consistent_store();
        let mut broken = store.account(AccountId(1)).unwrap().clone();
        broken.balance = dec!(999.00);
        // Rebuild the store with the tampered row.
        let mut tampered = LedgerStore::new();
        tampered
            .insert_currency(store.currency(CurrencyId(1)).unwrap().clone())
            .unwrap();
        tampered.insert_account(broken).unwrap();
        tampered
            .insert_account(store.account(AccountId(2)).unwrap().clone())
            .unwrap();
        tampered.insert_payee(Payee::no_payee()).unwrap();
        let specials = tampered.ensure_special_categories();
        for row in store.transactions() {
            let mut row = row.clone();
            row.category = specials.no_category;
            tampered.insert_transaction(row).unwrap();
        }
        store = tampered;

        let report = check(&store);
        assert!(!report.passed());
        let finding = report
            .findings()
            .iter()
            .find(|f| f.subject.starts_with("account 1"))
            .unwrap();
        assert_eq!(finding.left_value, dec!(999.00));
        assert_eq!(finding.right_value, dec!(250.00));
    }

    #[test]
    fn test_tampered_currency_balance_is_reported() {
        let mut store = consistent_store();
        let mut euro = store.currency(CurrencyId(1)).unwrap().clone();
        euro.balance = dec!(1.00);
        store.replace_currency(euro).unwrap();

        let report = check(&store);
        assert!(!report.passed());
        assert!(report
            .findings()
            .iter()
            .any(|f| f.subject.starts_with("currency 1")));
    }

    #[test]
    fn test_scale_differences_still_agree() {
        // 245 vs 245.00 must not be a finding.
        let mut store = LedgerStore::new();
        let mut euro = Currency::new(CurrencyId(1), "Euro", "€", "EUR");
        euro.active = true;
        euro.balance = dec!(245);
        euro.initial_amount = dec!(245);
        store.insert_currency(euro).unwrap();
        store
            .insert_account(Account::new(
                AccountId(1),
                "Checking",
                CurrencyId(1),
                dec!(245.00),
                dec!(245.00),
                true,
            ))
            .unwrap();
        assert!(check(&store).passed());
    }
}
