//! The normalized ledger store.
//!
//! Five entity tables (currencies, accounts, categories, payees,
//! transactions) plus the append-only import log. Inserts enforce the
//! uniqueness and referential invariants:
//!
//! - externally supplied ids are unique per table;
//! - an account's currency must exist;
//! - a transaction's account, category, and payee must exist;
//! - category and transaction trees have depth exactly two (a parent row
//!   must itself be parentless);
//! - category ids are store-assigned, with external lookup going through
//!   the composite Grisbi key.
//!
//! The store is a plain handle passed explicitly into the import pipeline
//! and the query engine; there is no ambient session. The import pipeline
//! is the only writer and assumes exclusive access for the duration of a
//! run.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use chrono::Utc;
use ledgris_core::{
    Account, AccountId, Category, CategoryId, CategoryKey, Currency, CurrencyId, ImportLog, Payee,
    PayeeId, Transaction, TransactionId, BREAKDOWN_OF_TRANSACTIONS, NO_CATEGORY, TRANSFER,
};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

/// A store invariant was violated by an insert or update.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A currency with this id already exists.
    #[error("duplicate currency id {0}")]
    DuplicateCurrency(CurrencyId),
    /// An account with this id already exists.
    #[error("duplicate account id {0}")]
    DuplicateAccount(AccountId),
    /// A category with this composite key already exists.
    #[error("duplicate category key {0}")]
    DuplicateCategoryKey(CategoryKey),
    /// A payee with this id already exists.
    #[error("duplicate payee id {0}")]
    DuplicatePayee(PayeeId),
    /// A transaction with this id already exists.
    #[error("duplicate transaction id {0}")]
    DuplicateTransaction(TransactionId),
    /// Referenced currency does not exist.
    #[error("unknown currency {0}")]
    UnknownCurrency(CurrencyId),
    /// Referenced account does not exist.
    #[error("unknown account {0}")]
    UnknownAccount(AccountId),
    /// Referenced category does not exist.
    #[error("unknown category {0}")]
    UnknownCategory(CategoryId),
    /// Referenced payee does not exist.
    #[error("unknown payee {0}")]
    UnknownPayee(PayeeId),
    /// Referenced parent category does not exist.
    #[error("unknown parent category {0}")]
    UnknownParentCategory(CategoryId),
    /// Referenced parent transaction does not exist.
    #[error("unknown parent transaction {0}")]
    UnknownParentTransaction(TransactionId),
    /// The parent category is itself a sub-category (depth would exceed 2).
    #[error("category {parent} is a sub-category and cannot have children")]
    CategoryTooDeep {
        /// The offending parent.
        parent: CategoryId,
    },
    /// The parent transaction is itself a sub-transaction (depth would
    /// exceed 2).
    #[error("transaction {parent} is a sub-transaction and cannot have children")]
    TransactionTooDeep {
        /// The offending parent.
        parent: TransactionId,
    },
}

/// Ids of the three synthetic categories that always exist after an import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecialCategories {
    /// Tag for the mirrored leg of a transfer between accounts.
    pub transfer: CategoryId,
    /// Parent category of breakdown transactions.
    pub breakdown: CategoryId,
    /// Fallback for transactions with no category at all.
    pub no_category: CategoryId,
}

/// The normalized ledger tables plus the import audit trail.
#[derive(Debug, Default)]
pub struct LedgerStore {
    currencies: BTreeMap<CurrencyId, Currency>,
    accounts: BTreeMap<AccountId, Account>,
    categories: BTreeMap<CategoryId, Category>,
    category_keys: HashMap<CategoryKey, CategoryId>,
    payees: BTreeMap<PayeeId, Payee>,
    transactions: BTreeMap<TransactionId, Transaction>,
    import_log: Vec<ImportLog>,
    next_category: u32,
    specials: Option<SpecialCategories>,
}

impl LedgerStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_category: 1,
            ..Self::default()
        }
    }

    // ===== currencies =====

    /// Insert a new currency.
    ///
    /// # Errors
    ///
    /// [`StoreError::DuplicateCurrency`] if the id is already taken.
    pub fn insert_currency(&mut self, currency: Currency) -> Result<(), StoreError> {
        if self.currencies.contains_key(&currency.id) {
            return Err(StoreError::DuplicateCurrency(currency.id));
        }
        self.currencies.insert(currency.id, currency);
        Ok(())
    }

    /// Replace an existing currency row (balance/active updates during
    /// import).
    ///
    /// # Errors
    ///
    /// [`StoreError::UnknownCurrency`] if the id does not exist.
    pub fn replace_currency(&mut self, currency: Currency) -> Result<(), StoreError> {
        if !self.currencies.contains_key(&currency.id) {
            return Err(StoreError::UnknownCurrency(currency.id));
        }
        self.currencies.insert(currency.id, currency);
        Ok(())
    }

    /// Look up a currency.
    #[must_use]
    pub fn currency(&self, id: CurrencyId) -> Option<&Currency> {
        self.currencies.get(&id)
    }

    /// All currencies, ordered by id.
    pub fn currencies(&self) -> impl Iterator<Item = &Currency> {
        self.currencies.values()
    }

    /// Number of currency rows.
    #[must_use]
    pub fn currency_count(&self) -> usize {
        self.currencies.len()
    }

    // ===== accounts =====

    /// Insert a new account.
    ///
    /// # Errors
    ///
    /// [`StoreError::DuplicateAccount`] if the id is already taken;
    /// [`StoreError::UnknownCurrency`] if the owning currency is missing.
    pub fn insert_account(&mut self, account: Account) -> Result<(), StoreError> {
        if self.accounts.contains_key(&account.id) {
            return Err(StoreError::DuplicateAccount(account.id));
        }
        if !self.currencies.contains_key(&account.currency) {
            return Err(StoreError::UnknownCurrency(account.currency));
        }
        self.accounts.insert(account.id, account);
        Ok(())
    }

    /// Look up an account.
    #[must_use]
    pub fn account(&self, id: AccountId) -> Option<&Account> {
        self.accounts.get(&id)
    }

    /// All accounts, ordered by id.
    pub fn accounts(&self) -> impl Iterator<Item = &Account> {
        self.accounts.values()
    }

    /// Number of account rows.
    #[must_use]
    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    // ===== categories =====

    /// Create the three synthetic categories if they do not exist yet and
    /// return their ids. Idempotent.
    pub fn ensure_special_categories(&mut self) -> SpecialCategories {
        if let Some(specials) = self.specials {
            return specials;
        }
        let transfer = self.alloc_category(|id| Category::synthetic(id, TRANSFER));
        let breakdown = self.alloc_category(|id| Category::synthetic(id, BREAKDOWN_OF_TRANSACTIONS));
        let no_category = self.alloc_category(|id| Category::synthetic(id, NO_CATEGORY));
        let specials = SpecialCategories {
            transfer,
            breakdown,
            no_category,
        };
        self.specials = Some(specials);
        specials
    }

    /// Ids of the synthetic categories, if an import has created them.
    #[must_use]
    pub const fn special_categories(&self) -> Option<SpecialCategories> {
        self.specials
    }

    /// Insert a keyed category and return its store-assigned id.
    ///
    /// # Errors
    ///
    /// [`StoreError::DuplicateCategoryKey`] if the composite key is taken;
    /// [`StoreError::UnknownParentCategory`] if the parent is missing;
    /// [`StoreError::CategoryTooDeep`] if the parent is itself a
    /// sub-category.
    pub fn insert_category(
        &mut self,
        key: CategoryKey,
        name: impl Into<String>,
        parent: Option<CategoryId>,
    ) -> Result<CategoryId, StoreError> {
        if self.category_keys.contains_key(&key) {
            return Err(StoreError::DuplicateCategoryKey(key));
        }
        if let Some(parent_id) = parent {
            let parent_row = self
                .categories
                .get(&parent_id)
                .ok_or(StoreError::UnknownParentCategory(parent_id))?;
            if !parent_row.is_top_level() {
                return Err(StoreError::CategoryTooDeep { parent: parent_id });
            }
        }
        let name = name.into();
        let id = self.alloc_category(|id| {
            let category = Category::new(id, key, name);
            match parent {
                Some(parent_id) => category.with_parent(parent_id),
                None => category,
            }
        });
        self.category_keys.insert(key, id);
        Ok(id)
    }

    /// Look up a category by store id.
    #[must_use]
    pub fn category(&self, id: CategoryId) -> Option<&Category> {
        self.categories.get(&id)
    }

    /// Look up a category by its composite external key.
    #[must_use]
    pub fn category_by_key(&self, key: CategoryKey) -> Option<&Category> {
        self.category_keys
            .get(&key)
            .and_then(|id| self.categories.get(id))
    }

    /// All categories, ordered by store id.
    pub fn categories(&self) -> impl Iterator<Item = &Category> {
        self.categories.values()
    }

    /// Number of category rows (synthetic rows included).
    #[must_use]
    pub fn category_count(&self) -> usize {
        self.categories.len()
    }

    fn alloc_category(&mut self, build: impl FnOnce(CategoryId) -> Category) -> CategoryId {
        let id = CategoryId(self.next_category);
        self.next_category += 1;
        self.categories.insert(id, build(id));
        id
    }

    // ===== payees =====

    /// Insert a new payee.
    ///
    /// # Errors
    ///
    /// [`StoreError::DuplicatePayee`] if the id is already taken.
    pub fn insert_payee(&mut self, payee: Payee) -> Result<(), StoreError> {
        if self.payees.contains_key(&payee.id) {
            return Err(StoreError::DuplicatePayee(payee.id));
        }
        self.payees.insert(payee.id, payee);
        Ok(())
    }

    /// Look up a payee.
    #[must_use]
    pub fn payee(&self, id: PayeeId) -> Option<&Payee> {
        self.payees.get(&id)
    }

    /// All payees, ordered by id.
    pub fn payees(&self) -> impl Iterator<Item = &Payee> {
        self.payees.values()
    }

    /// Number of payee rows (the synthetic fallback included).
    #[must_use]
    pub fn payee_count(&self) -> usize {
        self.payees.len()
    }

    // ===== transactions =====

    /// Insert a new transaction.
    ///
    /// # Errors
    ///
    /// Duplicate id, missing account/category/payee reference, missing
    /// parent, or a parent that is itself a sub-transaction.
    pub fn insert_transaction(&mut self, transaction: Transaction) -> Result<(), StoreError> {
        if self.transactions.contains_key(&transaction.id) {
            return Err(StoreError::DuplicateTransaction(transaction.id));
        }
        if !self.accounts.contains_key(&transaction.account) {
            return Err(StoreError::UnknownAccount(transaction.account));
        }
        if !self.categories.contains_key(&transaction.category) {
            return Err(StoreError::UnknownCategory(transaction.category));
        }
        if !self.payees.contains_key(&transaction.payee) {
            return Err(StoreError::UnknownPayee(transaction.payee));
        }
        if let Some(parent_id) = transaction.parent {
            let parent = self
                .transactions
                .get(&parent_id)
                .ok_or(StoreError::UnknownParentTransaction(parent_id))?;
            if !parent.is_top_level() {
                return Err(StoreError::TransactionTooDeep { parent: parent_id });
            }
        }
        self.transactions.insert(transaction.id, transaction);
        Ok(())
    }

    /// Look up a transaction.
    #[must_use]
    pub fn transaction(&self, id: TransactionId) -> Option<&Transaction> {
        self.transactions.get(&id)
    }

    /// All transactions, ordered by id.
    pub fn transactions(&self) -> impl Iterator<Item = &Transaction> {
        self.transactions.values()
    }

    /// Number of transaction rows.
    #[must_use]
    pub fn transaction_count(&self) -> usize {
        self.transactions.len()
    }

    /// Number of transaction rows belonging to one account.
    #[must_use]
    pub fn account_transaction_count(&self, account: AccountId) -> usize {
        self.transactions
            .values()
            .filter(|t| t.account == account)
            .count()
    }

    // ===== lifecycle =====

    /// Empty the five entity tables. The import log is an append-only audit
    /// trail and survives.
    pub fn clear(&mut self) {
        self.currencies.clear();
        self.accounts.clear();
        self.categories.clear();
        self.category_keys.clear();
        self.payees.clear();
        self.transactions.clear();
        self.next_category = 1;
        self.specials = None;
    }

    /// Whether all five entity tables are empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.currencies.is_empty()
            && self.accounts.is_empty()
            && self.categories.is_empty()
            && self.payees.is_empty()
            && self.transactions.is_empty()
    }

    /// Append one import-attempt row to the audit trail.
    pub fn append_import_log(&mut self, source: impl Into<String>, duration_ms: u64, success: bool) {
        let id = u32::try_from(self.import_log.len()).unwrap_or(u32::MAX) + 1;
        self.import_log.push(ImportLog {
            id,
            timestamp: Utc::now(),
            source: source.into(),
            duration_ms,
            success,
        });
    }

    /// The audit trail, oldest first.
    #[must_use]
    pub fn import_log(&self) -> &[ImportLog] {
        &self.import_log
    }
}
