//! Ledger entity types.
//!
//! These are the normalized rows the import pipeline produces: currencies,
//! accounts, categories, payees, transactions, and the append-only import
//! log. Identifiers are externally supplied by the source document, except
//! category ids, which the store assigns (categories are keyed externally
//! by a composite Grisbi id pair instead).

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a [`Currency`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CurrencyId(pub u32);

/// Identifier of an [`Account`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AccountId(pub u32);

/// Store-assigned identifier of a [`Category`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CategoryId(pub u32);

/// Identifier of a [`Payee`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PayeeId(pub u32);

/// Identifier of a [`Transaction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TransactionId(pub u64);

impl fmt::Display for CurrencyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for PayeeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A currency with running totals accumulated during import.
///
/// `balance` and `initial_amount` are maintained by the import pipeline as
/// accounts are processed and are cross-checked by the consistency checker;
/// they are never recomputed outside of verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Currency {
    /// Externally supplied identifier.
    pub id: CurrencyId,
    /// Display name, e.g. "Euro".
    pub name: String,
    /// Currency symbol, e.g. "€".
    pub symbol: String,
    /// ISO 4217 code, e.g. "EUR".
    pub iso_code: String,
    /// Sum of the initial amounts of this currency's accounts.
    pub initial_amount: Decimal,
    /// Sum of the stored balances of this currency's accounts.
    pub balance: Decimal,
    /// A currency is active once at least one active account uses it.
    pub active: bool,
}

impl Currency {
    /// Create an inactive currency with zero balances.
    #[must_use]
    pub fn new(
        id: CurrencyId,
        name: impl Into<String>,
        symbol: impl Into<String>,
        iso_code: impl Into<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            symbol: symbol.into(),
            iso_code: iso_code.into(),
            initial_amount: Decimal::ZERO,
            balance: Decimal::ZERO,
            active: false,
        }
    }
}

/// A bank account owned by exactly one currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Externally supplied identifier.
    pub id: AccountId,
    /// Display name.
    pub name: String,
    /// The currency this account is denominated in.
    pub currency: CurrencyId,
    /// Opening balance.
    pub initial_amount: Decimal,
    /// Stored balance as declared by the source document.
    pub balance: Decimal,
    /// Inverse of the document's "closed" flag.
    pub active: bool,
}

impl Account {
    /// Create a new account.
    #[must_use]
    pub fn new(
        id: AccountId,
        name: impl Into<String>,
        currency: CurrencyId,
        initial_amount: Decimal,
        balance: Decimal,
        active: bool,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            currency,
            initial_amount,
            balance,
            active,
        }
    }
}

/// Reserved sub-category id marking a category's "no sub-category"
/// placeholder row.
pub const NO_SUB_CATEGORY: u32 = 10_000;

/// Composite external key of a category: the Grisbi category id plus the
/// Grisbi sub-category id (0 for a top-level category row).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CategoryKey {
    /// Grisbi category id.
    pub category: u32,
    /// Grisbi sub-category id.
    pub sub_category: u32,
}

impl CategoryKey {
    /// Create a new composite key.
    #[must_use]
    pub const fn new(category: u32, sub_category: u32) -> Self {
        Self {
            category,
            sub_category,
        }
    }
}

impl fmt::Display for CategoryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.category, self.sub_category)
    }
}

/// A spending/income category.
///
/// Categories form a tree of depth exactly two: a top-level category has
/// `parent = None`, a sub-category's parent is always a top-level category.
/// The store rejects deeper nesting at insert time. Synthetic system
/// categories (transfer, breakdown, no-category) carry no external key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Store-assigned identifier.
    pub id: CategoryId,
    /// Composite external key; `None` for synthetic system categories.
    pub key: Option<CategoryKey>,
    /// Display name.
    pub name: String,
    /// Parent category for sub-categories, `None` for top-level rows.
    pub parent: Option<CategoryId>,
    /// Synthetic categories are system rows, never shown to filters.
    pub system: bool,
}

impl Category {
    /// Create a top-level category with an external key.
    #[must_use]
    pub fn new(id: CategoryId, key: CategoryKey, name: impl Into<String>) -> Self {
        Self {
            id,
            key: Some(key),
            name: name.into(),
            parent: None,
            system: false,
        }
    }

    /// Create a synthetic system category.
    #[must_use]
    pub fn synthetic(id: CategoryId, name: impl Into<String>) -> Self {
        Self {
            id,
            key: None,
            name: name.into(),
            parent: None,
            system: true,
        }
    }

    /// Attach a parent, turning this row into a sub-category.
    #[must_use]
    pub fn with_parent(mut self, parent: CategoryId) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Whether this is a top-level category.
    #[must_use]
    pub const fn is_top_level(&self) -> bool {
        self.parent.is_none()
    }
}

/// Name of the synthetic transfer category.
pub const TRANSFER: &str = "TRANSFER";
/// Name of the synthetic breakdown parent category.
pub const BREAKDOWN_OF_TRANSACTIONS: &str = "BREAKDOWN_OF_TRANSACTIONS";
/// Name of the synthetic fallback category.
pub const NO_CATEGORY: &str = "NO_CATEGORY";
/// Name of the synthetic fallback payee.
pub const NO_PAYEE: &str = "NO_PAYEE";

/// Id of the synthetic payee; the document uses payee id 0 to mean "none".
pub const NO_PAYEE_ID: PayeeId = PayeeId(0);

/// A transaction counterparty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payee {
    /// Externally supplied identifier (0 is reserved for [`NO_PAYEE`]).
    pub id: PayeeId,
    /// Display name.
    pub name: String,
    /// Synthetic rows are system rows.
    pub system: bool,
}

impl Payee {
    /// Create a new payee.
    #[must_use]
    pub fn new(id: PayeeId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            system: false,
        }
    }

    /// The synthetic fallback payee.
    #[must_use]
    pub fn no_payee() -> Self {
        Self {
            id: NO_PAYEE_ID,
            name: NO_PAYEE.to_string(),
            system: true,
        }
    }
}

/// A ledger transaction.
///
/// Transactions mirror the category tree: a transaction with a parent is a
/// sub-transaction of a breakdown and must not itself have children. The
/// amount is signed and rounded half-even to two decimal places.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Externally supplied identifier.
    pub id: TransactionId,
    /// Value date.
    pub date: NaiveDate,
    /// Signed amount in the owning account's currency.
    pub amount: Decimal,
    /// Owning account.
    pub account: AccountId,
    /// Resolved category (possibly synthetic).
    pub category: CategoryId,
    /// Resolved payee (possibly the synthetic fallback).
    pub payee: PayeeId,
    /// Free-text comment.
    pub comment: String,
    /// Parent transaction for breakdown children.
    pub parent: Option<TransactionId>,
}

impl Transaction {
    /// Create a top-level transaction.
    #[must_use]
    pub fn new(
        id: TransactionId,
        date: NaiveDate,
        amount: Decimal,
        account: AccountId,
        category: CategoryId,
        payee: PayeeId,
    ) -> Self {
        Self {
            id,
            date,
            amount,
            account,
            category,
            payee,
            comment: String::new(),
            parent: None,
        }
    }

    /// Set the free-text comment.
    #[must_use]
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    /// Attach a parent, turning this row into a sub-transaction.
    #[must_use]
    pub fn with_parent(mut self, parent: TransactionId) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Whether this is a top-level transaction.
    #[must_use]
    pub const fn is_top_level(&self) -> bool {
        self.parent.is_none()
    }
}

/// One row of the append-only import audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportLog {
    /// Sequence number assigned by the store.
    pub id: u32,
    /// When the attempt finished.
    pub timestamp: DateTime<Utc>,
    /// Source document path or label.
    pub source: String,
    /// Elapsed wall time in milliseconds.
    pub duration_ms: u64,
    /// Whether the attempt ran to completion.
    pub success: bool,
}
