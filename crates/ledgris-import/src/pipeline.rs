//! The five-stage import pipeline.
//!
//! Stages run in dependency order: payees, categories, currencies,
//! accounts, transactions. Every stage commits rows as it goes; on failure
//! the store is left partially populated and the caller decides whether to
//! [`ledgris_store::LedgerStore::clear`] it. Cancellation is polled between
//! records and reported as a non-error outcome.

use crate::document::{DocumentError, ExportDocument, Node};
use crate::{CancelToken, ProgressSink};
use ledgris_core::{
    parse_date, parse_decimal, parse_money, round_money, Account, AccountId, CategoryId,
    CategoryKey, Currency, CurrencyId, DateError, NumberError, Payee, PayeeId, Transaction,
    TransactionId, NO_PAYEE_ID, NO_SUB_CATEGORY,
};
use ledgris_store::{LedgerStore, SpecialCategories, StoreError};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use thiserror::Error;

/// An import attempt failed.
#[derive(Debug, Error)]
pub enum ImportError {
    /// The document is unreadable or structurally broken.
    #[error(transparent)]
    Document(#[from] DocumentError),
    /// Non-numeric text where a number was required.
    #[error(transparent)]
    Number(#[from] NumberError),
    /// Unparseable date text.
    #[error(transparent)]
    Date(#[from] DateError),
    /// A store invariant was violated.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// A declared count does not match the rows actually stored.
    #[error("{entity}: document declares {expected} rows, stored {actual}")]
    CountMismatch {
        /// Which table the count covers.
        entity: String,
        /// The document's declared count.
        expected: usize,
        /// Rows actually stored.
        actual: usize,
    },
    /// A transaction references an entity the document never declared.
    #[error("transaction {transaction}: unknown {what} {id}")]
    UnknownReference {
        /// The referencing transaction's document id.
        transaction: u64,
        /// Kind of the missing entity.
        what: &'static str,
        /// The dangling document id.
        id: u64,
    },
    /// A transaction's category key matches no imported category row.
    #[error("transaction {transaction}: no category with key {key}")]
    UnknownCategoryKey {
        /// The referencing transaction's document id.
        transaction: u64,
        /// The unresolved composite key.
        key: CategoryKey,
    },
    /// A sub-transaction appears before its parent in the document.
    #[error("transaction {transaction}: parent {parent} not yet stored")]
    ParentOrdering {
        /// The sub-transaction's document id.
        transaction: u64,
        /// The parent id it references.
        parent: u64,
    },
}

/// How a finished import attempt went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportOutcome {
    /// Wall time the attempt took.
    pub duration: Duration,
    /// Whether the attempt stopped on a cancellation request.
    pub cancelled: bool,
}

impl ImportOutcome {
    /// Whether the attempt ran all five stages to completion.
    #[must_use]
    pub const fn completed(&self) -> bool {
        !self.cancelled
    }
}

/// Whether a stage ran to its end or stopped on a cancellation poll.
enum Flow {
    Done,
    Cancelled,
}

/// Run the full import of `doc` into `store`.
///
/// Appends one audit row to the store's import log whatever the outcome:
/// `success` is true only for a completed, error-free run. On error the
/// store keeps the rows committed so far; callers wanting all-or-nothing
/// semantics clear it afterwards.
///
/// # Errors
///
/// Any [`ImportError`]; the audit row has already been appended when this
/// returns.
pub fn run_import(
    store: &mut LedgerStore,
    doc: &ExportDocument,
    source: &str,
    cancel: &CancelToken,
    progress: &dyn ProgressSink,
) -> Result<ImportOutcome, ImportError> {
    let started = Instant::now();
    let result = import_stages(store, doc, cancel, progress);
    let duration = started.elapsed();
    let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);

    match result {
        Ok(Flow::Done) => {
            store.append_import_log(source, millis, true);
            tracing::info!(
                source,
                duration_ms = millis,
                transactions = store.transaction_count(),
                "import completed"
            );
            Ok(ImportOutcome {
                duration,
                cancelled: false,
            })
        }
        Ok(Flow::Cancelled) => {
            store.append_import_log(source, millis, false);
            tracing::warn!(source, duration_ms = millis, "import cancelled");
            Ok(ImportOutcome {
                duration,
                cancelled: true,
            })
        }
        Err(err) => {
            store.append_import_log(source, millis, false);
            tracing::error!(source, duration_ms = millis, error = %err, "import failed");
            Err(err)
        }
    }
}

/// Read the document from `path` and import it.
///
/// # Errors
///
/// Everything [`run_import`] reports, plus read failures.
pub fn import_file(
    store: &mut LedgerStore,
    path: impl AsRef<std::path::Path>,
    cancel: &CancelToken,
    progress: &dyn ProgressSink,
) -> Result<ImportOutcome, ImportError> {
    let path = path.as_ref();
    let doc = ExportDocument::from_file(path)?;
    run_import(store, &doc, &path.to_string_lossy(), cancel, progress)
}

fn import_stages(
    store: &mut LedgerStore,
    doc: &ExportDocument,
    cancel: &CancelToken,
    progress: &dyn ProgressSink,
) -> Result<Flow, ImportError> {
    let stages: [fn(
        &mut LedgerStore,
        &ExportDocument,
        &CancelToken,
        &dyn ProgressSink,
    ) -> Result<Flow, ImportError>; 5] = [
        import_payees,
        import_categories,
        import_currencies,
        import_accounts,
        import_transactions,
    ];
    for stage in stages {
        if let Flow::Cancelled = stage(store, doc, cancel, progress)? {
            return Ok(Flow::Cancelled);
        }
    }
    Ok(Flow::Done)
}

// ===== stage 1: payees =====

fn import_payees(
    store: &mut LedgerStore,
    doc: &ExportDocument,
    cancel: &CancelToken,
    progress: &dyn ProgressSink,
) -> Result<Flow, ImportError> {
    progress.report("importing payees");
    let container = doc.select_one("payees")?;
    let expected = attr_count(container)?;

    // The document uses payee id 0 to mean "none"; the synthetic row makes
    // that reference resolvable and is included in the declared count.
    store.insert_payee(Payee::no_payee())?;
    for record in container.children("payee") {
        if cancel.is_cancelled() {
            return Ok(Flow::Cancelled);
        }
        let id = PayeeId(attr_u32(record, "id")?);
        let name = record.require_attr("name")?;
        store.insert_payee(Payee::new(id, name))?;
    }

    check_count("payees", expected, store.payee_count())?;
    tracing::debug!(rows = store.payee_count(), "payees imported");
    Ok(Flow::Done)
}

// ===== stage 2: categories =====

fn import_categories(
    store: &mut LedgerStore,
    doc: &ExportDocument,
    cancel: &CancelToken,
    progress: &dyn ProgressSink,
) -> Result<Flow, ImportError> {
    progress.report("importing categories");
    let container = doc.select_one("categories")?;
    let expected = attr_count(container)?;

    store.ensure_special_categories();
    for top in container.children("category") {
        if cancel.is_cancelled() {
            return Ok(Flow::Cancelled);
        }
        let grisbi_id = attr_u32(top, "id")?;
        let name = top.require_attr("name")?;
        let parent = store.insert_category(CategoryKey::new(grisbi_id, 0), name, None)?;
        for sub in top.children("sub-category") {
            let sub_id = attr_u32(sub, "id")?;
            let sub_name = sub.require_attr("name")?;
            store.insert_category(CategoryKey::new(grisbi_id, sub_id), sub_name, Some(parent))?;
        }
        // Placeholder row so transactions that name the category without a
        // sub-category still resolve through the composite key.
        store.insert_category(
            CategoryKey::new(grisbi_id, NO_SUB_CATEGORY),
            name,
            Some(parent),
        )?;
    }

    check_count("categories", expected, store.category_count())?;
    tracing::debug!(rows = store.category_count(), "categories imported");
    Ok(Flow::Done)
}

// ===== stage 3: currencies =====

fn import_currencies(
    store: &mut LedgerStore,
    doc: &ExportDocument,
    cancel: &CancelToken,
    progress: &dyn ProgressSink,
) -> Result<Flow, ImportError> {
    progress.report("importing currencies");
    let container = doc.select_one("currencies")?;
    let expected = attr_count(container)?;

    for record in container.children("currency") {
        if cancel.is_cancelled() {
            return Ok(Flow::Cancelled);
        }
        let id = CurrencyId(attr_u32(record, "id")?);
        let currency = Currency::new(
            id,
            record.require_attr("name")?,
            record.require_attr("code")?,
            record.require_attr("iso-code")?,
        );
        store.insert_currency(currency)?;
    }

    check_count("currencies", expected, store.currency_count())?;
    tracing::debug!(rows = store.currency_count(), "currencies imported");
    Ok(Flow::Done)
}

// ===== stage 4: accounts =====

fn import_accounts(
    store: &mut LedgerStore,
    doc: &ExportDocument,
    cancel: &CancelToken,
    progress: &dyn ProgressSink,
) -> Result<Flow, ImportError> {
    progress.report("importing accounts");
    let container = doc.select_one("accounts")?;

    // Currency running totals accumulate across accounts and are written
    // back once per touched currency.
    let mut touched: HashMap<CurrencyId, Currency> = HashMap::new();
    for record in container.children("account") {
        if cancel.is_cancelled() {
            return Ok(Flow::Cancelled);
        }
        let id = AccountId(attr_u32(record, "id")?);
        let name = record.require_attr("name")?;
        let currency_id = CurrencyId(attr_u32(record, "currency")?);
        let active = !attr_bool(record, "closed")?;
        let initial_amount = parse_money(record.require_attr("initial-amount")?)?;
        let balance = parse_money(record.require_attr("balance")?)?;

        let mut currency = match touched.remove(&currency_id) {
            Some(currency) => currency,
            None => store
                .currency(currency_id)
                .cloned()
                .ok_or(StoreError::UnknownCurrency(currency_id))?,
        };
        store.insert_account(Account::new(
            id,
            name,
            currency_id,
            initial_amount,
            balance,
            active,
        ))?;
        if active {
            currency.active = true;
        }
        currency.initial_amount += initial_amount;
        currency.balance += balance;
        touched.insert(currency_id, currency);
    }
    for currency in touched.into_values() {
        store.replace_currency(currency)?;
    }

    // The format declares no count on <accounts>; nothing to validate here.
    tracing::debug!(rows = store.account_count(), "accounts imported");
    Ok(Flow::Done)
}

// ===== stage 5: transactions =====

fn import_transactions(
    store: &mut LedgerStore,
    doc: &ExportDocument,
    cancel: &CancelToken,
    progress: &dyn ProgressSink,
) -> Result<Flow, ImportError> {
    progress.report("importing transactions");
    let specials = store
        .special_categories()
        .expect("special categories created by the categories stage");

    // Document ids of transactions stored so far this run; a parent must
    // appear before any of its children.
    let mut seen: HashMap<u64, TransactionId> = HashMap::new();
    for account_node in doc.select("accounts/account") {
        let account_id = AccountId(attr_u32(account_node, "id")?);
        let account_name = account_node.require_attr("name")?;
        let container = account_node.require_child("transactions")?;
        let expected = attr_count(container)?;

        for record in container.children("transaction") {
            if cancel.is_cancelled() {
                return Ok(Flow::Cancelled);
            }
            let transaction = read_transaction(store, specials, &seen, account_id, record)?;
            seen.insert(transaction.id.0, transaction.id);
            store.insert_transaction(transaction)?;
        }

        let actual = store.account_transaction_count(account_id);
        check_count(
            &format!("transactions of account {account_id}"),
            expected,
            actual,
        )?;
        progress.report(&format!("account {account_name}: {actual} transactions"));
    }

    tracing::debug!(rows = store.transaction_count(), "transactions imported");
    Ok(Flow::Done)
}

fn read_transaction(
    store: &LedgerStore,
    specials: SpecialCategories,
    seen: &HashMap<u64, TransactionId>,
    account: AccountId,
    record: &Node,
) -> Result<Transaction, ImportError> {
    let id = attr_u64(record, "id")?;
    let date = parse_date(record.require_attr("date")?)?;
    let amount = read_amount(record)?;

    let category_raw = attr_u32(record, "category")?;
    let sub_category_raw = attr_u32(record, "sub-category")?;
    let transfer_ref = attr_u64(record, "transfer")?;
    let breakdown = attr_bool(record, "breakdown")?;
    let category = resolve_category(
        store,
        specials,
        id,
        category_raw,
        sub_category_raw,
        transfer_ref,
        breakdown,
    )?;

    let payee_raw = attr_u32(record, "payee")?;
    let payee = if payee_raw == 0 {
        NO_PAYEE_ID
    } else {
        let payee_id = PayeeId(payee_raw);
        if store.payee(payee_id).is_none() {
            return Err(ImportError::UnknownReference {
                transaction: id,
                what: "payee",
                id: u64::from(payee_raw),
            });
        }
        payee_id
    };

    let parent_raw = attr_u64(record, "parent")?;
    let parent = if parent_raw == 0 {
        None
    } else {
        Some(*seen.get(&parent_raw).ok_or(ImportError::ParentOrdering {
            transaction: id,
            parent: parent_raw,
        })?)
    };

    let mut transaction = Transaction::new(TransactionId(id), date, amount, account, category, payee)
        .with_comment(record.attr("comment").unwrap_or_default());
    if let Some(parent_id) = parent {
        transaction = transaction.with_parent(parent_id);
    }
    Ok(transaction)
}

/// Convert the raw amount into the account's currency.
///
/// A zero exchange rate means "no conversion". Otherwise the rate either
/// multiplies or divides depending on the rate-divisor flag, fees come off
/// after conversion, and the result is rounded half-even to two places.
fn read_amount(record: &Node) -> Result<rust_decimal::Decimal, ImportError> {
    let raw = parse_decimal(record.require_attr("amount")?)?;
    let rate = parse_decimal(record.require_attr("exchange-rate")?)?;
    let fees = parse_decimal(record.require_attr("fees")?)?;
    let divide = attr_bool(record, "rate-divisor")?;

    let amount = if rate.is_zero() {
        raw
    } else if divide {
        raw / rate - fees
    } else {
        raw * rate - fees
    };
    Ok(round_money(amount))
}

/// Resolve a transaction's category per the document's reference scheme,
/// in precedence order: transfer leg, breakdown parent, explicit
/// sub-category, category-only via the placeholder row, no category.
fn resolve_category(
    store: &LedgerStore,
    specials: SpecialCategories,
    transaction: u64,
    category: u32,
    sub_category: u32,
    transfer_ref: u64,
    breakdown: bool,
) -> Result<CategoryId, ImportError> {
    if category == 0 && transfer_ref != 0 {
        return Ok(specials.transfer);
    }
    if category == 0 && breakdown {
        return Ok(specials.breakdown);
    }
    // A non-zero sub-category is looked up even when the category id is
    // zero; such a degenerate reference fails as an unknown key rather
    // than falling back to the no-category row.
    if sub_category != 0 {
        let key = CategoryKey::new(category, sub_category);
        return lookup_category(store, transaction, key);
    }
    if category != 0 {
        let key = CategoryKey::new(category, NO_SUB_CATEGORY);
        return lookup_category(store, transaction, key);
    }
    Ok(specials.no_category)
}

fn lookup_category(
    store: &LedgerStore,
    transaction: u64,
    key: CategoryKey,
) -> Result<CategoryId, ImportError> {
    store
        .category_by_key(key)
        .map(|row| row.id)
        .ok_or(ImportError::UnknownCategoryKey { transaction, key })
}

// ===== attribute readers =====

fn attr_u32(node: &Node, name: &str) -> Result<u32, ImportError> {
    let text = node.require_attr(name)?;
    text.parse().map_err(|_| {
        ImportError::Number(NumberError {
            text: text.to_string(),
        })
    })
}

fn attr_u64(node: &Node, name: &str) -> Result<u64, ImportError> {
    let text = node.require_attr(name)?;
    text.parse().map_err(|_| {
        ImportError::Number(NumberError {
            text: text.to_string(),
        })
    })
}

fn attr_bool(node: &Node, name: &str) -> Result<bool, ImportError> {
    let text = node.require_attr(name)?;
    match text {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(ImportError::Number(NumberError {
            text: text.to_string(),
        })),
    }
}

fn attr_count(node: &Node) -> Result<usize, ImportError> {
    let text = node.require_attr("count")?;
    text.parse().map_err(|_| {
        ImportError::Number(NumberError {
            text: text.to_string(),
        })
    })
}

fn check_count(entity: &str, expected: usize, actual: usize) -> Result<(), ImportError> {
    if expected == actual {
        Ok(())
    } else {
        Err(ImportError::CountMismatch {
            entity: entity.to_string(),
            expected,
            actual,
        })
    }
}
