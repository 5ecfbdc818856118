//! End-to-end tests for the import pipeline against inline XML fixtures.

use ledgris_core::{AccountId, CategoryKey, CurrencyId, Decimal, TransactionId, NO_SUB_CATEGORY};
use ledgris_import::{
    run_import, CancelToken, ExportDocument, ImportError, NullProgress, ProgressSink,
};
use ledgris_store::LedgerStore;
use rust_decimal_macros::dec;
use std::io::Write;

/// Two payees, two category trees, two currencies, three accounts (one
/// closed), six transactions including a breakdown and a transfer leg.
///
/// Declared counts include the synthetic rows: 2 payees + NO_PAYEE = 3;
/// 3 synthetic categories + (top + 2 subs + placeholder) + (top +
/// placeholder) = 9.
const FIXTURE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<grisbi-export version="0.5">
  <payees count="3">
    <payee id="1" name="Acme Works"/>
    <payee id="2" name="Green Grocer"/>
  </payees>
  <categories count="9">
    <category id="1" name="Food">
      <sub-category id="1" name="Groceries"/>
      <sub-category id="2" name="Restaurants"/>
    </category>
    <category id="2" name="Salary"/>
  </categories>
  <currencies count="2">
    <currency id="1" name="Euro" code="EUR" iso-code="EUR"/>
    <currency id="2" name="Dollar" code="$" iso-code="USD"/>
  </currencies>
  <accounts>
    <account id="1" name="Checking" currency="1" closed="false" initial-amount="100,00" balance="250,00">
      <transactions count="4">
        <transaction id="1" date="15/01/2024" amount="2000,00" category="2" sub-category="0"
                     payee="1" comment="January salary" breakdown="false" transfer="0"
                     exchange-rate="0" fees="0" rate-divisor="false" parent="0"/>
        <transaction id="2" date="20/01/2024" amount="-1850,00" category="0" sub-category="0"
                     payee="0" comment="monthly breakdown" breakdown="true" transfer="0"
                     exchange-rate="0" fees="0" rate-divisor="false" parent="0"/>
        <transaction id="3" date="20/01/2024" amount="-1500,00" category="1" sub-category="1"
                     payee="2" comment="weekly groceries" breakdown="false" transfer="0"
                     exchange-rate="0" fees="0" rate-divisor="false" parent="2"/>
        <transaction id="4" date="20/01/2024" amount="-350,00" category="1" sub-category="2"
                     payee="0" comment="GYM membership" breakdown="false" transfer="0"
                     exchange-rate="0" fees="0" rate-divisor="false" parent="2"/>
      </transactions>
    </account>
    <account id="2" name="Old savings" currency="2" closed="true" initial-amount="0,00" balance="0,00">
      <transactions count="0"/>
    </account>
    <account id="3" name="Savings" currency="1" closed="false" initial-amount="500,00" balance="520,00">
      <transactions count="2">
        <transaction id="5" date="05/02/2024" amount="25,00" category="0" sub-category="0"
                     payee="0" comment="from checking" breakdown="false" transfer="77"
                     exchange-rate="0" fees="0" rate-divisor="false" parent="0"/>
        <transaction id="6" date="10/02/2024" amount="-5,00" category="1" sub-category="0"
                     payee="2" comment="snacks" breakdown="false" transfer="0"
                     exchange-rate="0" fees="0" rate-divisor="false" parent="0"/>
      </transactions>
    </account>
  </accounts>
</grisbi-export>"#;

fn import(xml: &str) -> (LedgerStore, Result<ledgris_import::ImportOutcome, ImportError>) {
    let mut store = LedgerStore::new();
    let result = ExportDocument::parse(xml)
        .map_err(ImportError::from)
        .and_then(|doc| {
            run_import(
                &mut store,
                &doc,
                "fixture.xml",
                &CancelToken::new(),
                &NullProgress,
            )
        });
    (store, result)
}

#[test]
fn test_full_import_populates_all_tables() {
    let (store, result) = import(FIXTURE);
    let outcome = result.unwrap();
    assert!(outcome.completed());

    assert_eq!(store.payee_count(), 3);
    assert_eq!(store.category_count(), 9);
    assert_eq!(store.currency_count(), 2);
    assert_eq!(store.account_count(), 3);
    assert_eq!(store.transaction_count(), 6);

    let log = store.import_log();
    assert_eq!(log.len(), 1);
    assert!(log[0].success);
    assert_eq!(log[0].source, "fixture.xml");
}

#[test]
fn test_currency_totals_and_activation() {
    let (store, result) = import(FIXTURE);
    result.unwrap();

    let euro = store.currency(CurrencyId(1)).unwrap();
    assert!(euro.active);
    assert_eq!(euro.initial_amount, dec!(600.00));
    assert_eq!(euro.balance, dec!(770.00));

    // Only a closed account uses the dollar, so it stays inactive.
    let dollar = store.currency(CurrencyId(2)).unwrap();
    assert!(!dollar.active);
    assert_eq!(dollar.balance, dec!(0.00));

    assert!(store.account(AccountId(1)).unwrap().active);
    assert!(!store.account(AccountId(2)).unwrap().active);
}

#[test]
fn test_category_resolution() {
    let (store, result) = import(FIXTURE);
    result.unwrap();
    let specials = store.special_categories().unwrap();

    // Category-only reference goes through the placeholder row.
    let salary = store.transaction(TransactionId(1)).unwrap();
    let placeholder = store
        .category_by_key(CategoryKey::new(2, NO_SUB_CATEGORY))
        .unwrap();
    assert_eq!(salary.category, placeholder.id);
    assert_eq!(store.category(salary.category).unwrap().name, "Salary");

    // Breakdown parent and its children.
    let breakdown = store.transaction(TransactionId(2)).unwrap();
    assert_eq!(breakdown.category, specials.breakdown);
    let child = store.transaction(TransactionId(4)).unwrap();
    assert_eq!(child.parent, Some(TransactionId(2)));
    let groceries = store.category_by_key(CategoryKey::new(1, 1)).unwrap();
    assert_eq!(store.transaction(TransactionId(3)).unwrap().category, groceries.id);

    // Transfer leg.
    let transfer = store.transaction(TransactionId(5)).unwrap();
    assert_eq!(transfer.category, specials.transfer);

    // Amounts are parsed with the comma separator.
    assert_eq!(salary.amount, dec!(2000.00));
    assert_eq!(breakdown.amount, dec!(-1850.00));
}

#[test]
fn test_reimport_after_clear_is_idempotent() {
    let (mut store, result) = import(FIXTURE);
    result.unwrap();

    // Aggregate balances of the first run.
    let currency_totals: Vec<_> = store
        .currencies()
        .map(|c| (c.id, c.initial_amount, c.balance, c.active))
        .collect();
    let account_balances: Vec<_> = store
        .accounts()
        .map(|a| (a.id, a.initial_amount, a.balance))
        .collect();
    let transaction_total: Decimal = store
        .transactions()
        .filter(|t| t.is_top_level())
        .map(|t| t.amount)
        .sum();
    assert_eq!(transaction_total, dec!(170.00));

    store.clear();
    assert!(store.is_empty());

    let doc = ExportDocument::parse(FIXTURE).unwrap();
    run_import(
        &mut store,
        &doc,
        "fixture.xml",
        &CancelToken::new(),
        &NullProgress,
    )
    .unwrap();

    assert_eq!(store.transaction_count(), 6);
    assert_eq!(store.category_count(), 9);
    // The second run reproduces the first run's aggregates exactly.
    let second_currency_totals: Vec<_> = store
        .currencies()
        .map(|c| (c.id, c.initial_amount, c.balance, c.active))
        .collect();
    let second_account_balances: Vec<_> = store
        .accounts()
        .map(|a| (a.id, a.initial_amount, a.balance))
        .collect();
    let second_transaction_total: Decimal = store
        .transactions()
        .filter(|t| t.is_top_level())
        .map(|t| t.amount)
        .sum();
    assert_eq!(second_currency_totals, currency_totals);
    assert_eq!(second_account_balances, account_balances);
    assert_eq!(second_transaction_total, transaction_total);
    // The audit trail keeps both attempts.
    assert_eq!(store.import_log().len(), 2);
    assert_eq!(store.import_log()[1].id, 2);
}

#[test]
fn test_count_mismatch_is_an_error() {
    let xml = r#"<grisbi-export version="0.5">
  <payees count="5">
    <payee id="1" name="Acme Works"/>
  </payees>
  <categories count="3"/>
  <currencies count="0"/>
  <accounts/>
</grisbi-export>"#;
    let (store, result) = import(xml);
    match result.unwrap_err() {
        ImportError::CountMismatch {
            expected, actual, ..
        } => {
            assert_eq!(expected, 5);
            assert_eq!(actual, 2);
        }
        other => panic!("unexpected error: {other}"),
    }
    // The failed attempt is still on the audit trail.
    assert_eq!(store.import_log().len(), 1);
    assert!(!store.import_log()[0].success);
}

#[test]
fn test_unknown_category_key_is_rejected() {
    let xml = r#"<grisbi-export version="0.5">
  <payees count="1"/>
  <categories count="3"/>
  <currencies count="1">
    <currency id="1" name="Euro" code="EUR" iso-code="EUR"/>
  </currencies>
  <accounts>
    <account id="1" name="Checking" currency="1" closed="false" initial-amount="0,00" balance="10,00">
      <transactions count="1">
        <transaction id="1" date="15/01/2024" amount="10,00" category="99" sub-category="0"
                     payee="0" breakdown="false" transfer="0"
                     exchange-rate="0" fees="0" rate-divisor="false" parent="0"/>
      </transactions>
    </account>
  </accounts>
</grisbi-export>"#;
    let (_, result) = import(xml);
    match result.unwrap_err() {
        ImportError::UnknownCategoryKey { transaction, key } => {
            assert_eq!(transaction, 1);
            assert_eq!(key, CategoryKey::new(99, NO_SUB_CATEGORY));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_sub_category_without_category_is_rejected() {
    // A non-zero sub-category is looked up before the category id is
    // inspected, so (0, 5) must fail as an unknown key rather than fall
    // back to the no-category row.
    let xml = r#"<grisbi-export version="0.5">
  <payees count="1"/>
  <categories count="3"/>
  <currencies count="1">
    <currency id="1" name="Euro" code="EUR" iso-code="EUR"/>
  </currencies>
  <accounts>
    <account id="1" name="Checking" currency="1" closed="false" initial-amount="0,00" balance="10,00">
      <transactions count="1">
        <transaction id="1" date="15/01/2024" amount="10,00" category="0" sub-category="5"
                     payee="0" breakdown="false" transfer="0"
                     exchange-rate="0" fees="0" rate-divisor="false" parent="0"/>
      </transactions>
    </account>
  </accounts>
</grisbi-export>"#;
    let (_, result) = import(xml);
    match result.unwrap_err() {
        ImportError::UnknownCategoryKey { transaction, key } => {
            assert_eq!(transaction, 1);
            assert_eq!(key, CategoryKey::new(0, 5));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_parent_must_precede_children() {
    let xml = r#"<grisbi-export version="0.5">
  <payees count="1"/>
  <categories count="3"/>
  <currencies count="1">
    <currency id="1" name="Euro" code="EUR" iso-code="EUR"/>
  </currencies>
  <accounts>
    <account id="1" name="Checking" currency="1" closed="false" initial-amount="0,00" balance="10,00">
      <transactions count="2">
        <transaction id="1" date="15/01/2024" amount="10,00" category="0" sub-category="0"
                     payee="0" breakdown="false" transfer="0"
                     exchange-rate="0" fees="0" rate-divisor="false" parent="2"/>
        <transaction id="2" date="15/01/2024" amount="10,00" category="0" sub-category="0"
                     payee="0" breakdown="true" transfer="0"
                     exchange-rate="0" fees="0" rate-divisor="false" parent="0"/>
      </transactions>
    </account>
  </accounts>
</grisbi-export>"#;
    let (_, result) = import(xml);
    match result.unwrap_err() {
        ImportError::ParentOrdering {
            transaction,
            parent,
        } => {
            assert_eq!(transaction, 1);
            assert_eq!(parent, 2);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_exchange_rate_conversion() {
    let xml = r#"<grisbi-export version="0.5">
  <payees count="1"/>
  <categories count="3"/>
  <currencies count="1">
    <currency id="1" name="Euro" code="EUR" iso-code="EUR"/>
  </currencies>
  <accounts>
    <account id="1" name="Travel" currency="1" closed="false" initial-amount="0,00" balance="200,41">
      <transactions count="2">
        <transaction id="1" date="15/01/2024" amount="100,00" category="0" sub-category="0"
                     payee="0" breakdown="false" transfer="0"
                     exchange-rate="1,1" fees="0,50" rate-divisor="false" parent="0"/>
        <transaction id="2" date="16/01/2024" amount="100,00" category="0" sub-category="0"
                     payee="0" breakdown="false" transfer="0"
                     exchange-rate="1,1" fees="0" rate-divisor="true" parent="0"/>
      </transactions>
    </account>
  </accounts>
</grisbi-export>"#;
    let (store, result) = import(xml);
    result.unwrap();

    // 100 * 1.1 - 0.50, and 100 / 1.1 rounded half-even.
    assert_eq!(store.transaction(TransactionId(1)).unwrap().amount, dec!(109.50));
    assert_eq!(store.transaction(TransactionId(2)).unwrap().amount, dec!(90.91));
}

/// Cancels the shared token the moment a given progress message appears.
struct CancelOn {
    needle: &'static str,
    token: CancelToken,
}

impl ProgressSink for CancelOn {
    fn report(&self, message: &str) {
        if message.contains(self.needle) {
            self.token.cancel();
        }
    }
}

#[test]
fn test_cancellation_stops_between_stages_and_clears() {
    let token = CancelToken::new();
    let sink = CancelOn {
        needle: "importing currencies",
        token: token.clone(),
    };

    let mut store = LedgerStore::new();
    let doc = ExportDocument::parse(FIXTURE).unwrap();
    let outcome = run_import(&mut store, &doc, "fixture.xml", &token, &sink).unwrap();
    assert!(outcome.cancelled);

    // Stages before the cancellation point committed, later ones did not.
    assert_eq!(store.payee_count(), 3);
    assert_eq!(store.category_count(), 9);
    assert_eq!(store.currency_count(), 0);
    assert_eq!(store.transaction_count(), 0);

    let log = store.import_log();
    assert_eq!(log.len(), 1);
    assert!(!log[0].success);

    store.clear();
    assert!(store.is_empty());
    assert_eq!(store.import_log().len(), 1);
}

#[test]
fn test_import_file_reads_from_disk() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(FIXTURE.as_bytes()).unwrap();

    let mut store = LedgerStore::new();
    let outcome = ledgris_import::import_file(
        &mut store,
        file.path(),
        &CancelToken::new(),
        &NullProgress,
    )
    .unwrap();
    assert!(outcome.completed());
    assert_eq!(store.transaction_count(), 6);
    assert_eq!(store.import_log()[0].source, file.path().to_string_lossy());
}
