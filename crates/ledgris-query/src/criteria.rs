//! The query request value object.

use ledgris_core::{AccountId, CategoryId, CurrencyId, PayeeId, Period};

/// A structured query request.
///
/// Built per query, never persisted. A filter "is present" exactly when its
/// field is non-empty (lists) or `Some` (options); there is no separate
/// enabled bit. Keywords are normalized to lowercase and deduplicated when
/// set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchCriteria {
    /// Restrict to accounts of this currency. Ignored when an accounts
    /// filter is present.
    pub currency: Option<CurrencyId>,
    /// Restrict to these accounts; empty means no restriction.
    pub accounts: Vec<AccountId>,
    /// Date bounds. Which of the two bounds apply is decided per query.
    pub period: Option<Period>,
    /// Restrict to these categories; empty means no restriction.
    pub categories: Vec<CategoryId>,
    /// Restrict to these payees; empty means no restriction.
    pub payees: Vec<PayeeId>,
    /// Case-insensitive comment keywords, matched with OR semantics.
    keywords: Vec<String>,
    /// When false, the synthetic transfer category is excluded.
    pub include_transfers: bool,
}

impl SearchCriteria {
    /// An empty request: no filters, transfers included.
    #[must_use]
    pub fn new() -> Self {
        Self {
            include_transfers: true,
            ..Self::default()
        }
    }

    /// Restrict to one currency's accounts.
    #[must_use]
    pub fn with_currency(mut self, currency: CurrencyId) -> Self {
        self.currency = Some(currency);
        self
    }

    /// Restrict to the given accounts.
    #[must_use]
    pub fn with_accounts(mut self, accounts: impl IntoIterator<Item = AccountId>) -> Self {
        self.accounts = accounts.into_iter().collect();
        self
    }

    /// Set the date bounds.
    #[must_use]
    pub fn with_period(mut self, period: Period) -> Self {
        self.period = Some(period);
        self
    }

    /// Restrict to the given categories.
    #[must_use]
    pub fn with_categories(mut self, categories: impl IntoIterator<Item = CategoryId>) -> Self {
        self.categories = categories.into_iter().collect();
        self
    }

    /// Restrict to the given payees.
    #[must_use]
    pub fn with_payees(mut self, payees: impl IntoIterator<Item = PayeeId>) -> Self {
        self.payees = payees.into_iter().collect();
        self
    }

    /// Set the comment keywords, normalizing to lowercase and dropping
    /// duplicates.
    #[must_use]
    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.keywords.clear();
        for keyword in keywords {
            let normalized = keyword.as_ref().to_lowercase();
            if !normalized.is_empty() && !self.keywords.contains(&normalized) {
                self.keywords.push(normalized);
            }
        }
        self
    }

    /// Exclude the synthetic transfer category.
    #[must_use]
    pub fn without_transfers(mut self) -> Self {
        self.include_transfers = false;
        self
    }

    /// The normalized keywords.
    #[must_use]
    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_includes_transfers() {
        let criteria = SearchCriteria::new();
        assert!(criteria.include_transfers);
        assert!(!criteria.without_transfers().include_transfers);
    }

    #[test]
    fn test_keywords_normalized_and_deduplicated() {
        let criteria = SearchCriteria::new().with_keywords(["Rent", "GYM", "rent", ""]);
        assert_eq!(criteria.keywords(), ["rent", "gym"]);
    }
}
