use std::collections::{HashMap, HashSet};

use rust_decimal::Decimal;
use thiserror::Error;

use crate::{EntrySide, LedgerEntry};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("at least 2 entries are required, got {0}")]
    TooFewEntries(usize),
    #[error("unbalanced entries: {0}")]
    Unbalanced(String),
    #[error("currency set mismatch: {0}")]
    CurrencySetMismatch(String),
}

/// Pure structural check that a candidate set of entries forms a valid
/// double-entry transaction: at least two entries, a consistent owning
/// transaction id, and debit/credit totals that balance exactly per
/// currency.
pub fn validate_entries(entries: &[LedgerEntry]) -> Result<(), ValidationError> {
    if entries.len() < 2 {
        return Err(ValidationError::TooFewEntries(entries.len()));
    }

    let first_txn_id = &entries[0].transaction_id;
    if entries.iter().any(|e| &e.transaction_id != first_txn_id) {
        return Err(ValidationError::Unbalanced(
            "entries do not share a single owning transaction id".into(),
        ));
    }

    let mut debit_totals: HashMap<&str, Decimal> = HashMap::new();
    let mut credit_totals: HashMap<&str, Decimal> = HashMap::new();
    let mut debit_currencies: HashSet<&str> = HashSet::new();
    let mut credit_currencies: HashSet<&str> = HashSet::new();

    for entry in entries {
        let currency = entry.amount.currency();
        match entry.side {
            EntrySide::Debit => {
                debit_currencies.insert(currency);
                *debit_totals.entry(currency).or_insert(Decimal::ZERO) += entry.amount.amount();
            }
            EntrySide::Credit => {
                credit_currencies.insert(currency);
                *credit_totals.entry(currency).or_insert(Decimal::ZERO) += entry.amount.amount();
            }
        }
    }

    if debit_currencies != credit_currencies {
        return Err(ValidationError::CurrencySetMismatch(format!(
            "debit currencies {debit_currencies:?} do not match credit currencies {credit_currencies:?}"
        )));
    }

    for currency in debit_currencies {
        let debit = debit_totals.get(currency).copied().unwrap_or(Decimal::ZERO);
        let credit = credit_totals
            .get(currency)
            .copied()
            .unwrap_or(Decimal::ZERO);
        if debit != credit {
            return Err(ValidationError::Unbalanced(format!(
                "{currency}: debit total {debit} != credit total {credit}"
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    use crate::{EventCategory, Money};

    fn entry(txn: &str, account: &str, amount: Decimal, currency: &str, side: EntrySide) -> LedgerEntry {
        LedgerEntry {
            id: format!("entry-{account}-{side:?}"),
            transaction_id: txn.into(),
            account_id: account.into(),
            amount: Money::new(amount, currency),
            side,
            event_category: EventCategory::Transfer,
            event_time: Utc::now(),
            recorded_at: Utc::now(),
        }
    }

    #[test]
    fn rejects_single_entry() {
        let entries = vec![entry("t1", "a", dec!(10), "BRL", EntrySide::Debit)];
        assert!(matches!(
            validate_entries(&entries),
            Err(ValidationError::TooFewEntries(1))
        ));
    }

    #[test]
    fn accepts_balanced_pair() {
        let entries = vec![
            entry("t1", "a", dec!(100), "BRL", EntrySide::Debit),
            entry("t1", "b", dec!(100), "BRL", EntrySide::Credit),
        ];
        assert!(validate_entries(&entries).is_ok());
    }

    #[test]
    fn rejects_unbalanced_totals() {
        let entries = vec![
            entry("t1", "a", dec!(100), "BRL", EntrySide::Debit),
            entry("t1", "b", dec!(50), "BRL", EntrySide::Credit),
        ];
        assert!(matches!(
            validate_entries(&entries),
            Err(ValidationError::Unbalanced(_))
        ));
    }

    #[test]
    fn rejects_currency_set_mismatch() {
        let entries = vec![
            entry("t1", "a", dec!(10), "USD", EntrySide::Debit),
            entry("t1", "b", dec!(10), "BRL", EntrySide::Credit),
        ];
        assert!(matches!(
            validate_entries(&entries),
            Err(ValidationError::CurrencySetMismatch(_))
        ));
    }

    #[test]
    fn rejects_mixed_transaction_ids() {
        let entries = vec![
            entry("t1", "a", dec!(10), "BRL", EntrySide::Debit),
            entry("t2", "b", dec!(10), "BRL", EntrySide::Credit),
        ];
        assert!(validate_entries(&entries).is_err());
    }

    #[test]
    fn balances_independently_per_currency() {
        let entries = vec![
            entry("t1", "a", dec!(10), "BRL", EntrySide::Debit),
            entry("t1", "b", dec!(10), "BRL", EntrySide::Credit),
            entry("t1", "c", dec!(5), "USD", EntrySide::Debit),
            entry("t1", "d", dec!(5), "USD", EntrySide::Credit),
        ];
        assert!(validate_entries(&entries).is_ok());
    }
}
