use std::cmp::Ordering;
use std::fmt::Display;

use rust_decimal::Decimal;
use rust_decimal::RoundingStrategy;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("currency mismatch: {lhs} vs {rhs}")]
    CurrencyMismatch { lhs: String, rhs: String },
    #[error("operation would produce a negative amount")]
    NegativeResult,
}

/// A non-negative amount in a fixed currency, scaled to that
/// currency's ISO 4217 default fractional digits. Never backed by a
/// floating-point type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    amount: Decimal,
    currency: String,
}

/// ISO 4217 default minor-unit scale. Unlisted currencies default to 2.
fn minor_units(currency: &str) -> u32 {
    match currency {
        "JPY" | "KRW" | "VND" | "CLP" => 0,
        "BHD" | "KWD" | "OMR" | "JOD" => 3,
        _ => 2,
    }
}

impl Money {
    /// Builds a `Money` from a plain decimal amount, rescaling to the
    /// currency's default fractional digits with half-up rounding.
    pub fn new(amount: Decimal, currency: impl Into<String>) -> Self {
        let currency = currency.into().to_ascii_uppercase();
        let scale = minor_units(&currency);
        let amount = amount.round_dp_with_strategy(scale, RoundingStrategy::MidpointAwayFromZero);
        Self { amount, currency }
    }

    #[must_use]
    pub fn zero(currency: impl Into<String>) -> Self {
        Self::new(Decimal::ZERO, currency)
    }

    #[must_use]
    pub fn amount(&self) -> Decimal {
        self.amount
    }

    #[must_use]
    pub fn currency(&self) -> &str {
        &self.currency
    }

    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.amount > Decimal::ZERO
    }

    fn check_currency(&self, other: &Money) -> Result<(), MoneyError> {
        if self.currency != other.currency {
            return Err(MoneyError::CurrencyMismatch {
                lhs: self.currency.clone(),
                rhs: other.currency.clone(),
            });
        }
        Ok(())
    }

    pub fn add(&self, other: &Money) -> Result<Money, MoneyError> {
        self.check_currency(other)?;
        Ok(Money::new(self.amount + other.amount, self.currency.clone()))
    }

    /// Fails with `NegativeResult` if `self - other < 0`.
    pub fn subtract(&self, other: &Money) -> Result<Money, MoneyError> {
        self.check_currency(other)?;
        let result = self.amount - other.amount;
        if result < Decimal::ZERO {
            return Err(MoneyError::NegativeResult);
        }
        Ok(Money::new(result, self.currency.clone()))
    }

    #[must_use]
    pub fn multiply(&self, factor: Decimal) -> Money {
        Money::new(self.amount * factor, self.currency.clone())
    }

    pub fn compare(&self, other: &Money) -> Result<Ordering, MoneyError> {
        self.check_currency(other)?;
        Ok(self.amount.cmp(&other.amount))
    }
}

impl Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.amount, self.currency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    #[test]
    fn add_same_currency() {
        let a = Money::new(dec!(100.00), "BRL");
        let b = Money::new(dec!(30.00), "BRL");
        let sum = a.add(&b).expect("add");
        assert_eq!(sum.amount(), dec!(130.00));
        assert_eq!(sum.currency(), "BRL");
    }

    #[test]
    fn subtract_rejects_negative_result() {
        let a = Money::new(dec!(10.00), "BRL");
        let b = Money::new(dec!(30.00), "BRL");
        let err = a.subtract(&b).unwrap_err();
        assert_eq!(err, MoneyError::NegativeResult);
    }

    #[test]
    fn cross_currency_add_rejected() {
        let a = Money::new(dec!(10.00), "BRL");
        let b = Money::new(dec!(10.00), "USD");
        let err = a.add(&b).unwrap_err();
        assert!(matches!(err, MoneyError::CurrencyMismatch { .. }));
    }

    #[test]
    fn rescales_to_currency_default_digits() {
        let jpy = Money::new(dec!(100.5), "JPY");
        assert_eq!(jpy.amount(), dec!(101));

        let bhd = Money::new(dec!(1.23455), "BHD");
        assert_eq!(bhd.amount(), dec!(1.235));
    }

    #[test]
    fn equality_requires_same_currency_and_amount() {
        let a = Money::new(dec!(5.00), "BRL");
        let b = Money::new(dec!(5.00), "BRL");
        let c = Money::new(dec!(5.00), "USD");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
