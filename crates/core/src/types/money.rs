//! Rupee amounts using decimal arithmetic.
//!
//! All prices and order amounts are Indian rupees with two decimal places.
//! The payment gateway works in paise (1/100 rupee), so conversion lives here
//! next to the type rather than in each caller.

use std::fmt;
use std::iter::Sum;
use std::ops::Add;
use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced when parsing or converting a rupee amount.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoneyError {
    /// The input was not a decimal number.
    #[error("invalid amount: {0}")]
    Invalid(String),

    /// Amounts are never negative.
    #[error("amount cannot be negative")]
    Negative,

    /// A payment must be for more than zero rupees.
    #[error("amount must be greater than zero")]
    Zero,

    /// The amount does not fit the gateway's integer representation.
    #[error("amount is too large")]
    Overflow,
}

/// An amount in Indian rupees (INR).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    /// Zero rupees.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Wrap a decimal rupee amount.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Build an amount from a whole number of paise.
    #[must_use]
    pub fn from_paise(paise: i64) -> Self {
        Self(Decimal::new(paise, 2))
    }

    /// The underlying decimal value.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Whether this amount is less than zero.
    #[must_use]
    pub const fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    /// Parse a user-entered price, rounding to two decimal places.
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::Invalid` for non-numeric input and
    /// `MoneyError::Negative` for amounts below zero.
    pub fn parse(input: &str) -> Result<Self, MoneyError> {
        let trimmed = input.trim().trim_start_matches('₹').trim();
        let value = Decimal::from_str(trimmed)
            .map_err(|_| MoneyError::Invalid(input.trim().to_string()))?;
        let money = Self(value.round_dp(2));
        if money.is_negative() {
            return Err(MoneyError::Negative);
        }
        Ok(money)
    }

    /// Convert to paise for the payment gateway.
    ///
    /// Rounds half away from zero, so ₹99.995 becomes 10000 paise.
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::Zero` or `MoneyError::Negative` when the amount
    /// cannot be charged, and `MoneyError::Overflow` if it exceeds `i64`.
    pub fn to_paise(&self) -> Result<i64, MoneyError> {
        if self.is_negative() {
            return Err(MoneyError::Negative);
        }
        let paise = (self.0 * Decimal::ONE_HUNDRED).round_dp_with_strategy(
            0,
            rust_decimal::RoundingStrategy::MidpointAwayFromZero,
        );
        if paise.is_zero() {
            return Err(MoneyError::Zero);
        }
        paise.to_i64().ok_or(MoneyError::Overflow)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "₹{:.2}", self.0)
    }
}

impl FromStr for Money {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Self> for Money {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Money {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <Decimal as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <Decimal as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Money {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let amount = <Decimal as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self(amount))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Money {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <Decimal as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rounds_to_two_places() {
        let money = Money::parse("120.456").unwrap();
        assert_eq!(money.amount(), Decimal::new(12046, 2));
    }

    #[test]
    fn test_parse_accepts_rupee_sign() {
        assert_eq!(Money::parse("₹80").unwrap(), Money::new(Decimal::from(80)));
    }

    #[test]
    fn test_parse_rejects_negative() {
        assert_eq!(Money::parse("-1"), Err(MoneyError::Negative));
    }

    #[test]
    fn test_parse_rejects_text() {
        assert!(matches!(Money::parse("free"), Err(MoneyError::Invalid(_))));
    }

    #[test]
    fn test_to_paise_whole_rupees() {
        assert_eq!(Money::new(Decimal::from(150)).to_paise().unwrap(), 15_000);
    }

    #[test]
    fn test_to_paise_rounds_half_away_from_zero() {
        let money = Money::new(Decimal::new(99_995, 3));
        assert_eq!(money.to_paise().unwrap(), 10_000);
    }

    #[test]
    fn test_to_paise_rejects_zero() {
        assert_eq!(Money::ZERO.to_paise(), Err(MoneyError::Zero));
    }

    #[test]
    fn test_from_paise() {
        assert_eq!(Money::from_paise(12_050), Money::new(Decimal::new(12_050, 2)));
        assert_eq!(Money::from_paise(-5).amount(), Decimal::new(-5, 2));
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::new(Decimal::new(1205, 1)).to_string(), "₹120.50");
    }

    #[test]
    fn test_sum() {
        let total: Money = [Money::from_paise(100), Money::from_paise(250)]
            .iter()
            .sum();
        assert_eq!(total, Money::from_paise(350));
    }
}
