//! Money helpers built on decimal arithmetic.
//!
//! Prices are held as [`Decimal`] in the currency's major unit (rupees, not
//! paise). The payment gateway wants integer minor units, which
//! [`to_minor_units`] produces.

use core::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// Errors from price and discount arithmetic.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// A discount outside `0..=100`.
    #[error("discount percent must be between 0 and 100, got {0}")]
    InvalidPercent(i64),
    /// Negative amounts cannot be charged.
    #[error("amount cannot be negative")]
    Negative,
    /// The amount does not fit the gateway's integer representation.
    #[error("amount is too large")]
    Overflow,
    /// An unrecognised ISO 4217 code.
    #[error("unsupported currency: {0}")]
    UnsupportedCurrency(String),
}

/// ISO 4217 currency codes the store can charge in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    INR,
    USD,
    EUR,
    GBP,
}

impl CurrencyCode {
    /// The three-letter code sent to the payment gateway.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::INR => "INR",
            Self::USD => "USD",
            Self::EUR => "EUR",
            Self::GBP => "GBP",
        }
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for CurrencyCode {
    type Err = PriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "INR" => Ok(Self::INR),
            "USD" => Ok(Self::USD),
            "EUR" => Ok(Self::EUR),
            "GBP" => Ok(Self::GBP),
            other => Err(PriceError::UnsupportedCurrency(other.to_owned())),
        }
    }
}

/// A validated discount percentage in `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize)]
#[serde(transparent)]
pub struct DiscountPercent(u8);

impl DiscountPercent {
    /// No discount.
    pub const ZERO: Self = Self(0);

    /// Validate a percentage.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::InvalidPercent`] when outside `0..=100`.
    pub fn new(percent: i64) -> Result<Self, PriceError> {
        u8::try_from(percent)
            .ok()
            .filter(|p| *p <= 100)
            .map(Self)
            .ok_or(PriceError::InvalidPercent(percent))
    }

    #[must_use]
    pub const fn get(&self) -> u8 {
        self.0
    }
}

impl<'de> Deserialize<'de> for DiscountPercent {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = i64::deserialize(deserializer)?;
        Self::new(raw).map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for DiscountPercent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

/// Apply a percentage discount: `total * (1 - percent / 100)`.
///
/// The result is never negative, even for a negative `total`.
#[must_use]
pub fn discounted_total(total: Decimal, percent: DiscountPercent) -> Decimal {
    let factor = Decimal::ONE - Decimal::from(percent.get()) / Decimal::ONE_HUNDRED;
    (total * factor).max(Decimal::ZERO)
}

/// Convert a major-unit amount to integer minor units (paise, cents).
///
/// The amount is rounded to two decimal places first.
///
/// # Errors
///
/// Returns [`PriceError::Negative`] for negative input and
/// [`PriceError::Overflow`] when the result exceeds `i64`.
pub fn to_minor_units(amount: Decimal) -> Result<i64, PriceError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(PriceError::Negative);
    }
    amount
        .round_dp(2)
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|minor| minor.to_i64())
        .ok_or(PriceError::Overflow)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn percent(p: i64) -> DiscountPercent {
        DiscountPercent::new(p).unwrap()
    }

    #[test]
    fn test_discount_ten_percent_of_thousand() {
        assert_eq!(
            discounted_total(Decimal::from(1000), percent(10)),
            Decimal::from(900)
        );
    }

    #[test]
    fn test_zero_discount_is_identity() {
        let total = Decimal::new(123_45, 2);
        assert_eq!(discounted_total(total, DiscountPercent::ZERO), total);
    }

    #[test]
    fn test_full_discount_is_zero() {
        assert_eq!(
            discounted_total(Decimal::from(499), percent(100)),
            Decimal::ZERO
        );
    }

    #[test]
    fn test_discount_never_negative() {
        assert_eq!(
            discounted_total(Decimal::from(-5), percent(20)),
            Decimal::ZERO
        );
    }

    #[test]
    fn test_percent_bounds() {
        assert!(DiscountPercent::new(101).is_err());
        assert!(DiscountPercent::new(-1).is_err());
        assert_eq!(percent(100).get(), 100);
    }

    #[test]
    fn test_percent_deserialize_validates() {
        assert!(serde_json::from_str::<DiscountPercent>("20").is_ok());
        assert!(serde_json::from_str::<DiscountPercent>("250").is_err());
    }

    #[test]
    fn test_minor_units() {
        assert_eq!(to_minor_units(Decimal::from(900)).unwrap(), 90_000);
        assert_eq!(to_minor_units(Decimal::new(19_999, 3)).unwrap(), 2000);
        assert_eq!(to_minor_units(Decimal::ZERO).unwrap(), 0);
        assert_eq!(
            to_minor_units(Decimal::from(-1)),
            Err(PriceError::Negative)
        );
    }

    #[test]
    fn test_currency_parse() {
        assert_eq!("inr".parse::<CurrencyCode>().unwrap(), CurrencyCode::INR);
        assert_eq!(CurrencyCode::default().to_string(), "INR");
        assert!("XYZ".parse::<CurrencyCode>().is_err());
    }
}
