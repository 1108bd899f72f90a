use crate::error::{GatewayError, Result};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Numeric ISO 4217 codes for the currencies the gateway is known to settle or accept.
const NUMERIC_CODES: &[(&str, u16)] = &[
    ("AMD", 51),
    ("AZN", 944),
    ("BYN", 933),
    ("CHF", 756),
    ("CNY", 156),
    ("EUR", 978),
    ("GBP", 826),
    ("GEL", 981),
    ("JPY", 392),
    ("KGS", 417),
    ("KZT", 398),
    ("RUB", 643),
    ("TRY", 949),
    ("UAH", 980),
    ("USD", 840),
    ("UZS", 860),
];

/// Alphabetic ISO 4217 currency code, always stored upper-case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    pub fn new(code: impl AsRef<str>) -> Result<Self> {
        let code = code.as_ref().trim().to_ascii_uppercase();
        if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
            Ok(Self(code))
        } else {
            Err(GatewayError::Validation(format!(
                "invalid currency code `{code}`"
            )))
        }
    }

    pub(crate) fn new_unchecked(code: &str) -> Self {
        Self(code.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The numeric ISO 4217 code sent in the `currency` form field.
    pub fn numeric(&self) -> Option<u16> {
        NUMERIC_CODES
            .iter()
            .find(|(alpha, _)| *alpha == self.0)
            .map(|(_, numeric)| *numeric)
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = GatewayError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> Self {
        code.0
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A decimal amount in major units together with its currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Money {
    pub amount: Decimal,
    pub currency: CurrencyCode,
}

impl Money {
    pub fn new(amount: Decimal, currency: CurrencyCode) -> Self {
        Self { amount, currency }
    }
}

/// A non-negative integer amount in minor currency units (kopecks, cents).
///
/// Every amount that crosses the gateway boundary goes through this type, so the
/// `×100` conversion and its rounding happen in exactly one place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MinorUnits(i64);

impl MinorUnits {
    pub const ZERO: Self = Self(0);

    pub fn new(value: i64) -> Result<Self> {
        if value >= 0 {
            Ok(Self(value))
        } else {
            Err(GatewayError::Validation(
                "Amount must not be negative".to_string(),
            ))
        }
    }

    /// Converts a major-unit amount, rounding half away from zero to the minor unit.
    pub fn from_major(amount: Decimal) -> Result<Self> {
        let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        let minor = rounded
            .checked_mul(Decimal::ONE_HUNDRED)
            .and_then(|minor| minor.to_i64())
            .ok_or_else(|| GatewayError::Validation(format!("amount {amount} is out of range")))?;
        Self::new(minor)
    }

    pub fn to_major(self) -> Decimal {
        Decimal::new(self.0, 2)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for MinorUnits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_currency_code_normalization() {
        let code = CurrencyCode::new(" usd ").unwrap();
        assert_eq!(code.as_str(), "USD");
        assert_eq!(code.numeric(), Some(840));
        assert_eq!(CurrencyCode::new("RUB").unwrap().numeric(), Some(643));
    }

    #[test]
    fn test_currency_code_rejects_garbage() {
        assert!(matches!(
            CurrencyCode::new("RU"),
            Err(GatewayError::Validation(_))
        ));
        assert!(CurrencyCode::new("R1B").is_err());
        assert_eq!(CurrencyCode::new("XTS").unwrap().numeric(), None);
    }

    #[test]
    fn test_minor_units_rounding() {
        assert_eq!(MinorUnits::from_major(dec!(1500.00)).unwrap().value(), 150000);
        assert_eq!(MinorUnits::from_major(dec!(0.005)).unwrap().value(), 1);
        assert_eq!(MinorUnits::from_major(dec!(10.124)).unwrap().value(), 1012);
        assert_eq!(MinorUnits::from_major(dec!(10.125)).unwrap().value(), 1013);
    }

    #[test]
    fn test_minor_units_out_of_range() {
        assert!(matches!(
            MinorUnits::from_major(Decimal::MAX),
            Err(GatewayError::Validation(_))
        ));
        assert!(MinorUnits::from_major(Decimal::from(100_000_000_000_000_000_i64)).is_err());
    }

    #[test]
    fn test_minor_units_rejects_negative() {
        assert!(matches!(
            MinorUnits::from_major(dec!(-1.0)),
            Err(GatewayError::Validation(_))
        ));
        assert!(MinorUnits::new(-5).is_err());
    }

    #[test]
    fn test_minor_units_to_major() {
        let minor = MinorUnits::new(13_500_000).unwrap();
        assert_eq!(minor.to_major(), dec!(135000.00));
    }

    #[test]
    fn test_money_deserializes_numbers_and_strings() {
        let money: Money = serde_json::from_str(r#"{"amount": 12.5, "currency": "eur"}"#).unwrap();
        assert_eq!(money.amount, dec!(12.5));
        assert_eq!(money.currency.as_str(), "EUR");

        let money: Money =
            serde_json::from_str(r#"{"amount": "99.99", "currency": "RUB"}"#).unwrap();
        assert_eq!(money.amount, dec!(99.99));
    }
}
