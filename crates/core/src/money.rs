use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::{Add, Mul, Sub};

/// A currency amount, always held at two decimal places.
///
/// Serializes as a plain JSON number; anything read back is rounded to cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Money(Decimal);

impl Money {
    pub fn from_cents(cents: i64) -> Self {
        Money(Decimal::new(cents, 2))
    }

    pub fn to_cents(self) -> i64 {
        (self.0 * Decimal::from(100)).to_i64().unwrap_or(0)
    }

    pub fn from_decimal(decimal: Decimal) -> Self {
        Money(decimal.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
    }

    pub fn zero() -> Self {
        Money(Decimal::ZERO)
    }

    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    pub fn as_decimal(self) -> Decimal {
        self.0
    }

    /// Per-unit share of a multi-unit amount ("2 for $5.00" -> $2.50), rounded
    /// half away from zero. A zero divisor is treated as one.
    pub fn split(self, units: u32) -> Money {
        Money::from_decimal(self.0 / Decimal::from(units.max(1)))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:.2}", self.0)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        rust_decimal::serde::float::serialize(&self.0, serializer)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        rust_decimal::serde::float::deserialize(deserializer).map(Money::from_decimal)
    }
}

impl Add for Money {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Money(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Money(self.0 - rhs.0)
    }
}

impl Mul<u32> for Money {
    type Output = Self;
    fn mul(self, rhs: u32) -> Self {
        Money(self.0 * Decimal::from(rhs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn cents_roundtrip() {
        assert_eq!(Money::from_cents(4217).to_cents(), 4217);
        assert_eq!(Money::from_cents(4217).to_string(), "$42.17");
    }

    #[test]
    fn from_decimal_rounds_half_away_from_zero() {
        let m = Money::from_decimal(Decimal::from_str("0.125").unwrap());
        assert_eq!(m.to_cents(), 13);
    }

    #[test]
    fn split_deal_total() {
        assert_eq!(Money::from_cents(500).split(2), Money::from_cents(250));
        assert_eq!(Money::from_cents(500).split(3), Money::from_cents(167));
        assert_eq!(Money::from_cents(500).split(0), Money::from_cents(500));
    }

    #[test]
    fn json_is_a_number() {
        let json = serde_json::to_value(Money::from_cents(1417)).unwrap();
        assert!(json.is_number());
        assert_eq!(json, 14.17);
        let back: Money = serde_json::from_str("2.499").unwrap();
        assert_eq!(back, Money::from_cents(250));
        assert!(serde_json::from_str::<Money>("\"abc\"").is_err());
    }

    #[test]
    fn arithmetic() {
        let a = Money::from_cents(199);
        assert_eq!(a * 3, Money::from_cents(597));
        assert_eq!(a + a - a, a);
        assert!(Money::zero().is_zero());
        assert!((Money::zero() - a).is_negative());
    }
}
