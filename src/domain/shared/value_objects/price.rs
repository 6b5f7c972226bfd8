//! Price value object for cash amounts, trade prices, and position cost basis.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};

use crate::domain::shared::DomainError;

/// A decimal monetary amount: a price, a cash balance, a fee, or a cost basis.
///
/// Represented as a `Decimal` so repeated fills never accumulate floating-point
/// drift in a user's cash position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// Create a new Price value from a Decimal.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Create a Price from an f64.
    ///
    /// # Panics
    ///
    /// Panics if the f64 cannot be converted to Decimal (NaN, infinite).
    #[must_use]
    pub fn from_f64(amount: f64) -> Self {
        Self(Decimal::try_from(amount).expect("finite f64"))
    }

    /// Zero amount.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Get the inner Decimal value.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Returns true if this amount is strictly positive.
    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Returns true if this amount is strictly negative.
    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// Returns true if this amount is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == Decimal::ZERO
    }

    /// Absolute value.
    #[must_use]
    pub fn abs(&self) -> Self {
        Self(self.0.abs())
    }

    /// Round to 2 decimal places for display.
    #[must_use]
    pub fn round(&self) -> Self {
        Self(self.0.round_dp(2))
    }

    /// Validate a price supplied for order placement or a tick update.
    ///
    /// # Errors
    ///
    /// Returns an error if the price is not strictly positive.
    pub fn validate_for_order(&self) -> Result<(), DomainError> {
        if !self.is_positive() {
            return Err(DomainError::InvalidValue {
                field: "price".to_string(),
                message: "price must be positive".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for Price {
    fn default() -> Self {
        Self::ZERO
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl PartialOrd for Price {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Price {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Price {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl Neg for Price {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self(-self.0)
    }
}

impl Mul<Decimal> for Price {
    type Output = Self;

    fn mul(self, rhs: Decimal) -> Self::Output {
        Self(self.0 * rhs)
    }
}

impl From<Decimal> for Price {
    fn from(value: Decimal) -> Self {
        Self(value)
    }
}

impl From<Price> for Decimal {
    fn from(value: Price) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_new_and_display() {
        let p = Price::new(Decimal::new(15050, 2));
        assert_eq!(format!("{p}"), "150.50");
    }

    #[test]
    fn price_from_f64() {
        let p = Price::from_f64(100.0);
        assert_eq!(p.amount(), Decimal::try_from(100.0).unwrap());
    }

    #[test]
    fn price_zero() {
        assert!(Price::ZERO.is_zero());
        assert!(!Price::ZERO.is_positive());
    }

    #[test]
    fn price_positive_negative() {
        let pos = Price::from_f64(100.0);
        let neg = Price::from_f64(-50.0);
        assert!(pos.is_positive());
        assert!(neg.is_negative());
    }

    #[test]
    fn price_abs() {
        let neg = Price::from_f64(-100.0);
        assert_eq!(neg.abs(), Price::from_f64(100.0));
    }

    #[test]
    fn price_round() {
        let p = Price::new(Decimal::new(150555, 3));
        assert_eq!(p.round().amount(), Decimal::new(15056, 2));
    }

    #[test]
    fn price_arithmetic() {
        let a = Price::from_f64(100.0);
        let b = Price::from_f64(50.0);
        assert_eq!((a + b).amount(), Decimal::try_from(150.0).unwrap());
        assert_eq!((a - b).amount(), Decimal::try_from(50.0).unwrap());
        assert_eq!((-a).amount(), Decimal::try_from(-100.0).unwrap());
    }

    #[test]
    fn price_multiply_by_decimal() {
        let p = Price::from_f64(100.0);
        let result = p * Decimal::new(2, 0);
        assert_eq!(result.amount(), Decimal::try_from(200.0).unwrap());
    }

    #[test]
    fn price_ordering() {
        let a = Price::from_f64(100.0);
        let b = Price::from_f64(50.0);
        assert!(a > b);
        assert!(b < a);
    }

    #[test]
    fn price_validate_for_order_rejects_non_positive() {
        assert!(Price::ZERO.validate_for_order().is_err());
        assert!(Price::from_f64(-1.0).validate_for_order().is_err());
    }

    #[test]
    fn price_validate_for_order_accepts_positive() {
        assert!(Price::from_f64(100.0).validate_for_order().is_ok());
    }

    #[test]
    fn price_serde_roundtrip() {
        let p = Price::from_f64(150.50);
        let json = serde_json::to_string(&p).unwrap();
        let parsed: Price = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, p);
    }
}
