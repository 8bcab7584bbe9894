//! Line-item quantity.

use serde::{Deserialize, Serialize};

/// Error returned for a non-positive or oversized quantity.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("quantity must be a positive integer (got {0})")]
pub struct QuantityError(pub i64);

/// A strictly positive number of units on an order line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Quantity(i32);

impl Quantity {
    /// Validate a raw quantity.
    ///
    /// # Errors
    ///
    /// Returns `QuantityError` when `value < 1` or it does not fit a stock counter.
    pub fn new(value: i64) -> Result<Self, QuantityError> {
        i32::try_from(value)
            .ok()
            .filter(|v| *v >= 1)
            .map(Self)
            .ok_or(QuantityError(value))
    }

    /// Units as the stock counter's integer type.
    #[must_use]
    pub const fn get(self) -> i32 {
        self.0
    }
}

impl TryFrom<i64> for Quantity {
    type Error = QuantityError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Quantity> for i64 {
    fn from(q: Quantity) -> Self {
        Self::from(q.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positive_only() {
        assert!(Quantity::new(1).is_ok());
        assert!(Quantity::new(0).is_err());
        assert!(Quantity::new(-2).is_err());
        assert!(Quantity::new(i64::MAX).is_err());
    }

    #[test]
    fn test_deserialize_rejects_zero() {
        assert!(serde_json::from_str::<Quantity>("0").is_err());
        assert_eq!(serde_json::from_str::<Quantity>("3").ok(), Quantity::new(3).ok());
    }
}
