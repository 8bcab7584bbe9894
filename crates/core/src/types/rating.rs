//! Review star rating.

use serde::{Deserialize, Serialize};

/// Error returned for a rating outside `1..=5`.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("rating must be between {min} and {max} (got {got})", min = Rating::MIN, max = Rating::MAX)]
pub struct RatingError {
    /// The rejected value.
    pub got: i64,
}

/// A review rating, guaranteed to satisfy `1 <= rating <= 5`.
///
/// ```
/// use rigstore_core::Rating;
///
/// assert!(Rating::new(5).is_ok());
/// assert!(Rating::new(0).is_err());
/// assert!(Rating::new(6).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Rating(u8);

impl Rating {
    /// Lowest accepted rating.
    pub const MIN: u8 = 1;
    /// Highest accepted rating.
    pub const MAX: u8 = 5;

    /// Validate a raw rating.
    ///
    /// # Errors
    ///
    /// Returns `RatingError` when `value` is outside `1..=5`.
    pub fn new(value: i64) -> Result<Self, RatingError> {
        u8::try_from(value)
            .ok()
            .filter(|v| (Self::MIN..=Self::MAX).contains(v))
            .map(Self)
            .ok_or(RatingError { got: value })
    }

    /// The rating as a plain integer.
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for Rating {
    type Error = RatingError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Rating> for i64 {
    fn from(rating: Rating) -> Self {
        Self::from(rating.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_exactly_one_through_five() {
        for r in -3..=10 {
            assert_eq!(Rating::new(r).is_ok(), (1..=5).contains(&r), "rating {r}");
        }
    }

    #[test]
    fn test_error_reports_value() {
        let err = Rating::new(6).unwrap_err();
        assert_eq!(err.got, 6);
        assert_eq!(err.to_string(), "rating must be between 1 and 5 (got 6)");
    }

    #[test]
    fn test_rejects_huge_values() {
        assert!(Rating::new(i64::from(u8::MAX) + 1).is_err());
    }
}
