//! Order lifecycle status.

use serde::{Deserialize, Serialize};

/// Error returned when a status string is not one of the known values.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid order status: {0} (expected Processing, Shipped, or Delivered)")]
pub struct StatusParseError(pub String);

/// Fulfilment status of an order.
///
/// The forward lifecycle is `Processing -> Shipped -> Delivered`. Whether
/// other moves are allowed is a deployment decision; see
/// [`OrderStatus::can_advance_to`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(feature = "postgres", sqlx(type_name = "order_status"))]
pub enum OrderStatus {
    #[default]
    Processing,
    Shipped,
    Delivered,
}

impl OrderStatus {
    /// All statuses in lifecycle order.
    pub const ALL: [Self; 3] = [Self::Processing, Self::Shipped, Self::Delivered];

    /// Whether `next` is reachable under the strict forward-only lifecycle.
    ///
    /// Staying on the same status is allowed so repeated updates are harmless.
    #[must_use]
    pub const fn can_advance_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Processing, Self::Processing | Self::Shipped)
                | (Self::Shipped, Self::Shipped | Self::Delivered)
                | (Self::Delivered, Self::Delivered)
        )
    }

    /// Wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Processing => "Processing",
            Self::Shipped => "Shipped",
            Self::Delivered => "Delivered",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| StatusParseError(s.to_owned()))
    }
}
