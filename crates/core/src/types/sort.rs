//! Listing sort order.

use serde::{Deserialize, Serialize};

/// Direction of the price sort on catalog listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Cheapest first.
    Asc,
    /// Most expensive first.
    #[default]
    Desc,
}

impl SortDirection {
    /// Apply the direction to an ascending comparison.
    #[must_use]
    pub const fn apply(self, ordering: std::cmp::Ordering) -> std::cmp::Ordering {
        match self {
            Self::Asc => ordering,
            Self::Desc => ordering.reverse(),
        }
    }
}
