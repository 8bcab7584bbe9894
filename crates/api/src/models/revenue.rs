//! Revenue report rows.

use rust_decimal::Decimal;
use serde::Serialize;

/// One fulfilled line item joined with its product's category and price.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevenueLine {
    pub category: String,
    pub unit_price: Decimal,
    pub quantity: i32,
}

/// Revenue for one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryRevenue {
    pub category: String,
    /// Sum of `price * quantity`.
    pub total: Decimal,
    /// Units sold.
    pub count: i64,
}
