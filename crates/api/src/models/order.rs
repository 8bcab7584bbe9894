//! Order domain types and the stock planning step of order placement.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use rigstore_core::{OrderId, OrderStatus, ProductId, Quantity, UserId};

/// One `(product, quantity)` pair on an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: ProductId,
    pub quantity: Quantity,
}

/// A persisted order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub order_date: DateTime<Utc>,
    pub status: OrderStatus,
    pub total_amount: Decimal,
    /// Always the authenticated caller at placement time.
    pub customer_id: UserId,
    pub items: Vec<LineItem>,
}

/// A validated order that has not been placed yet.
#[derive(Debug, Clone)]
pub struct OrderDraft {
    pub customer_id: UserId,
    pub items: Vec<LineItem>,
}

impl OrderDraft {
    /// Distinct referenced products in ascending id order.
    ///
    /// Stores lock rows in this order so concurrent placements cannot deadlock.
    #[must_use]
    pub fn product_ids(&self) -> Vec<ProductId> {
        let mut ids: Vec<ProductId> = self.items.iter().map(|i| i.product_id).collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}

/// Price and stock of a product as seen inside the placement transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockSnapshot {
    pub product_id: ProductId,
    pub price: Decimal,
    pub stock: i32,
}

/// Why a placement was refused. Nothing was written.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlacementRejection {
    #[error("product {0} does not exist")]
    UnknownProduct(ProductId),

    #[error("insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: ProductId,
        requested: i64,
        available: i32,
    },

    #[error("order total is too large")]
    TotalOverflow,
}

/// What a store must apply to commit a placement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacementPlan {
    /// Server-computed total from catalog prices.
    pub total_amount: Decimal,
    /// One decrement per distinct product, ascending by id.
    pub decrements: Vec<(ProductId, i32)>,
}

/// Outcome of an atomic placement attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    Placed(Order),
    Rejected(PlacementRejection),
}

/// Check every line against the locked snapshots and compute the total.
///
/// Lines for the same product are summed before comparing against stock, so
/// splitting a request across lines cannot oversell.
///
/// # Errors
///
/// Returns the first rejection in product id order, or
/// [`PlacementRejection::TotalOverflow`] if the total does not fit a `Decimal`.
pub fn plan_placement(
    items: &[LineItem],
    snapshots: &[StockSnapshot],
) -> Result<PlacementPlan, PlacementRejection> {
    let mut requested: BTreeMap<ProductId, i64> = BTreeMap::new();
    for item in items {
        *requested.entry(item.product_id).or_insert(0) += i64::from(item.quantity.get());
    }

    let lookup = |id: ProductId| snapshots.iter().find(|s| s.product_id == id);

    let mut decrements = Vec::with_capacity(requested.len());
    for (&product_id, &wanted) in &requested {
        let snapshot = lookup(product_id).ok_or(PlacementRejection::UnknownProduct(product_id))?;
        let decrement = i32::try_from(wanted)
            .ok()
            .filter(|d| *d <= snapshot.stock)
            .ok_or(PlacementRejection::InsufficientStock {
                product_id,
                requested: wanted,
                available: snapshot.stock,
            })?;
        decrements.push((product_id, decrement));
    }

    let mut total_amount = Decimal::ZERO;
    for item in items {
        if let Some(snapshot) = lookup(item.product_id) {
            total_amount = snapshot
                .price
                .checked_mul(Decimal::from(item.quantity.get()))
                .and_then(|line| total_amount.checked_add(line))
                .ok_or(PlacementRejection::TotalOverflow)?;
        }
    }

    Ok(PlacementPlan {
        total_amount,
        decrements,
    })
}

/// Which status moves an admin update may make.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransitionPolicy {
    /// Any status to any status.
    #[default]
    Permissive,
    /// Only `Processing -> Shipped -> Delivered`.
    ForwardOnly,
}

impl TransitionPolicy {
    #[must_use]
    pub const fn allows(self, from: OrderStatus, to: OrderStatus) -> bool {
        match self {
            Self::Permissive => true,
            Self::ForwardOnly => from.can_advance_to(to),
        }
    }
}

/// Outcome of a status update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusUpdate {
    Updated { previous: OrderStatus },
    NotFound,
    Refused { current: OrderStatus },
}

/// Customer fields projected onto an order listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomerSummary {
    pub full_name: String,
    pub email: String,
}

/// Product fields projected onto a line item.
///
/// A product deleted after the order was placed projects to
/// [`ProductSummary::unavailable`] instead of failing the read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductSummary {
    pub model_name: String,
    pub price: Option<Decimal>,
    pub available: bool,
}

impl ProductSummary {
    /// Label shown for a product that no longer exists.
    pub const UNAVAILABLE_LABEL: &'static str = "Product unavailable";

    #[must_use]
    pub const fn found(model_name: String, price: Decimal) -> Self {
        Self {
            model_name,
            price: Some(price),
            available: true,
        }
    }

    #[must_use]
    pub fn unavailable() -> Self {
        Self {
            model_name: Self::UNAVAILABLE_LABEL.to_owned(),
            price: None,
            available: false,
        }
    }
}

/// A line item joined with its product's display fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineItemView {
    pub product_id: ProductId,
    pub quantity: Quantity,
    pub product: ProductSummary,
}

/// An order joined with customer and product display fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderView {
    pub id: OrderId,
    pub order_date: DateTime<Utc>,
    pub status: OrderStatus,
    pub total_amount: Decimal,
    pub customer_id: UserId,
    /// `None` when the customer record no longer resolves.
    pub customer: Option<CustomerSummary>,
    pub items: Vec<LineItemView>,
}
