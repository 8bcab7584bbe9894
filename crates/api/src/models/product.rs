//! Catalog domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use rigstore_core::{ProductId, Rating};

/// Hardware spec block embedded in every product.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProductSpecs {
    #[serde(default)]
    pub cpu: Option<String>,
    #[serde(default)]
    pub gpu: Option<String>,
    #[serde(default)]
    pub ram: Option<String>,
    #[serde(default)]
    pub ssd: Option<String>,
}

/// A customer review. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Review {
    /// Display name of the author, taken from their session.
    pub user: String,
    pub rating: Rating,
    pub comment: String,
    /// Set by the store at append time.
    pub date: DateTime<Utc>,
}

/// A catalog entry with its reviews in chronological order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Product {
    pub id: ProductId,
    pub model_name: String,
    pub category: String,
    pub price: Decimal,
    /// Units on hand. Never negative.
    pub stock: i32,
    pub specs: ProductSpecs,
    pub reviews: Vec<Review>,
}

/// Validated insert payload for a product.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub model_name: String,
    pub category: String,
    pub price: Decimal,
    pub stock: i32,
    pub specs: ProductSpecs,
}

/// Validated review to append.
#[derive(Debug, Clone)]
pub struct NewReview {
    pub author: String,
    pub rating: Rating,
    pub comment: String,
}
