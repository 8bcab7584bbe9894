//! Catalog service: listing, admin maintenance, and reviews.

use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

use rigstore_core::{ProductId, Rating, RatingError, SortDirection};

use super::auth::AuthContext;
use crate::db::{RepositoryError, Store};
use crate::models::{NewProduct, NewReview, Product, ProductSpecs, Review};

/// Errors from catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("product not found")]
    NotFound,

    #[error("invalid product: {0}")]
    InvalidProduct(String),

    #[error(transparent)]
    InvalidRating(#[from] RatingError),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Product fields as submitted by an admin.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductDraft {
    #[serde(default)]
    pub model_name: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub stock: Option<i64>,
    #[serde(default)]
    pub specs: ProductSpecs,
}

impl ProductDraft {
    /// Largest accepted price. Matches the `NUMERIC(12, 2)` price column.
    pub const MAX_PRICE: Decimal = Decimal::from_parts(3_567_587_327, 232, 0, false, 2);

    /// Check required fields and ranges.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::InvalidProduct` when the model name is blank,
    /// the price is missing, negative, above [`Self::MAX_PRICE`] or finer than
    /// a cent, or the stock is negative.
    pub fn validate(self) -> Result<NewProduct, CatalogError> {
        let model_name = self
            .model_name
            .map(|n| n.trim().to_owned())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| CatalogError::InvalidProduct("model_name is required".to_owned()))?;

        let price = self
            .price
            .ok_or_else(|| CatalogError::InvalidProduct("price is required".to_owned()))?;
        if price < Decimal::ZERO {
            return Err(CatalogError::InvalidProduct(
                "price cannot be negative".to_owned(),
            ));
        }
        if price > Self::MAX_PRICE {
            return Err(CatalogError::InvalidProduct(format!(
                "price cannot exceed {}",
                Self::MAX_PRICE
            )));
        }
        if price.normalize().scale() > 2 {
            return Err(CatalogError::InvalidProduct(
                "price cannot have more than two decimal places".to_owned(),
            ));
        }

        let stock = i32::try_from(self.stock.unwrap_or(0))
            .ok()
            .filter(|s| *s >= 0)
            .ok_or_else(|| {
                CatalogError::InvalidProduct("stock must be a non-negative integer".to_owned())
            })?;

        Ok(NewProduct {
            model_name,
            category: self.category.unwrap_or_default(),
            price: price.round_dp(2),
            stock,
            specs: self.specs,
        })
    }
}

/// Catalog operations over a storage backend.
pub struct CatalogService<'a> {
    store: &'a dyn Store,
}

impl<'a> CatalogService<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// Products sorted by price, optionally restricted to one category.
    ///
    /// An empty category string means no filter.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the store is unreachable.
    pub async fn list(
        &self,
        category: Option<&str>,
        sort: SortDirection,
    ) -> Result<Vec<Product>, CatalogError> {
        let category = category.filter(|c| !c.is_empty());
        Ok(self.store.list_products(category, sort).await?)
    }

    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` for an unknown id.
    pub async fn get(&self, id: ProductId) -> Result<Product, CatalogError> {
        self.store
            .get_product(id)
            .await?
            .ok_or(CatalogError::NotFound)
    }

    /// Validate and insert a product. The caller must already hold the admin role.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::InvalidProduct` for missing or out-of-range fields.
    pub async fn create(&self, draft: ProductDraft) -> Result<Product, CatalogError> {
        let product = self.store.create_product(draft.validate()?).await?;
        tracing::info!(product_id = %product.id, "product created");
        Ok(product)
    }

    /// Delete a product. Deleting a missing id is not an error.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the store is unreachable.
    pub async fn delete(&self, id: ProductId) -> Result<(), CatalogError> {
        if self.store.delete_product(id).await? {
            tracing::info!(product_id = %id, "product deleted");
        } else {
            tracing::debug!(product_id = %id, "delete of missing product");
        }
        Ok(())
    }

    /// Append a review authored by the caller.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::InvalidRating` for a rating outside `1..=5`
    /// and `CatalogError::NotFound` for an unknown product.
    pub async fn append_review(
        &self,
        id: ProductId,
        caller: &AuthContext,
        rating: i64,
        comment: String,
    ) -> Result<Review, CatalogError> {
        let rating = Rating::new(rating)?;
        self.store
            .append_review(
                id,
                NewReview {
                    author: caller.display_name.clone(),
                    rating,
                    comment,
                },
            )
            .await?
            .ok_or(CatalogError::NotFound)
    }
}
