//! Catalog and review queries.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Postgres, Transaction};

use rigstore_core::{ProductId, Rating, SortDirection};

use super::PgStore;
use crate::db::{CatalogStore, RepositoryError};
use crate::models::{NewProduct, NewReview, Product, ProductSpecs, Review};

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    model_name: String,
    category: String,
    price: Decimal,
    stock: i32,
    cpu: Option<String>,
    gpu: Option<String>,
    ram: Option<String>,
    ssd: Option<String>,
}

impl ProductRow {
    fn into_product(self, reviews: Vec<Review>) -> Product {
        Product {
            id: self.id,
            model_name: self.model_name,
            category: self.category,
            price: self.price,
            stock: self.stock,
            specs: ProductSpecs {
                cpu: self.cpu,
                gpu: self.gpu,
                ram: self.ram,
                ssd: self.ssd,
            },
            reviews,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ReviewRow {
    product_id: ProductId,
    author: String,
    rating: i16,
    comment: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<ReviewRow> for Review {
    type Error = RepositoryError;

    fn try_from(row: ReviewRow) -> Result<Self, Self::Error> {
        let rating = Rating::new(i64::from(row.rating)).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid rating in database: {e}"))
        })?;

        Ok(Self {
            user: row.author,
            rating,
            comment: row.comment,
            date: row.created_at,
        })
    }
}

const PRODUCT_COLUMNS: &str = "id, model_name, category, price, stock, cpu, gpu, ram, ssd";

/// Load reviews for `rows` and attach them in append order.
async fn with_reviews(
    tx: &mut Transaction<'_, Postgres>,
    rows: Vec<ProductRow>,
) -> Result<Vec<Product>, RepositoryError> {
    let ids: Vec<i64> = rows.iter().map(|r| r.id.as_i64()).collect();
    let review_rows = sqlx::query_as::<_, ReviewRow>(
        r"
        SELECT product_id, author, rating, comment, created_at
        FROM product_reviews
        WHERE product_id = ANY($1)
        ORDER BY id
        ",
    )
    .bind(&ids)
    .fetch_all(&mut **tx)
    .await?;

    let mut reviews: HashMap<ProductId, Vec<Review>> = HashMap::new();
    for row in review_rows {
        reviews
            .entry(row.product_id)
            .or_default()
            .push(row.try_into()?);
    }

    Ok(rows
        .into_iter()
        .map(|row| {
            let own = reviews.remove(&row.id).unwrap_or_default();
            row.into_product(own)
        })
        .collect())
}

async fn begin_snapshot(pool: &sqlx::PgPool) -> Result<Transaction<'static, Postgres>, RepositoryError> {
    let mut tx = pool.begin().await?;
    sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
        .execute(&mut *tx)
        .await?;
    Ok(tx)
}

#[async_trait]
impl CatalogStore for PgStore {
    async fn list_products(
        &self,
        category: Option<&str>,
        sort: SortDirection,
    ) -> Result<Vec<Product>, RepositoryError> {
        let order = match sort {
            SortDirection::Asc => "price ASC, id ASC",
            SortDirection::Desc => "price DESC, id ASC",
        };
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE ($1::text IS NULL OR category = $1) \
             ORDER BY {order}"
        );

        let mut tx = begin_snapshot(&self.pool).await?;
        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(category)
            .fetch_all(&mut *tx)
            .await?;
        let products = with_reviews(&mut tx, rows).await?;
        tx.commit().await?;
        Ok(products)
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let mut tx = begin_snapshot(&self.pool).await?;
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let product = match row {
            Some(row) => with_reviews(&mut tx, vec![row]).await?.pop(),
            None => None,
        };
        tx.commit().await?;
        Ok(product)
    }

    async fn create_product(&self, product: NewProduct) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "INSERT INTO products (model_name, category, price, stock, cpu, gpu, ram, ssd) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(&product.model_name)
        .bind(&product.category)
        .bind(product.price)
        .bind(product.stock)
        .bind(&product.specs.cpu)
        .bind(&product.specs.gpu)
        .bind(&product.specs.ram)
        .bind(&product.specs.ssd)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into_product(Vec::new()))
    }

    async fn delete_product(&self, id: ProductId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn append_review(
        &self,
        id: ProductId,
        review: NewReview,
    ) -> Result<Option<Review>, RepositoryError> {
        // A single INSERT is atomic on its own; concurrent appends each get a row.
        let inserted = sqlx::query_as::<_, ReviewRow>(
            r"
            INSERT INTO product_reviews (product_id, author, rating, comment)
            VALUES ($1, $2, $3, $4)
            RETURNING product_id, author, rating, comment, created_at
            ",
        )
        .bind(id)
        .bind(&review.author)
        .bind(i16::from(review.rating.get()))
        .bind(&review.comment)
        .fetch_one(&self.pool)
        .await;

        match inserted {
            Ok(row) => Ok(Some(row.try_into()?)),
            Err(sqlx::Error::Database(db_err)) if db_err.is_foreign_key_violation() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::db::postgres::test_support;

    fn desktop(name: &str, price: i64) -> NewProduct {
        NewProduct {
            model_name: name.to_owned(),
            category: "desktop".to_owned(),
            price: Decimal::from(price),
            stock: 4,
            specs: ProductSpecs {
                cpu: Some("Ryzen 7".to_owned()),
                ..ProductSpecs::default()
            },
        }
    }

    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL"]
    async fn test_list_sorted_by_price() {
        let store = test_support::store().await;
        store.create_product(desktop("Cheap", 500)).await.unwrap();
        store.create_product(desktop("Pricey", 2500)).await.unwrap();

        let listed = store
            .list_products(Some("desktop"), SortDirection::Desc)
            .await
            .unwrap();
        assert_eq!(listed[0].model_name, "Pricey");
        assert_eq!(listed[0].specs.cpu.as_deref(), Some("Ryzen 7"));
        assert!(store
            .list_products(Some("laptop"), SortDirection::Desc)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL"]
    async fn test_concurrent_reviews_all_land() {
        let store = Arc::new(test_support::store().await);
        let id = store.create_product(desktop("Box", 900)).await.unwrap().id;

        let tasks: Vec<_> = (0..20_i64)
            .map(|i| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    store
                        .append_review(
                            id,
                            NewReview {
                                author: format!("reviewer-{i}"),
                                rating: Rating::new(4).unwrap(),
                                comment: "solid".to_owned(),
                            },
                        )
                        .await
                        .unwrap()
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        let product = store.get_product(id).await.unwrap().unwrap();
        assert_eq!(product.reviews.len(), 20);
    }

    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL"]
    async fn test_review_on_missing_product() {
        let store = test_support::store().await;
        let review = NewReview {
            author: "x".to_owned(),
            rating: Rating::new(3).unwrap(),
            comment: String::new(),
        };
        assert!(store
            .append_review(ProductId::new(999), review)
            .await
            .unwrap()
            .is_none());
    }
}
