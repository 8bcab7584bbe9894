//! Order placement, status updates, and order projections.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use rigstore_core::{OrderId, OrderStatus, ProductId, Quantity, UserId};

use super::PgStore;
use crate::db::{OrderStore, RepositoryError};
use crate::models::{
    CustomerSummary, LineItem, LineItemView, Order, OrderDraft, OrderView, Placement,
    ProductSummary, RevenueLine, StatusUpdate, StockSnapshot, TransitionPolicy, plan_placement,
};

#[derive(sqlx::FromRow)]
struct StockRow {
    id: ProductId,
    price: Decimal,
    stock: i32,
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    order_date: DateTime<Utc>,
    status: OrderStatus,
    total_amount: Decimal,
    customer_id: UserId,
}

#[derive(sqlx::FromRow)]
struct OrderViewRow {
    #[sqlx(flatten)]
    order: OrderRow,
    full_name: Option<String>,
    email: Option<String>,
}

#[derive(sqlx::FromRow)]
struct ItemViewRow {
    order_id: OrderId,
    product_id: ProductId,
    quantity: i32,
    model_name: Option<String>,
    price: Option<Decimal>,
}

#[derive(sqlx::FromRow)]
struct RevenueRow {
    category: String,
    price: Decimal,
    quantity: i32,
}

fn quantity(raw: i32) -> Result<Quantity, RepositoryError> {
    Quantity::new(i64::from(raw)).map_err(|e| {
        RepositoryError::DataCorruption(format!("invalid quantity in database: {e}"))
    })
}

#[async_trait]
impl OrderStore for PgStore {
    async fn place_order(&self, draft: &OrderDraft) -> Result<Placement, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        // Row locks are taken in id order so two placements never wait on each other in a cycle.
        let ids: Vec<i64> = draft.product_ids().iter().map(ProductId::as_i64).collect();
        let snapshots: Vec<StockSnapshot> = sqlx::query_as::<_, StockRow>(
            r"
            SELECT id, price, stock
            FROM products
            WHERE id = ANY($1)
            ORDER BY id
            FOR UPDATE
            ",
        )
        .bind(&ids)
        .fetch_all(&mut *tx)
        .await?
        .into_iter()
        .map(|r| StockSnapshot {
            product_id: r.id,
            price: r.price,
            stock: r.stock,
        })
        .collect();

        let plan = match plan_placement(&draft.items, &snapshots) {
            Ok(plan) => plan,
            Err(rejection) => {
                tx.rollback().await?;
                return Ok(Placement::Rejected(rejection));
            }
        };

        for (product_id, decrement) in &plan.decrements {
            sqlx::query("UPDATE products SET stock = stock - $2 WHERE id = $1")
                .bind(product_id)
                .bind(decrement)
                .execute(&mut *tx)
                .await?;
        }

        let row = sqlx::query_as::<_, OrderRow>(
            r"
            INSERT INTO orders (status, total_amount, customer_id)
            VALUES ($1, $2, $3)
            RETURNING id, order_date, status, total_amount, customer_id
            ",
        )
        .bind(OrderStatus::Processing)
        .bind(plan.total_amount)
        .bind(draft.customer_id)
        .fetch_one(&mut *tx)
        .await?;

        for (position, item) in (0_i32..).zip(&draft.items) {
            sqlx::query(
                r"
                INSERT INTO order_items (order_id, position, product_id, quantity)
                VALUES ($1, $2, $3, $4)
                ",
            )
            .bind(row.id)
            .bind(position)
            .bind(item.product_id)
            .bind(item.quantity.get())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(Placement::Placed(Order {
            id: row.id,
            order_date: row.order_date,
            status: row.status,
            total_amount: row.total_amount,
            customer_id: row.customer_id,
            items: draft.items.clone(),
        }))
    }

    async fn update_status(
        &self,
        id: OrderId,
        status: OrderStatus,
        policy: TransitionPolicy,
    ) -> Result<StatusUpdate, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let current: Option<OrderStatus> =
            sqlx::query_scalar("SELECT status FROM orders WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;

        let Some(previous) = current else {
            tx.rollback().await?;
            return Ok(StatusUpdate::NotFound);
        };

        if !policy.allows(previous, status) {
            tx.rollback().await?;
            return Ok(StatusUpdate::Refused { current: previous });
        }

        sqlx::query("UPDATE orders SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(StatusUpdate::Updated { previous })
    }

    async fn list_order_views(
        &self,
        customer: Option<UserId>,
    ) -> Result<Vec<OrderView>, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await?;

        let orders = sqlx::query_as::<_, OrderViewRow>(
            r"
            SELECT o.id, o.order_date, o.status, o.total_amount, o.customer_id,
                   u.full_name, u.email
            FROM orders o
            LEFT JOIN users u ON u.id = o.customer_id
            WHERE ($1::bigint IS NULL OR o.customer_id = $1)
            ORDER BY o.order_date DESC, o.id DESC
            ",
        )
        .bind(customer)
        .fetch_all(&mut *tx)
        .await?;

        let order_ids: Vec<i64> = orders.iter().map(|o| o.order.id.as_i64()).collect();
        let items = sqlx::query_as::<_, ItemViewRow>(
            r"
            SELECT i.order_id, i.product_id, i.quantity, p.model_name, p.price
            FROM order_items i
            LEFT JOIN products p ON p.id = i.product_id
            WHERE i.order_id = ANY($1)
            ORDER BY i.order_id, i.position
            ",
        )
        .bind(&order_ids)
        .fetch_all(&mut *tx)
        .await?;
        tx.commit().await?;

        let mut lines: HashMap<OrderId, Vec<LineItemView>> = HashMap::new();
        for item in items {
            let product = match (item.model_name, item.price) {
                (Some(name), Some(price)) => ProductSummary::found(name, price),
                _ => ProductSummary::unavailable(),
            };
            lines.entry(item.order_id).or_default().push(LineItemView {
                product_id: item.product_id,
                quantity: quantity(item.quantity)?,
                product,
            });
        }

        Ok(orders
            .into_iter()
            .map(|row| {
                let customer = match (row.full_name, row.email) {
                    (Some(full_name), Some(email)) => Some(CustomerSummary { full_name, email }),
                    _ => None,
                };
                OrderView {
                    id: row.order.id,
                    order_date: row.order.order_date,
                    status: row.order.status,
                    total_amount: row.order.total_amount,
                    customer_id: row.order.customer_id,
                    customer,
                    items: lines.remove(&row.order.id).unwrap_or_default(),
                }
            })
            .collect())
    }

    async fn revenue_lines(&self, status: OrderStatus) -> Result<Vec<RevenueLine>, RepositoryError> {
        // One statement, so one snapshot. Lines for deleted products drop out of the inner join.
        let rows = sqlx::query_as::<_, RevenueRow>(
            r"
            SELECT p.category, p.price, i.quantity
            FROM orders o
            JOIN order_items i ON i.order_id = o.id
            JOIN products p ON p.id = i.product_id
            WHERE o.status = $1
            ",
        )
        .bind(status)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| RevenueLine {
                category: r.category,
                unit_price: r.price,
                quantity: r.quantity,
            })
            .collect())
    }
}
