//! Order Transaction Coordinator.
//!
//! Placement follows a pre-check + atomic apply discipline: the store locks
//! every referenced product, checks stock for all lines, and applies every
//! decrement together with the order insert, or writes nothing at all.

use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

use rigstore_core::{OrderId, OrderStatus, ProductId, Quantity, QuantityError, StatusParseError};

use super::auth::AuthContext;
use crate::db::{RepositoryError, Store};
use crate::models::{
    LineItem, Order, OrderDraft, OrderView, Placement, PlacementRejection, StatusUpdate,
    TransitionPolicy,
};

/// Errors from order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("an order needs at least one item")]
    EmptyOrder,

    #[error(transparent)]
    InvalidQuantity(#[from] QuantityError),

    #[error(transparent)]
    InvalidStatus(#[from] StatusParseError),

    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    #[error("insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: ProductId,
        requested: i64,
        available: i32,
    },

    #[error("order total is too large")]
    TotalOverflow,

    #[error("order not found")]
    OrderNotFound,

    #[error("cannot move order from {from} to {to}")]
    TransitionRefused { from: OrderStatus, to: OrderStatus },

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<PlacementRejection> for OrderError {
    fn from(rejection: PlacementRejection) -> Self {
        match rejection {
            PlacementRejection::UnknownProduct(id) => Self::ProductNotFound(id),
            PlacementRejection::InsufficientStock {
                product_id,
                requested,
                available,
            } => Self::InsufficientStock {
                product_id,
                requested,
                available,
            },
            PlacementRejection::TotalOverflow => Self::TotalOverflow,
        }
    }
}

/// One requested line, before validation.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct OrderLineRequest {
    pub product_id: ProductId,
    pub quantity: i64,
}

/// An order as submitted by a customer.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderRequest {
    #[serde(default)]
    pub items: Vec<OrderLineRequest>,
    /// Client-computed total. Advisory only.
    #[serde(default)]
    pub total_amount: Option<Decimal>,
}

/// Coordinates placement and admin status changes.
pub struct OrderCoordinator<'a> {
    store: &'a dyn Store,
    policy: TransitionPolicy,
}

impl<'a> OrderCoordinator<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn Store, policy: TransitionPolicy) -> Self {
        Self { store, policy }
    }

    /// Place an order for the caller.
    ///
    /// The stored total is computed from catalog prices; a client total that
    /// disagrees is logged and ignored.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::EmptyOrder` or `OrderError::InvalidQuantity` for bad
    /// input, `OrderError::ProductNotFound` for an unknown product, and
    /// `OrderError::InsufficientStock` when any line cannot be covered. In every
    /// error case nothing was written.
    pub async fn place_order(
        &self,
        caller: &AuthContext,
        request: OrderRequest,
    ) -> Result<Order, OrderError> {
        if request.items.is_empty() {
            return Err(OrderError::EmptyOrder);
        }

        let items = request
            .items
            .iter()
            .map(|line| {
                Ok(LineItem {
                    product_id: line.product_id,
                    quantity: Quantity::new(line.quantity)?,
                })
            })
            .collect::<Result<Vec<_>, QuantityError>>()?;

        let draft = OrderDraft {
            customer_id: caller.user_id,
            items,
        };

        let order = match self.store.place_order(&draft).await? {
            Placement::Placed(order) => order,
            Placement::Rejected(rejection) => {
                tracing::info!(customer_id = %caller.user_id, reason = %rejection, "order rejected");
                return Err(rejection.into());
            }
        };

        if let Some(claimed) = request.total_amount
            && claimed != order.total_amount
        {
            tracing::warn!(
                order_id = %order.id,
                %claimed,
                computed = %order.total_amount,
                "client total disagrees with catalog prices"
            );
        }

        tracing::info!(order_id = %order.id, customer_id = %caller.user_id, total = %order.total_amount, "order placed");
        Ok(order)
    }

    /// Set an order's status. The caller must already hold the admin role.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::InvalidStatus` for an unrecognised status string,
    /// `OrderError::OrderNotFound` for an unknown order, and
    /// `OrderError::TransitionRefused` when the configured policy forbids the move.
    pub async fn update_status(&self, id: OrderId, status: &str) -> Result<OrderStatus, OrderError> {
        let status: OrderStatus = status.parse()?;

        match self.store.update_status(id, status, self.policy).await? {
            StatusUpdate::Updated { previous } => {
                tracing::info!(order_id = %id, from = %previous, to = %status, "order status updated");
                Ok(status)
            }
            StatusUpdate::NotFound => Err(OrderError::OrderNotFound),
            StatusUpdate::Refused { current } => Err(OrderError::TransitionRefused {
                from: current,
                to: status,
            }),
        }
    }

    /// Every order with customer and product display fields, newest first.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Repository` if the store is unreachable.
    pub async fn list_all(&self) -> Result<Vec<OrderView>, OrderError> {
        Ok(self.store.list_order_views(None).await?)
    }

    /// The caller's own orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Repository` if the store is unreachable.
    pub async fn list_mine(&self, caller: &AuthContext) -> Result<Vec<OrderView>, OrderError> {
        Ok(self.store.list_order_views(Some(caller.user_id)).await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use rigstore_core::{Role, UserId};

    use super::*;
    use crate::db::{CatalogStore, MemoryStore};
    use crate::models::{NewProduct, ProductSpecs};

    fn caller(id: i64) -> AuthContext {
        AuthContext {
            user_id: UserId::new(id),
            role: Role::Customer,
            display_name: format!("customer-{id}"),
        }
    }

    async fn product(store: &MemoryStore, price: i64, stock: i32) -> ProductId {
        store
            .create_product(NewProduct {
                model_name: format!("model-{price}"),
                category: "laptop".to_owned(),
                price: Decimal::from(price),
                stock,
                specs: ProductSpecs::default(),
            })
            .await
            .unwrap()
            .id
    }

    fn request(lines: &[(ProductId, i64)]) -> OrderRequest {
        OrderRequest {
            items: lines
                .iter()
                .map(|&(product_id, quantity)| OrderLineRequest {
                    product_id,
                    quantity,
                })
                .collect(),
            total_amount: None,
        }
    }

    #[tokio::test]
    async fn test_place_order_uses_caller_and_catalog_total() {
        let store = MemoryStore::new();
        let coordinator = OrderCoordinator::new(&store, TransitionPolicy::Permissive);
        let id = product(&store, 250, 3).await;

        let mut req = request(&[(id, 2)]);
        req.total_amount = Some(Decimal::ONE);
        let order = coordinator.place_order(&caller(9), req).await.unwrap();

        assert_eq!(order.customer_id, UserId::new(9));
        assert_eq!(order.total_amount, Decimal::from(500));
        assert_eq!(order.status, OrderStatus::Processing);
        assert_eq!(store.get_product(id).await.unwrap().unwrap().stock, 1);
    }

    #[tokio::test]
    async fn test_place_order_validation() {
        let store = MemoryStore::new();
        let coordinator = OrderCoordinator::new(&store, TransitionPolicy::Permissive);
        let id = product(&store, 10, 1).await;

        assert!(matches!(
            coordinator.place_order(&caller(1), request(&[])).await,
            Err(OrderError::EmptyOrder)
        ));
        assert!(matches!(
            coordinator.place_order(&caller(1), request(&[(id, 0)])).await,
            Err(OrderError::InvalidQuantity(_))
        ));
        assert!(matches!(
            coordinator.place_order(&caller(1), request(&[(ProductId::new(99), 1)])).await,
            Err(OrderError::ProductNotFound(_))
        ));
        assert!(matches!(
            coordinator.place_order(&caller(1), request(&[(id, 2)])).await,
            Err(OrderError::InsufficientStock { requested: 2, available: 1, .. })
        ));
        assert_eq!(store.get_product(id).await.unwrap().unwrap().stock, 1);
    }

    #[tokio::test]
    async fn test_concurrent_orders_never_oversell() {
        let store = Arc::new(MemoryStore::new());
        let id = product(&store, 10, 5).await;

        let tasks: Vec<_> = (0..12)
            .map(|n| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    let coordinator = OrderCoordinator::new(&*store, TransitionPolicy::Permissive);
                    coordinator.place_order(&caller(n), request(&[(id, 1)])).await.is_ok()
                })
            })
            .collect();

        let mut placed = 0;
        for task in tasks {
            if task.await.unwrap() {
                placed += 1;
            }
        }

        assert_eq!(placed, 5);
        assert_eq!(store.get_product(id).await.unwrap().unwrap().stock, 0);
    }

    #[tokio::test]
    async fn test_status_updates_follow_policy() {
        let store = MemoryStore::new();
        let id = product(&store, 10, 5).await;
        let permissive = OrderCoordinator::new(&store, TransitionPolicy::Permissive);
        let strict = OrderCoordinator::new(&store, TransitionPolicy::ForwardOnly);
        let order = permissive.place_order(&caller(1), request(&[(id, 1)])).await.unwrap();

        assert_eq!(
            strict.update_status(order.id, "Delivered").await.unwrap(),
            OrderStatus::Delivered
        );
        assert!(matches!(
            strict.update_status(order.id, "Processing").await,
            Err(OrderError::TransitionRefused { .. })
        ));
        assert_eq!(
            permissive.update_status(order.id, "Processing").await.unwrap(),
            OrderStatus::Processing
        );
        assert!(matches!(
            permissive.update_status(order.id, "Lost").await,
            Err(OrderError::InvalidStatus(_))
        ));
        assert!(matches!(
            permissive.update_status(OrderId::new(404), "Shipped").await,
            Err(OrderError::OrderNotFound)
        ));
    }

    #[tokio::test]
    async fn test_list_mine_only_returns_callers_orders() {
        let store = MemoryStore::new();
        let coordinator = OrderCoordinator::new(&store, TransitionPolicy::Permissive);
        let id = product(&store, 10, 5).await;
        coordinator.place_order(&caller(1), request(&[(id, 1)])).await.unwrap();
        coordinator.place_order(&caller(2), request(&[(id, 1)])).await.unwrap();

        let mine = coordinator.list_mine(&caller(1)).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].customer_id, UserId::new(1));
        assert_eq!(coordinator.list_all().await.unwrap().len(), 2);
    }
}
