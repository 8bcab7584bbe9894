//! In-process storage backend.
//!
//! All state sits behind one `RwLock`. Every operation takes the lock, works
//! on plain maps, and releases it before returning, so no guard is ever held
//! across an `.await`. Writers are serialized, which covers the per-product
//! exclusion needed for stock decrements and review appends.

use std::collections::{BTreeMap, HashMap};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;

use rigstore_core::{Email, OrderId, OrderStatus, ProductId, Role, SortDirection, UserId};

use super::{CatalogStore, IdentityStore, OrderStore, RepositoryError, Store};
use crate::models::{
    CustomerSummary, LineItemView, NewProduct, NewReview, NewUser, Order, OrderDraft, OrderView,
    Placement, Product, ProductSummary, RevenueLine, Review, StatusUpdate, StockSnapshot,
    TransitionPolicy, User, plan_placement,
};

#[derive(Default)]
struct State {
    users: BTreeMap<UserId, (User, String)>,
    emails: HashMap<String, UserId>,
    products: BTreeMap<ProductId, Product>,
    orders: BTreeMap<OrderId, Order>,
    next_user: i64,
    next_product: i64,
    next_order: i64,
}

impl State {
    fn next_id(counter: &mut i64) -> i64 {
        *counter += 1;
        *counter
    }

    fn order_view(&self, order: &Order) -> OrderView {
        let customer = self.users.get(&order.customer_id).map(|(u, _)| CustomerSummary {
            full_name: u.full_name.clone(),
            email: u.email.to_string(),
        });

        let items = order
            .items
            .iter()
            .map(|item| LineItemView {
                product_id: item.product_id,
                quantity: item.quantity,
                product: self.products.get(&item.product_id).map_or_else(
                    ProductSummary::unavailable,
                    |p| ProductSummary::found(p.model_name.clone(), p.price),
                ),
            })
            .collect();

        OrderView {
            id: order.id,
            order_date: order.order_date,
            status: order.status,
            total_amount: order.total_amount,
            customer_id: order.customer_id,
            customer,
            items,
        }
    }
}

/// Storage backend holding everything in memory.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // A poisoned lock only means another request panicked mid-operation;
    // every mutation below is applied after all checks, so the data is intact.
    fn read(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl IdentityStore for MemoryStore {
    async fn create_user(&self, user: NewUser) -> Result<User, RepositoryError> {
        let mut state = self.write();
        if state.emails.contains_key(user.email.as_str()) {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }

        let id = UserId::new(State::next_id(&mut state.next_user));
        let created = User {
            id,
            full_name: user.full_name,
            email: user.email,
            role: user.role,
            created_at: Utc::now(),
        };
        state.emails.insert(created.email.to_string(), id);
        state.users.insert(id, (created.clone(), user.password_hash));
        Ok(created)
    }

    async fn get_credentials(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let state = self.read();
        Ok(state
            .emails
            .get(email.as_str())
            .and_then(|id| state.users.get(id))
            .cloned())
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.read().users.get(&id).map(|(u, _)| u.clone()))
    }

    async fn set_role(&self, email: &Email, role: Role) -> Result<Option<User>, RepositoryError> {
        let mut state = self.write();
        let Some(id) = state.emails.get(email.as_str()).copied() else {
            return Ok(None);
        };
        Ok(state.users.get_mut(&id).map(|(user, _)| {
            user.role = role;
            user.clone()
        }))
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn list_products(
        &self,
        category: Option<&str>,
        sort: SortDirection,
    ) -> Result<Vec<Product>, RepositoryError> {
        let state = self.read();
        let mut products: Vec<Product> = state
            .products
            .values()
            .filter(|p| category.is_none_or(|c| p.category == c))
            .cloned()
            .collect();
        products.sort_by(|a, b| sort.apply(a.price.cmp(&b.price)).then(a.id.cmp(&b.id)));
        Ok(products)
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self.read().products.get(&id).cloned())
    }

    async fn create_product(&self, product: NewProduct) -> Result<Product, RepositoryError> {
        let mut state = self.write();
        let id = ProductId::new(State::next_id(&mut state.next_product));
        let created = Product {
            id,
            model_name: product.model_name,
            category: product.category,
            price: product.price,
            stock: product.stock,
            specs: product.specs,
            reviews: Vec::new(),
        };
        state.products.insert(id, created.clone());
        Ok(created)
    }

    async fn delete_product(&self, id: ProductId) -> Result<bool, RepositoryError> {
        Ok(self.write().products.remove(&id).is_some())
    }

    async fn append_review(
        &self,
        id: ProductId,
        review: NewReview,
    ) -> Result<Option<Review>, RepositoryError> {
        let mut state = self.write();
        Ok(state.products.get_mut(&id).map(|product| {
            let appended = Review {
                user: review.author,
                rating: review.rating,
                comment: review.comment,
                date: Utc::now(),
            };
            product.reviews.push(appended.clone());
            appended
        }))
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn place_order(&self, draft: &OrderDraft) -> Result<Placement, RepositoryError> {
        let mut state = self.write();

        let snapshots: Vec<StockSnapshot> = draft
            .product_ids()
            .into_iter()
            .filter_map(|id| state.products.get(&id))
            .map(|p| StockSnapshot {
                product_id: p.id,
                price: p.price,
                stock: p.stock,
            })
            .collect();

        let plan = match plan_placement(&draft.items, &snapshots) {
            Ok(plan) => plan,
            Err(rejection) => return Ok(Placement::Rejected(rejection)),
        };

        for (product_id, decrement) in &plan.decrements {
            if let Some(product) = state.products.get_mut(product_id) {
                product.stock -= decrement;
            }
        }

        let id = OrderId::new(State::next_id(&mut state.next_order));
        let order = Order {
            id,
            order_date: Utc::now(),
            status: OrderStatus::Processing,
            total_amount: plan.total_amount,
            customer_id: draft.customer_id,
            items: draft.items.clone(),
        };
        state.orders.insert(id, order.clone());
        Ok(Placement::Placed(order))
    }

    async fn update_status(
        &self,
        id: OrderId,
        status: OrderStatus,
        policy: TransitionPolicy,
    ) -> Result<StatusUpdate, RepositoryError> {
        let mut state = self.write();
        let Some(order) = state.orders.get_mut(&id) else {
            return Ok(StatusUpdate::NotFound);
        };

        let previous = order.status;
        if !policy.allows(previous, status) {
            return Ok(StatusUpdate::Refused { current: previous });
        }
        order.status = status;
        Ok(StatusUpdate::Updated { previous })
    }

    async fn list_order_views(
        &self,
        customer: Option<UserId>,
    ) -> Result<Vec<OrderView>, RepositoryError> {
        let state = self.read();
        let mut views: Vec<OrderView> = state
            .orders
            .values()
            .filter(|o| customer.is_none_or(|c| o.customer_id == c))
            .map(|o| state.order_view(o))
            .collect();
        views.sort_by(|a, b| b.order_date.cmp(&a.order_date).then(b.id.cmp(&a.id)));
        Ok(views)
    }

    async fn revenue_lines(&self, status: OrderStatus) -> Result<Vec<RevenueLine>, RepositoryError> {
        let state = self.read();
        Ok(state
            .orders
            .values()
            .filter(|o| o.status == status)
            .flat_map(|o| o.items.iter())
            .filter_map(|item| {
                state.products.get(&item.product_id).map(|p| RevenueLine {
                    category: p.category.clone(),
                    unit_price: p.price,
                    quantity: item.quantity.get(),
                })
            })
            .collect())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}
