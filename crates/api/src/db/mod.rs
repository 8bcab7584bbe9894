//! Storage seam for accounts, catalog, and orders.
//!
//! # Backends
//!
//! - [`PgStore`] - `PostgreSQL` via sqlx (production)
//! - [`MemoryStore`] - in-process maps (tests and local runs)
//!
//! Both backends give the same guarantees: review appends never lose
//! updates, and order placement is all-or-nothing (stock checked and
//! decremented in the same unit as the order insert).
//!
//! # Tables
//!
//! - `users` - accounts with Argon2 password hashes
//! - `products` - catalog entries with embedded spec columns
//! - `product_reviews` - reviews, cascade-deleted with their product
//! - `orders` / `order_items` - order headers and lines
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p rigstore-cli -- migrate
//! ```

pub mod memory;
pub mod postgres;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use rigstore_core::{Email, OrderId, OrderStatus, ProductId, Role, SortDirection, UserId};

use crate::models::{
    NewProduct, NewReview, NewUser, OrderDraft, OrderView, Placement, Product, RevenueLine,
    Review, StatusUpdate, TransitionPolicy, User,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Errors from the storage layer.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx (connectivity, protocol, query failure).
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Account persistence.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Insert an account.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists.
    async fn create_user(&self, user: NewUser) -> Result<User, RepositoryError>;

    /// Look up an account together with its password hash.
    async fn get_credentials(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError>;

    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    /// Change an account's role. Returns `None` if no account has this email.
    async fn set_role(&self, email: &Email, role: Role) -> Result<Option<User>, RepositoryError>;
}

/// Product and review persistence.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Products ordered by price in `sort` direction (ties by id), optionally
    /// restricted to an exact category. Each call is one full pass.
    async fn list_products(
        &self,
        category: Option<&str>,
        sort: SortDirection,
    ) -> Result<Vec<Product>, RepositoryError>;

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;

    async fn create_product(&self, product: NewProduct) -> Result<Product, RepositoryError>;

    /// Hard delete. Returns whether a row was removed.
    async fn delete_product(&self, id: ProductId) -> Result<bool, RepositoryError>;

    /// Atomically append a review. Returns `None` if the product does not exist.
    async fn append_review(
        &self,
        id: ProductId,
        review: NewReview,
    ) -> Result<Option<Review>, RepositoryError>;
}

/// Order persistence, including the atomic placement transaction.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Lock referenced products, check stock, decrement, and insert the order
    /// as one unit. A rejection leaves every row untouched.
    async fn place_order(&self, draft: &OrderDraft) -> Result<Placement, RepositoryError>;

    async fn update_status(
        &self,
        id: OrderId,
        status: OrderStatus,
        policy: TransitionPolicy,
    ) -> Result<StatusUpdate, RepositoryError>;

    /// Orders joined with customer and product display fields, newest first.
    /// Restricted to one customer when `customer` is set.
    async fn list_order_views(
        &self,
        customer: Option<UserId>,
    ) -> Result<Vec<OrderView>, RepositoryError>;

    /// Line items of orders in `status`, joined with their product's category
    /// and current price, read from a single snapshot. Lines whose product no
    /// longer exists are omitted.
    async fn revenue_lines(&self, status: OrderStatus) -> Result<Vec<RevenueLine>, RepositoryError>;
}

/// A complete storage backend.
#[async_trait]
pub trait Store: IdentityStore + CatalogStore + OrderStore {
    /// Cheap connectivity check for the readiness endpoint.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// Shared handle to the configured backend.
pub type DynStore = Arc<dyn Store>;

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Run the embedded migrations.
///
/// # Errors
///
/// Returns `MigrateError` if any migration fails to apply.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
