//! Domain models.
//!
//! These are validated domain objects, separate from database row types
//! (which live next to the queries in `db::postgres`).

pub mod order;
pub mod product;
pub mod revenue;
pub mod user;

pub use order::{
    CustomerSummary, LineItem, LineItemView, Order, OrderDraft, OrderView, Placement,
    PlacementPlan, PlacementRejection, ProductSummary, StatusUpdate, StockSnapshot,
    TransitionPolicy, plan_placement,
};
pub use product::{NewProduct, NewReview, Product, ProductSpecs, Review};
pub use revenue::{CategoryRevenue, RevenueLine};
pub use user::{NewUser, User};
