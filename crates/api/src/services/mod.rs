//! Business logic services.
//!
//! # Services
//!
//! - `auth` - Credential Service: registration, login, tokens, role checks
//! - `catalog` - product listing, admin maintenance, reviews
//! - `orders` - Order Transaction Coordinator
//! - `revenue` - Revenue Aggregator
//!
//! Services borrow the shared store for the duration of a request and hold
//! no state of their own.

pub mod auth;
pub mod catalog;
pub mod orders;
pub mod revenue;
