//! Core types for rigstore.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod quantity;
pub mod rating;
pub mod role;
pub mod sort;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use quantity::{Quantity, QuantityError};
pub use rating::{Rating, RatingError};
pub use role::{Role, RoleParseError};
pub use sort::SortDirection;
pub use status::{OrderStatus, StatusParseError};
