//! rigstore core - shared domain types.
//!
//! This crate provides the types used across all rigstore components:
//! - `api` - Catalog, accounts, orders, and revenue reporting over HTTP
//! - `cli` - Command-line tools for migrations, admin accounts, and seeding
//!
//! # Architecture
//!
//! The core crate contains only types and validation - no I/O, no database
//! access, no HTTP. Database encoding is available behind the `postgres`
//! feature.
//!
//! # Modules
//!
//! - [`types`] - Newtype ids, emails, roles, ratings, quantities and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
