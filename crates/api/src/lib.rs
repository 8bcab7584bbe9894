//! rigstore API library.
//!
//! Accounts, catalog, orders, and revenue reporting for an online hardware
//! store, served over HTTP with axum. Exposed as a library so the CLI and the
//! black-box tests can reuse the storage layer and the assembled router.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

pub use routes::app;
pub use state::AppState;
