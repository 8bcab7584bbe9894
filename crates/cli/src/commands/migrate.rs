//! Database migration command.
//!
//! Migration files live in `crates/api/migrations/` and are embedded into the
//! binary, so `rig-cli migrate` needs nothing but a database URL.

use thiserror::Error;

use super::{ConnectError, connect};
use rigstore_api::db;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Apply every pending migration.
pub async fn run() -> Result<(), MigrationError> {
    let pool = connect().await?;

    tracing::info!("Running migrations...");
    db::migrate(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
