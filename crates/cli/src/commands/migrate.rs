//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! ps-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string
//!
//! Migrations live in `crates/storefront/migrations/` and are embedded in the
//! storefront crate at build time. The session table is created afterwards.

use printshop_storefront::db::{self, MigrationError};
use thiserror::Error;

use super::{ConnectError, connect};

#[derive(Debug, Error)]
pub enum MigrateError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error(transparent)]
    Migration(#[from] MigrationError),
}

/// Run all migrations.
pub async fn run() -> Result<(), MigrateError> {
    let pool = connect().await?;

    tracing::info!("Running migrations...");
    db::migrate(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
