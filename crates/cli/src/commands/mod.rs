//! Subcommand implementations.

pub mod admin;
pub mod catalog;
pub mod check;
pub mod migrate;

use printshop_storefront::config::{ConfigError, database_url_from_env};
use printshop_storefront::db;
use sqlx::PgPool;

/// Connect using only the database URL from the environment.
pub(crate) async fn connect() -> Result<PgPool, ConnectError> {
    let database_url = database_url_from_env()?;
    tracing::info!("Connecting to database...");
    Ok(db::create_pool(&database_url).await?)
}

/// Errors from [`connect`].
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),
}
