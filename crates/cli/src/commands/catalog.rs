//! Catalog sync command.
//!
//! # Usage
//!
//! ```bash
//! ps-cli catalog sync            # write products, variants and images
//! ps-cli catalog sync --dry-run  # print the reconciled catalog only
//! ```
//!
//! Needs the full storefront configuration (Printful credentials included).
//! The running server's catalog cache expires on its own TTL; trigger the sync
//! from the admin API instead to drop it immediately.

use printshop_storefront::config::{ConfigError, StorefrontConfig};
use printshop_storefront::db;
use printshop_storefront::services::catalog::{CatalogCache, CatalogError, CatalogSync};
use printshop_storefront::services::printful::{PrintfulClient, PrintfulError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncCommandError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Printful(#[from] PrintfulError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("Could not render report: {0}")]
    Report(#[from] serde_json::Error),

    #[error("{0} product(s) failed to sync")]
    Partial(usize),
}

/// Run the Printful sync and print the report as JSON.
pub async fn sync(dry_run: bool) -> Result<(), SyncCommandError> {
    let config = StorefrontConfig::from_env()?;
    let pool = db::create_pool(&config.database_url).await?;
    let printful = PrintfulClient::new(&config.printful)?;
    let cache = CatalogCache::default();

    tracing::info!(dry_run, "Syncing catalog from Printful...");
    let report = CatalogSync::new(&pool, &printful, &cache)
        .run(dry_run)
        .await?;

    #[allow(clippy::print_stdout)]
    {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    if !report.errors.is_empty() {
        return Err(SyncCommandError::Partial(report.errors.len()));
    }
    tracing::info!("Catalog sync complete!");
    Ok(())
}
