//! Catalog services: the public read cache and the Printful catalog sync.

mod cache;
pub mod images;
mod sync;

use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::printful::PrintfulError;

pub use cache::{CacheKey, CacheValue, CatalogCache};
pub use sync::{CatalogSync, ProductPlan, SyncFailure, SyncReport, plan_product};

/// Errors raised while syncing the catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("printful error: {0}")]
    Printful(#[from] PrintfulError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// The Printful product has no variant that can be sold.
    #[error("product {0} has no sellable variants with a retail price")]
    NoSellableVariants(i64),
}
