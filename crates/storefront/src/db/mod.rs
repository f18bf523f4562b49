//! Database operations for the storefront `PostgreSQL` schema.
//!
//! # Schema: `storefront`
//!
//! - `users`, `user_passwords` - Accounts, roles, referral codes
//! - `categories`, `tags`, `products`, `product_translations`,
//!   `product_variants`, `product_images`, `product_tags` - Catalog
//! - `discounts` - Discount codes
//! - `checkout_sessions` - Stripe checkout sessions with the cart snapshot
//! - `orders`, `order_items` - Paid orders and fulfillment state
//! - `reviews`, `wishlist_items` - Customer content
//! - `badges`, `user_badges` - Gamification
//! - `push_subscriptions` - Push provider subscription ids
//! - `tower_sessions.session` - Session storage (managed by the store)
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p printshop-cli -- migrate
//! ```

pub mod badges;
pub mod checkout_sessions;
pub mod discounts;
pub mod orders;
pub mod products;
pub mod push_subscriptions;
pub mod reviews;
pub mod taxonomy;
pub mod users;
pub mod wishlist;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;
use tower_sessions_sqlx_store::PostgresStore;

pub use badges::BadgeRepository;
pub use checkout_sessions::CheckoutSessionRepository;
pub use discounts::DiscountRepository;
pub use orders::OrderRepository;
pub use products::ProductRepository;
pub use push_subscriptions::PushSubscriptionRepository;
pub use reviews::ReviewRepository;
pub use taxonomy::TaxonomyRepository;
pub use users::UserRepository;
pub use wishlist::WishlistRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Map a unique-constraint violation to `RepositoryError::Conflict`.
pub(crate) fn conflict_on_unique(e: sqlx::Error, message: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(message.to_owned());
    }
    RepositoryError::Database(e)
}

/// Offset for a 1-based page number.
pub(crate) fn page_offset(page: u32, per_page: u32) -> i64 {
    i64::from(page.max(1) - 1) * i64::from(per_page)
}

/// Errors from [`migrate`].
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("migration failed: {0}")]
    Schema(#[from] sqlx::migrate::MigrateError),

    #[error("session store migration failed: {0}")]
    SessionStore(sqlx::Error),
}

/// Run the embedded schema migrations, then create the session table.
///
/// # Errors
///
/// Returns `MigrationError` if either step fails.
pub async fn migrate(pool: &PgPool) -> Result<(), MigrationError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    PostgresStore::new(pool.clone())
        .migrate()
        .await
        .map_err(MigrationError::SessionStore)?;
    Ok(())
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_offset() {
        assert_eq!(page_offset(1, 24), 0);
        assert_eq!(page_offset(3, 24), 48);
        assert_eq!(page_offset(0, 10), 0);
    }

    #[test]
    fn test_non_database_errors_pass_through() {
        let err = conflict_on_unique(sqlx::Error::RowNotFound, "dup");
        assert!(matches!(err, RepositoryError::Database(sqlx::Error::RowNotFound)));
    }
}
