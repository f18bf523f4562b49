//! Wishlist repository.

use sqlx::PgPool;

use printshop_core::{Locale, ProductId, UserId};

use super::RepositoryError;
use crate::models::catalog::ProductSummary;

/// Repository for saved products.
pub struct WishlistRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> WishlistRepository<'a> {
    /// Create a new wishlist repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Saved published products, most recently saved first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        user_id: UserId,
        locale: Locale,
    ) -> Result<Vec<ProductSummary>, RepositoryError> {
        let items = sqlx::query_as::<_, ProductSummary>(
            r"
            SELECT p.id, p.slug, COALESCE(t.name, p.name) AS name, p.base_price,
                   COALESCE((SELECT MIN(v.price) FROM storefront.product_variants v
                             WHERE v.product_id = p.id AND v.is_available),
                            p.base_price) AS min_price,
                   (SELECT i.url FROM storefront.product_images i
                    WHERE i.product_id = p.id
                    ORDER BY i.position, i.id LIMIT 1) AS image_url,
                   c.slug AS category_slug, p.is_published, p.created_at
            FROM storefront.wishlist_items w
            JOIN storefront.products p ON p.id = w.product_id
            LEFT JOIN storefront.categories c ON c.id = p.category_id
            LEFT JOIN storefront.product_translations t
                   ON t.product_id = p.id AND t.locale = $2
            WHERE w.user_id = $1 AND p.is_published
            ORDER BY w.created_at DESC
            ",
        )
        .bind(user_id)
        .bind(locale)
        .fetch_all(self.pool)
        .await?;

        Ok(items)
    }

    /// Save a product. Saving twice is a no-op.
    ///
    /// Returns whether a new row was written.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn add(&self, user_id: UserId, product_id: ProductId) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            INSERT INTO storefront.wishlist_items (user_id, product_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            ",
        )
        .bind(user_id)
        .bind(product_id)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Remove a saved product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if it wasn't saved.
    pub async fn remove(&self, user_id: UserId, product_id: ProductId) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "DELETE FROM storefront.wishlist_items WHERE user_id = $1 AND product_id = $2",
        )
        .bind(user_id)
        .bind(product_id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
