//! Badge repository.

use sqlx::PgPool;

use printshop_core::UserId;

use super::RepositoryError;
use crate::models::badge::{Badge, BadgeCode, UserStats};

/// Repository for earned badges and the stats they are computed from.
pub struct BadgeRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> BadgeRepository<'a> {
    /// Create a new badge repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Activity counts for a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn user_stats(&self, user_id: UserId) -> Result<UserStats, RepositoryError> {
        let stats = sqlx::query_as::<_, UserStats>(
            r"
            SELECT
                (SELECT COUNT(*) FROM storefront.orders
                 WHERE user_id = $1 AND status NOT IN ('pending', 'canceled')) AS order_count,
                (SELECT COUNT(*) FROM storefront.reviews
                 WHERE user_id = $1) AS review_count,
                (SELECT COUNT(*) FROM storefront.wishlist_items
                 WHERE user_id = $1) AS wishlist_count,
                (SELECT COUNT(*) FROM storefront.users u
                 WHERE u.referred_by = $1
                   AND EXISTS (SELECT 1 FROM storefront.orders o
                               WHERE o.user_id = u.id
                                 AND o.status NOT IN ('pending', 'canceled'))) AS referred_buyers
            ",
        )
        .bind(user_id)
        .fetch_one(self.pool)
        .await?;

        Ok(stats)
    }

    /// Award badges. Already-held badges are skipped.
    ///
    /// Returns the codes that were newly awarded.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn award(
        &self,
        user_id: UserId,
        codes: &[BadgeCode],
    ) -> Result<Vec<String>, RepositoryError> {
        if codes.is_empty() {
            return Ok(Vec::new());
        }
        let codes: Vec<&str> = codes.iter().map(|c| c.as_str()).collect();

        let awarded = sqlx::query_scalar::<_, String>(
            r"
            WITH inserted AS (
                INSERT INTO storefront.user_badges (user_id, badge_id)
                SELECT $1, b.id FROM storefront.badges b WHERE b.code = ANY($2)
                ON CONFLICT DO NOTHING
                RETURNING badge_id
            )
            SELECT b.code FROM inserted i JOIN storefront.badges b ON b.id = i.badge_id
            ORDER BY b.id
            ",
        )
        .bind(user_id)
        .bind(&codes)
        .fetch_all(self.pool)
        .await?;

        Ok(awarded)
    }

    /// Badges a user holds, in award order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Badge>, RepositoryError> {
        let badges = sqlx::query_as::<_, Badge>(
            r"
            SELECT b.code, b.name, b.description, ub.awarded_at
            FROM storefront.user_badges ub
            JOIN storefront.badges b ON b.id = ub.badge_id
            WHERE ub.user_id = $1
            ORDER BY ub.awarded_at, b.id
            ",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(badges)
    }
}
