//! Push notification subscriptions.

use sqlx::PgPool;

use printshop_core::UserId;

use super::RepositoryError;

/// Repository for push subscriptions, keyed by the provider's player id.
pub struct PushSubscriptionRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> PushSubscriptionRepository<'a> {
    /// Create a new push subscription repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Register a device. A known player id is re-bound to `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert(&self, player_id: &str, user_id: Option<UserId>) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO storefront.push_subscriptions (player_id, user_id)
            VALUES ($1, $2)
            ON CONFLICT (player_id) DO UPDATE SET user_id = EXCLUDED.user_id
            ",
        )
        .bind(player_id)
        .bind(user_id)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Forget a device. Returns whether it was known.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, player_id: &str) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM storefront.push_subscriptions WHERE player_id = $1")
            .bind(player_id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Player ids registered for a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn player_ids_for_user(&self, user_id: UserId) -> Result<Vec<String>, RepositoryError> {
        let ids = sqlx::query_scalar(
            "SELECT player_id FROM storefront.push_subscriptions WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(ids)
    }

    /// Player ids of every admin, for new-order alerts.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn admin_player_ids(&self) -> Result<Vec<String>, RepositoryError> {
        let ids = sqlx::query_scalar(
            r"
            SELECT s.player_id
            FROM storefront.push_subscriptions s
            JOIN storefront.users u ON u.id = s.user_id
            WHERE u.role = 'admin'
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(ids)
    }
}
