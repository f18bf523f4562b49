//! Local record of Stripe checkout sessions.
//!
//! A row is written when a session is created so the cart snapshot survives
//! until the webhook arrives, and so unfinished checkouts can be reminded.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;

use printshop_core::{CheckoutStatus, UserId};

use super::RepositoryError;
use crate::models::cart::PricedCart;

/// A checkout session row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CheckoutSession {
    pub stripe_session_id: String,
    pub user_id: Option<UserId>,
    pub email: Option<String>,
    pub cart: Json<PricedCart>,
    pub discount_code: Option<String>,
    pub status: CheckoutStatus,
    pub reminder_sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

const SESSION_COLUMNS: &str = "stripe_session_id, user_id, email, cart, discount_code, status, \
                               reminder_sent_at, created_at";

/// Repository for checkout sessions.
pub struct CheckoutSessionRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CheckoutSessionRepository<'a> {
    /// Create a new checkout session repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Record a freshly created Stripe session with its cart snapshot.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn create(
        &self,
        stripe_session_id: &str,
        user_id: Option<UserId>,
        email: Option<&str>,
        cart: &PricedCart,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO storefront.checkout_sessions
                (stripe_session_id, user_id, email, cart, discount_code)
            VALUES ($1, $2, $3, $4, $5)
            ",
        )
        .bind(stripe_session_id)
        .bind(user_id)
        .bind(email)
        .bind(Json(cart))
        .bind(cart.discount_code.as_deref())
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Get a session by Stripe id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, stripe_session_id: &str) -> Result<Option<CheckoutSession>, RepositoryError> {
        let session = sqlx::query_as::<_, CheckoutSession>(&format!(
            "SELECT {SESSION_COLUMNS} FROM storefront.checkout_sessions WHERE stripe_session_id = $1"
        ))
        .bind(stripe_session_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(session)
    }

    /// Mark an open session expired. Completed sessions are left alone.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn mark_expired(&self, stripe_session_id: &str) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE storefront.checkout_sessions SET status = 'expired'
            WHERE stripe_session_id = $1 AND status = 'open'
            ",
        )
        .bind(stripe_session_id)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Open sessions created between `newer_than` and `older_than` that have
    /// an email, have not been reminded yet and have failed fewer than
    /// `max_attempts` sends.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn abandoned(
        &self,
        older_than: DateTime<Utc>,
        newer_than: DateTime<Utc>,
        max_attempts: i32,
        limit: i64,
    ) -> Result<Vec<CheckoutSession>, RepositoryError> {
        let sessions = sqlx::query_as::<_, CheckoutSession>(&format!(
            r"
            SELECT {SESSION_COLUMNS} FROM storefront.checkout_sessions
            WHERE status = 'open'
              AND reminder_sent_at IS NULL
              AND email IS NOT NULL
              AND created_at < $1
              AND created_at > $2
              AND reminder_attempts < $3
            ORDER BY created_at
            LIMIT $4
            "
        ))
        .bind(older_than)
        .bind(newer_than)
        .bind(max_attempts)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(sessions)
    }

    /// Count a failed reminder send.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn record_reminder_failure(&self, stripe_session_id: &str) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE storefront.checkout_sessions SET reminder_attempts = reminder_attempts + 1 WHERE stripe_session_id = $1",
        )
        .bind(stripe_session_id)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Record that the abandoned-checkout reminder went out.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn mark_reminder_sent(&self, stripe_session_id: &str) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE storefront.checkout_sessions SET reminder_sent_at = NOW() WHERE stripe_session_id = $1",
        )
        .bind(stripe_session_id)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Expire open sessions older than `older_than`. Stripe sessions last at
    /// most a day, so anything past that can never complete.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn expire_stale(&self, older_than: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE storefront.checkout_sessions SET status = 'expired'
            WHERE status = 'open' AND created_at < $1
            ",
        )
        .bind(older_than)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
