//! Review repository.

use sqlx::PgPool;

use printshop_core::{ProductId, ReviewId, ReviewStatus, UserId};

use super::{RepositoryError, conflict_on_unique, page_offset};
use crate::models::review::{NewReview, Review};

const REVIEW_SELECT: &str = r"
    SELECT r.id, r.product_id, r.user_id, u.display_name AS author_name, r.rating,
           r.title, r.body, r.status, r.verified_purchase, r.created_at
    FROM storefront.reviews r
    JOIN storefront.users u ON u.id = r.user_id
";

/// Repository for product reviews.
pub struct ReviewRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ReviewRepository<'a> {
    /// Create a new review repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Store a new review. Verified purchases are approved straight away,
    /// everything else waits for moderation.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the user already reviewed the
    /// product.
    pub async fn create(
        &self,
        product_id: ProductId,
        user_id: UserId,
        review: &NewReview,
        verified_purchase: bool,
    ) -> Result<ReviewId, RepositoryError> {
        sqlx::query_scalar::<_, ReviewId>(
            r"
            INSERT INTO storefront.reviews
                (product_id, user_id, rating, title, body, verified_purchase, status)
            VALUES ($1, $2, $3, $4, $5, $6,
                    CASE WHEN $6 THEN 'approved' ELSE 'pending' END)
            RETURNING id
            ",
        )
        .bind(product_id)
        .bind(user_id)
        .bind(review.rating)
        .bind(&review.title)
        .bind(&review.body)
        .bind(verified_purchase)
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "you have already reviewed this product"))
    }

    /// Get a review by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ReviewId) -> Result<Option<Review>, RepositoryError> {
        let review = sqlx::query_as::<_, Review>(&format!("{REVIEW_SELECT} WHERE r.id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        Ok(review)
    }

    /// Approved reviews of a product, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_approved(&self, product_id: ProductId) -> Result<Vec<Review>, RepositoryError> {
        let reviews = sqlx::query_as::<_, Review>(&format!(
            r"
            {REVIEW_SELECT}
            WHERE r.product_id = $1 AND r.status = 'approved'
            ORDER BY r.created_at DESC, r.id DESC
            "
        ))
        .bind(product_id)
        .fetch_all(self.pool)
        .await?;

        Ok(reviews)
    }

    /// Reviews for moderation, oldest first, optionally in one status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        status: Option<ReviewStatus>,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<Review>, RepositoryError> {
        let reviews = sqlx::query_as::<_, Review>(&format!(
            r"
            {REVIEW_SELECT}
            WHERE ($1::TEXT IS NULL OR r.status = $1)
            ORDER BY r.created_at, r.id
            LIMIT $2 OFFSET $3
            "
        ))
        .bind(status)
        .bind(i64::from(per_page))
        .bind(page_offset(page, per_page))
        .fetch_all(self.pool)
        .await?;

        Ok(reviews)
    }

    /// Change a review's moderation status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the review doesn't exist.
    pub async fn set_status(&self, id: ReviewId, status: ReviewStatus) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE storefront.reviews SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Delete a review.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the review doesn't exist.
    pub async fn delete(&self, id: ReviewId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM storefront.reviews WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
