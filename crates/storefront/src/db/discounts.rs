//! Discount code repository.

use sqlx::PgPool;

use printshop_core::DiscountId;

use super::{RepositoryError, conflict_on_unique};
use crate::models::discount::{Discount, DiscountInput, normalize_code};

const DISCOUNT_COLUMNS: &str = "id, code, kind, value, min_subtotal, max_uses, times_used, \
                                starts_at, expires_at, is_active, created_at";

/// Repository for discount codes.
pub struct DiscountRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> DiscountRepository<'a> {
    /// Create a new discount repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Look up a code, case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_code(&self, code: &str) -> Result<Option<Discount>, RepositoryError> {
        let discount = sqlx::query_as::<_, Discount>(&format!(
            "SELECT {DISCOUNT_COLUMNS} FROM storefront.discounts WHERE code = $1"
        ))
        .bind(normalize_code(code))
        .fetch_optional(self.pool)
        .await?;

        Ok(discount)
    }

    /// All discounts, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Discount>, RepositoryError> {
        let discounts = sqlx::query_as::<_, Discount>(&format!(
            "SELECT {DISCOUNT_COLUMNS} FROM storefront.discounts ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(discounts)
    }

    /// Create a discount from validated input.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the code already exists.
    pub async fn create(&self, input: &DiscountInput) -> Result<Discount, RepositoryError> {
        sqlx::query_as::<_, Discount>(&format!(
            r"
            INSERT INTO storefront.discounts
                (code, kind, value, min_subtotal, max_uses, starts_at, expires_at, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {DISCOUNT_COLUMNS}
            "
        ))
        .bind(&input.code)
        .bind(input.kind)
        .bind(input.value)
        .bind(input.min_subtotal)
        .bind(input.max_uses)
        .bind(input.starts_at)
        .bind(input.expires_at)
        .bind(input.is_active)
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "discount code already exists"))
    }

    /// Replace a discount's fields. Usage count is preserved.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the discount doesn't exist and
    /// `RepositoryError::Conflict` if the new code is taken.
    pub async fn update(
        &self,
        id: DiscountId,
        input: &DiscountInput,
    ) -> Result<Discount, RepositoryError> {
        sqlx::query_as::<_, Discount>(&format!(
            r"
            UPDATE storefront.discounts
            SET code = $2, kind = $3, value = $4, min_subtotal = $5, max_uses = $6,
                starts_at = $7, expires_at = $8, is_active = $9
            WHERE id = $1
            RETURNING {DISCOUNT_COLUMNS}
            "
        ))
        .bind(id)
        .bind(&input.code)
        .bind(input.kind)
        .bind(input.value)
        .bind(input.min_subtotal)
        .bind(input.max_uses)
        .bind(input.starts_at)
        .bind(input.expires_at)
        .bind(input.is_active)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "discount code already exists"))?
        .ok_or(RepositoryError::NotFound)
    }

    /// Deactivate a discount. Orders keep referring to it by code.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the discount doesn't exist.
    pub async fn deactivate(&self, id: DiscountId) -> Result<Discount, RepositoryError> {
        sqlx::query_as::<_, Discount>(&format!(
            "UPDATE storefront.discounts SET is_active = FALSE WHERE id = $1 RETURNING {DISCOUNT_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }
}
