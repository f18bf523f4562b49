//! Category and tag repository.

use sqlx::PgPool;

use printshop_core::{CategoryId, Slug, TagId};

use super::{RepositoryError, conflict_on_unique};
use crate::models::catalog::{Category, CategoryInput, Tag, TagInput};

const CATEGORY_COLUMNS: &str = "id, slug, name, description, position";

/// Repository for categories and tags.
pub struct TaxonomyRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> TaxonomyRepository<'a> {
    /// Create a new taxonomy repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All categories in display order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError> {
        let categories = sqlx::query_as::<_, Category>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM storefront.categories ORDER BY position, name"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(categories)
    }

    /// Create a category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    pub async fn create_category(
        &self,
        input: &CategoryInput,
        slug: &Slug,
    ) -> Result<Category, RepositoryError> {
        sqlx::query_as::<_, Category>(&format!(
            r"
            INSERT INTO storefront.categories (slug, name, description, position)
            VALUES ($1, $2, $3, $4)
            RETURNING {CATEGORY_COLUMNS}
            "
        ))
        .bind(slug.as_str())
        .bind(input.name.trim())
        .bind(input.description.as_deref())
        .bind(input.position)
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "category slug already exists"))
    }

    /// Replace a category's fields.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category doesn't exist and
    /// `RepositoryError::Conflict` if the slug is taken.
    pub async fn update_category(
        &self,
        id: CategoryId,
        input: &CategoryInput,
        slug: &Slug,
    ) -> Result<Category, RepositoryError> {
        sqlx::query_as::<_, Category>(&format!(
            r"
            UPDATE storefront.categories
            SET slug = $2, name = $3, description = $4, position = $5
            WHERE id = $1
            RETURNING {CATEGORY_COLUMNS}
            "
        ))
        .bind(id)
        .bind(slug.as_str())
        .bind(input.name.trim())
        .bind(input.description.as_deref())
        .bind(input.position)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "category slug already exists"))?
        .ok_or(RepositoryError::NotFound)
    }

    /// Delete a category. Its products become uncategorized.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category doesn't exist.
    pub async fn delete_category(&self, id: CategoryId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM storefront.categories WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// All tags by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_tags(&self) -> Result<Vec<Tag>, RepositoryError> {
        let tags = sqlx::query_as::<_, Tag>("SELECT id, slug, name FROM storefront.tags ORDER BY name")
            .fetch_all(self.pool)
            .await?;

        Ok(tags)
    }

    /// Create a tag.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    pub async fn create_tag(&self, input: &TagInput, slug: &Slug) -> Result<Tag, RepositoryError> {
        sqlx::query_as::<_, Tag>(
            "INSERT INTO storefront.tags (slug, name) VALUES ($1, $2) RETURNING id, slug, name",
        )
        .bind(slug.as_str())
        .bind(input.name.trim())
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "tag slug already exists"))
    }

    /// Rename a tag.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the tag doesn't exist and
    /// `RepositoryError::Conflict` if the slug is taken.
    pub async fn update_tag(
        &self,
        id: TagId,
        input: &TagInput,
        slug: &Slug,
    ) -> Result<Tag, RepositoryError> {
        sqlx::query_as::<_, Tag>(
            "UPDATE storefront.tags SET slug = $2, name = $3 WHERE id = $1 RETURNING id, slug, name",
        )
        .bind(id)
        .bind(slug.as_str())
        .bind(input.name.trim())
        .fetch_optional(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "tag slug already exists"))?
        .ok_or(RepositoryError::NotFound)
    }

    /// Delete a tag and detach it from all products.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the tag doesn't exist.
    pub async fn delete_tag(&self, id: TagId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM storefront.tags WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
