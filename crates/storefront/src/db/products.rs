//! Product repository: listings, product pages, admin catalog writes and the
//! upserts used by the Printful catalog sync.

use rust_decimal::Decimal;
use sqlx::PgPool;

use printshop_core::{ImageId, Locale, ProductId, Slug, TagId, VariantId};

use super::{RepositoryError, conflict_on_unique, page_offset};
use crate::models::cart::CartVariant;
use crate::models::catalog::{
    Category, ImageInput, Product, ProductDetail, ProductFilter, ProductImage, ProductInput,
    ProductPage, ProductSummary, ProductTranslation, RatingSummary, Tag, TranslationInput, Variant,
    VariantInput,
};

const PRODUCT_COLUMNS: &str = "id, slug, name, description, category_id, base_price, \
                               is_published, printful_product_id, created_at, updated_at";

const VARIANT_COLUMNS: &str =
    "id, product_id, sku, name, color, size, price, printful_variant_id, is_available";

const IMAGE_COLUMNS: &str = "id, product_id, url, color, position";

// Shared by the listing and count queries. $1 locale, $2 include unpublished,
// $3 category slug, $4 tag slug, $5 ILIKE pattern.
const LISTING_FROM: &str = r"
    FROM storefront.products p
    LEFT JOIN storefront.categories c ON c.id = p.category_id
    LEFT JOIN storefront.product_translations t
           ON t.product_id = p.id AND t.locale = $1
    WHERE (p.is_published OR $2)
      AND ($3::TEXT IS NULL OR c.slug = $3)
      AND ($4::TEXT IS NULL OR EXISTS (
            SELECT 1 FROM storefront.product_tags pt
            JOIN storefront.tags tg ON tg.id = pt.tag_id
            WHERE pt.product_id = p.id AND tg.slug = $4))
      AND ($5::TEXT IS NULL
           OR p.name ILIKE $5 OR p.description ILIKE $5 OR t.name ILIKE $5)
";

/// Image row to write during catalog reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewImage {
    pub url: String,
    pub color: Option<String>,
    pub position: i32,
}

/// Variant fields coming from Printful.
#[derive(Debug, Clone)]
pub struct SyncedVariant<'a> {
    pub printful_variant_id: i64,
    pub name: &'a str,
    pub sku: Option<&'a str>,
    pub color: Option<&'a str>,
    pub size: Option<&'a str>,
    pub price: Decimal,
}

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    // Storefront reads
    // =========================================================================

    /// One page of product cards matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        filter: &ProductFilter,
        locale: Locale,
        include_unpublished: bool,
    ) -> Result<ProductPage, RepositoryError> {
        let pattern = filter.search_pattern();

        let items = sqlx::query_as::<_, ProductSummary>(&format!(
            r"
            SELECT p.id, p.slug, COALESCE(t.name, p.name) AS name, p.base_price,
                   COALESCE((SELECT MIN(v.price) FROM storefront.product_variants v
                             WHERE v.product_id = p.id AND v.is_available),
                            p.base_price) AS min_price,
                   (SELECT i.url FROM storefront.product_images i
                    WHERE i.product_id = p.id
                    ORDER BY i.position, i.id LIMIT 1) AS image_url,
                   c.slug AS category_slug, p.is_published, p.created_at
            {LISTING_FROM}
            ORDER BY {}
            LIMIT $6 OFFSET $7
            ",
            filter.sort.order_by()
        ))
        .bind(locale)
        .bind(include_unpublished)
        .bind(filter.category.as_deref())
        .bind(filter.tag.as_deref())
        .bind(pattern.as_deref())
        .bind(i64::from(filter.per_page))
        .bind(page_offset(filter.page, filter.per_page))
        .fetch_all(self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) {LISTING_FROM}"))
            .bind(locale)
            .bind(include_unpublished)
            .bind(filter.category.as_deref())
            .bind(filter.tag.as_deref())
            .bind(pattern.as_deref())
            .fetch_one(self.pool)
            .await?;

        Ok(ProductPage {
            items,
            page: filter.page,
            per_page: filter.per_page,
            total,
        })
    }

    /// Full product page by slug, localized.
    ///
    /// Unpublished products are only returned when `include_unpublished`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get_detail(
        &self,
        slug: &str,
        locale: Locale,
        include_unpublished: bool,
    ) -> Result<Option<ProductDetail>, RepositoryError> {
        let Some(product) = self.get_by_slug(slug).await? else {
            return Ok(None);
        };
        if !product.is_published && !include_unpublished {
            return Ok(None);
        }

        let translation = if locale.is_default() {
            None
        } else {
            self.get_translation(product.id, locale).await?
        };

        let category = match product.category_id {
            Some(id) => {
                sqlx::query_as::<_, Category>(
                    "SELECT id, slug, name, description, position \
                     FROM storefront.categories WHERE id = $1",
                )
                .bind(id)
                .fetch_optional(self.pool)
                .await?
            }
            None => None,
        };

        let variants = self
            .variants(product.id)
            .await?
            .into_iter()
            .filter(|v| v.is_available || include_unpublished)
            .collect();
        let images = self.images(product.id).await?;
        let tags = self.tags(product.id).await?;

        let rating = sqlx::query_as::<_, RatingSummary>(
            r"
            SELECT AVG(rating)::FLOAT8 AS average, COUNT(*) AS count
            FROM storefront.reviews
            WHERE product_id = $1 AND status = 'approved'
            ",
        )
        .bind(product.id)
        .fetch_one(self.pool)
        .await?;

        let (name, description) = match translation {
            Some(t) => (t.name, t.description),
            None => (product.name, product.description),
        };

        Ok(Some(ProductDetail {
            id: product.id,
            slug: product.slug,
            name,
            description,
            locale,
            base_price: product.base_price,
            category,
            variants,
            images,
            tags,
            rating,
        }))
    }

    /// Get a product row by slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Product>, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM storefront.products WHERE slug = $1"
        ))
        .bind(slug)
        .fetch_optional(self.pool)
        .await?;

        Ok(product)
    }

    /// Get a product row by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM storefront.products WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(product)
    }

    /// Whether a product exists and is published.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn is_published(&self, id: ProductId) -> Result<bool, RepositoryError> {
        let published: Option<bool> =
            sqlx::query_scalar("SELECT is_published FROM storefront.products WHERE id = $1")
                .bind(id)
                .fetch_optional(self.pool)
                .await?;

        Ok(published.unwrap_or(false))
    }

    /// All variants of a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn variants(&self, product_id: ProductId) -> Result<Vec<Variant>, RepositoryError> {
        let variants = sqlx::query_as::<_, Variant>(&format!(
            "SELECT {VARIANT_COLUMNS} FROM storefront.product_variants \
             WHERE product_id = $1 ORDER BY id"
        ))
        .bind(product_id)
        .fetch_all(self.pool)
        .await?;

        Ok(variants)
    }

    /// Images of a product in display order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn images(&self, product_id: ProductId) -> Result<Vec<ProductImage>, RepositoryError> {
        let images = sqlx::query_as::<_, ProductImage>(&format!(
            "SELECT {IMAGE_COLUMNS} FROM storefront.product_images \
             WHERE product_id = $1 ORDER BY position, id"
        ))
        .bind(product_id)
        .fetch_all(self.pool)
        .await?;

        Ok(images)
    }

    /// Tags attached to a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn tags(&self, product_id: ProductId) -> Result<Vec<Tag>, RepositoryError> {
        let tags = sqlx::query_as::<_, Tag>(
            r"
            SELECT t.id, t.slug, t.name
            FROM storefront.tags t
            JOIN storefront.product_tags pt ON pt.tag_id = t.id
            WHERE pt.product_id = $1
            ORDER BY t.name
            ",
        )
        .bind(product_id)
        .fetch_all(self.pool)
        .await?;

        Ok(tags)
    }

    /// Translation of a product for one locale.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_translation(
        &self,
        product_id: ProductId,
        locale: Locale,
    ) -> Result<Option<ProductTranslation>, RepositoryError> {
        let translation = sqlx::query_as::<_, ProductTranslation>(
            "SELECT product_id, locale, name, description \
             FROM storefront.product_translations WHERE product_id = $1 AND locale = $2",
        )
        .bind(product_id)
        .bind(locale)
        .fetch_optional(self.pool)
        .await?;

        Ok(translation)
    }

    /// Current price and product data for purchasable cart variants.
    ///
    /// Variants that are unavailable or belong to unpublished products are
    /// left out.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn cart_variants(
        &self,
        ids: &[VariantId],
    ) -> Result<Vec<CartVariant>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i32> = ids.iter().map(VariantId::as_i32).collect();

        let variants = sqlx::query_as::<_, CartVariant>(
            r"
            SELECT v.id AS variant_id, p.id AS product_id, p.slug AS product_slug,
                   p.name AS product_name, v.name AS variant_name, v.price,
                   v.printful_variant_id,
                   (SELECT i.url FROM storefront.product_images i
                    WHERE i.product_id = p.id AND (i.color IS NULL OR i.color = v.color)
                    ORDER BY (i.color IS NULL), i.position, i.id LIMIT 1) AS image_url
            FROM storefront.product_variants v
            JOIN storefront.products p ON p.id = v.product_id
            WHERE v.id = ANY($1) AND v.is_available AND p.is_published
            ",
        )
        .bind(&ids)
        .fetch_all(self.pool)
        .await?;

        Ok(variants)
    }

    // =========================================================================
    // Admin writes
    // =========================================================================

    /// Create a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    pub async fn create(&self, input: &ProductInput, slug: &Slug) -> Result<Product, RepositoryError> {
        sqlx::query_as::<_, Product>(&format!(
            r"
            INSERT INTO storefront.products (slug, name, description, category_id, base_price, is_published)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(slug.as_str())
        .bind(input.name.trim())
        .bind(&input.description)
        .bind(input.category_id)
        .bind(input.base_price)
        .bind(input.is_published)
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "slug already exists"))
    }

    /// Replace a product's editable fields.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist and
    /// `RepositoryError::Conflict` if the slug is taken.
    pub async fn update(
        &self,
        id: ProductId,
        input: &ProductInput,
        slug: &Slug,
    ) -> Result<Product, RepositoryError> {
        sqlx::query_as::<_, Product>(&format!(
            r"
            UPDATE storefront.products
            SET slug = $2, name = $3, description = $4, category_id = $5,
                base_price = $6, is_published = $7, updated_at = NOW()
            WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(id)
        .bind(slug.as_str())
        .bind(input.name.trim())
        .bind(&input.description)
        .bind(input.category_id)
        .bind(input.base_price)
        .bind(input.is_published)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "slug already exists"))?
        .ok_or(RepositoryError::NotFound)
    }

    /// Publish or unpublish a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    pub async fn set_published(&self, id: ProductId, published: bool) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE storefront.products SET is_published = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(published)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Delete a product and everything that cascades from it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    pub async fn delete(&self, id: ProductId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM storefront.products WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Insert or replace the translation for one locale.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails (including an
    /// unknown product).
    pub async fn upsert_translation(
        &self,
        product_id: ProductId,
        locale: Locale,
        input: &TranslationInput,
    ) -> Result<ProductTranslation, RepositoryError> {
        let translation = sqlx::query_as::<_, ProductTranslation>(
            r"
            INSERT INTO storefront.product_translations (product_id, locale, name, description)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (product_id, locale)
            DO UPDATE SET name = EXCLUDED.name, description = EXCLUDED.description
            RETURNING product_id, locale, name, description
            ",
        )
        .bind(product_id)
        .bind(locale)
        .bind(input.name.trim())
        .bind(&input.description)
        .fetch_one(self.pool)
        .await?;

        Ok(translation)
    }

    /// Add a variant to a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the Printful variant id is
    /// already mapped.
    pub async fn add_variant(
        &self,
        product_id: ProductId,
        input: &VariantInput,
    ) -> Result<Variant, RepositoryError> {
        sqlx::query_as::<_, Variant>(&format!(
            r"
            INSERT INTO storefront.product_variants
                (product_id, sku, name, color, size, price, printful_variant_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {VARIANT_COLUMNS}
            "
        ))
        .bind(product_id)
        .bind(input.sku.as_deref())
        .bind(input.name.trim())
        .bind(input.color.as_deref())
        .bind(input.size.as_deref())
        .bind(input.price)
        .bind(input.printful_variant_id)
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "printful variant already mapped"))
    }

    /// Remove a variant from a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no such variant belongs to the
    /// product.
    pub async fn remove_variant(
        &self,
        product_id: ProductId,
        variant_id: VariantId,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "DELETE FROM storefront.product_variants WHERE id = $1 AND product_id = $2",
        )
        .bind(variant_id)
        .bind(product_id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Add an image. Without an explicit position it goes last.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` for a duplicate url and color.
    pub async fn add_image(
        &self,
        product_id: ProductId,
        input: &ImageInput,
    ) -> Result<ProductImage, RepositoryError> {
        sqlx::query_as::<_, ProductImage>(&format!(
            r"
            INSERT INTO storefront.product_images (product_id, url, color, position)
            VALUES ($1, $2, $3, COALESCE($4, (
                SELECT COALESCE(MAX(position) + 1, 0)
                FROM storefront.product_images WHERE product_id = $1)))
            RETURNING {IMAGE_COLUMNS}
            "
        ))
        .bind(product_id)
        .bind(input.url.trim())
        .bind(input.color.as_deref())
        .bind(input.position)
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "image already exists for this color"))
    }

    /// Remove an image from a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no such image belongs to the
    /// product.
    pub async fn remove_image(
        &self,
        product_id: ProductId,
        image_id: ImageId,
    ) -> Result<(), RepositoryError> {
        let result =
            sqlx::query("DELETE FROM storefront.product_images WHERE id = $1 AND product_id = $2")
                .bind(image_id)
                .bind(product_id)
                .execute(self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Replace the set of tags on a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails (including an
    /// unknown tag id).
    pub async fn set_tags(&self, product_id: ProductId, tags: &[TagId]) -> Result<(), RepositoryError> {
        let tag_ids: Vec<i32> = tags.iter().map(TagId::as_i32).collect();
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM storefront.product_tags WHERE product_id = $1")
            .bind(product_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r"
            INSERT INTO storefront.product_tags (product_id, tag_id)
            SELECT $1, UNNEST($2::INT4[])
            ON CONFLICT DO NOTHING
            ",
        )
        .bind(product_id)
        .bind(&tag_ids)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    // =========================================================================
    // Catalog sync
    // =========================================================================

    /// Insert or update a product keyed by its Printful id.
    ///
    /// New products get `slug`; if that is taken, the slug is suffixed with
    /// the Printful id. Returns the product and whether it was created.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn upsert_from_printful(
        &self,
        printful_product_id: i64,
        name: &str,
        slug: &Slug,
        base_price: Decimal,
    ) -> Result<(Product, bool), RepositoryError> {
        match self
            .try_upsert_from_printful(printful_product_id, name, slug, base_price)
            .await
        {
            Err(RepositoryError::Conflict(_)) => {
                let suffixed = slug.with_suffix(printful_product_id);
                self.try_upsert_from_printful(printful_product_id, name, &suffixed, base_price)
                    .await
            }
            other => other,
        }
    }

    async fn try_upsert_from_printful(
        &self,
        printful_product_id: i64,
        name: &str,
        slug: &Slug,
        base_price: Decimal,
    ) -> Result<(Product, bool), RepositoryError> {
        #[derive(sqlx::FromRow)]
        struct Upserted {
            #[sqlx(flatten)]
            product: Product,
            inserted: bool,
        }

        let row = sqlx::query_as::<_, Upserted>(&format!(
            r"
            INSERT INTO storefront.products (slug, name, base_price, printful_product_id)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (printful_product_id)
            DO UPDATE SET name = EXCLUDED.name, base_price = EXCLUDED.base_price,
                          updated_at = NOW()
            RETURNING {PRODUCT_COLUMNS}, (xmax = 0) AS inserted
            "
        ))
        .bind(slug.as_str())
        .bind(name)
        .bind(base_price)
        .bind(printful_product_id)
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "slug already exists"))?;

        Ok((row.product, row.inserted))
    }

    /// Insert or update a variant keyed by its Printful id and mark it
    /// available.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert_variant_from_printful(
        &self,
        product_id: ProductId,
        variant: &SyncedVariant<'_>,
    ) -> Result<Variant, RepositoryError> {
        let variant = sqlx::query_as::<_, Variant>(&format!(
            r"
            INSERT INTO storefront.product_variants
                (product_id, sku, name, color, size, price, printful_variant_id, is_available)
            VALUES ($1, $2, $3, $4, $5, $6, $7, TRUE)
            ON CONFLICT (printful_variant_id)
            DO UPDATE SET product_id = EXCLUDED.product_id, sku = EXCLUDED.sku,
                          name = EXCLUDED.name, color = EXCLUDED.color,
                          size = EXCLUDED.size, price = EXCLUDED.price,
                          is_available = TRUE
            RETURNING {VARIANT_COLUMNS}
            "
        ))
        .bind(product_id)
        .bind(variant.sku)
        .bind(variant.name)
        .bind(variant.color)
        .bind(variant.size)
        .bind(variant.price)
        .bind(variant.printful_variant_id)
        .fetch_one(self.pool)
        .await?;

        Ok(variant)
    }

    /// Mark Printful-backed variants that are no longer in `keep` as
    /// unavailable. Returns how many were disabled.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn disable_missing_variants(
        &self,
        product_id: ProductId,
        keep: &[i64],
    ) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE storefront.product_variants
            SET is_available = FALSE
            WHERE product_id = $1
              AND is_available
              AND printful_variant_id IS NOT NULL
              AND NOT (printful_variant_id = ANY($2))
            ",
        )
        .bind(product_id)
        .bind(keep)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Replace all image rows of a product in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn replace_images(
        &self,
        product_id: ProductId,
        images: &[NewImage],
    ) -> Result<usize, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM storefront.product_images WHERE product_id = $1")
            .bind(product_id)
            .execute(&mut *tx)
            .await?;

        for image in images {
            sqlx::query(
                r"
                INSERT INTO storefront.product_images (product_id, url, color, position)
                VALUES ($1, $2, $3, $4)
                ",
            )
            .bind(product_id)
            .bind(&image.url)
            .bind(image.color.as_deref())
            .bind(image.position)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(images.len())
    }
}
