//! Catalog models: products, variants, images, categories, tags.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use printshop_core::{CategoryId, ImageId, Locale, ProductId, TagId, VariantId};

/// Default page size for product listings.
pub const DEFAULT_PER_PAGE: u32 = 24;

/// Largest page size a client may request.
pub const MAX_PER_PAGE: u32 = 100;

/// A product category.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, sqlx::FromRow)]
pub struct Category {
    pub id: CategoryId,
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub position: i32,
}

/// A product tag.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, sqlx::FromRow)]
pub struct Tag {
    pub id: TagId,
    pub slug: String,
    pub name: String,
}

/// A product row.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Product {
    pub id: ProductId,
    pub slug: String,
    pub name: String,
    pub description: String,
    pub category_id: Option<CategoryId>,
    pub base_price: Decimal,
    pub is_published: bool,
    pub printful_product_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A purchasable variant of a product.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, sqlx::FromRow)]
pub struct Variant {
    pub id: VariantId,
    pub product_id: ProductId,
    pub sku: Option<String>,
    pub name: String,
    pub color: Option<String>,
    pub size: Option<String>,
    pub price: Decimal,
    pub printful_variant_id: Option<i64>,
    pub is_available: bool,
}

/// A product image, optionally tied to a color.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, sqlx::FromRow)]
pub struct ProductImage {
    pub id: ImageId,
    pub product_id: ProductId,
    pub url: String,
    pub color: Option<String>,
    pub position: i32,
}

/// Localized product copy.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProductTranslation {
    pub product_id: ProductId,
    pub locale: Locale,
    pub name: String,
    pub description: String,
}

/// Product card used in listings.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProductSummary {
    pub id: ProductId,
    pub slug: String,
    pub name: String,
    pub base_price: Decimal,
    pub min_price: Decimal,
    pub image_url: Option<String>,
    pub category_slug: Option<String>,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
}

/// Average rating and number of approved reviews.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, sqlx::FromRow)]
pub struct RatingSummary {
    pub average: Option<f64>,
    pub count: i64,
}

/// Full product page payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductDetail {
    pub id: ProductId,
    pub slug: String,
    pub name: String,
    pub description: String,
    pub locale: Locale,
    pub base_price: Decimal,
    pub category: Option<Category>,
    pub variants: Vec<Variant>,
    pub images: Vec<ProductImage>,
    pub tags: Vec<Tag>,
    pub rating: RatingSummary,
}

/// Sort order for product listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
    Name,
}

impl ProductSort {
    /// `ORDER BY` clause for the listing query. Only ever one of these fixed
    /// strings is interpolated into SQL.
    #[must_use]
    pub const fn order_by(self) -> &'static str {
        match self {
            Self::Newest => "p.created_at DESC, p.id DESC",
            Self::PriceAsc => "min_price ASC, p.id ASC",
            Self::PriceDesc => "min_price DESC, p.id DESC",
            Self::Name => "name ASC, p.id ASC",
        }
    }
}

/// Raw listing query parameters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductQuery {
    pub category: Option<String>,
    pub tag: Option<String>,
    pub q: Option<String>,
    pub sort: Option<ProductSort>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// Normalized listing filter, also used as the cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProductFilter {
    pub category: Option<String>,
    pub tag: Option<String>,
    pub search: Option<String>,
    pub sort: ProductSort,
    pub page: u32,
    pub per_page: u32,
}

impl ProductQuery {
    /// Trim and clamp the raw parameters.
    #[must_use]
    pub fn normalize(self) -> ProductFilter {
        fn non_empty(value: Option<String>) -> Option<String> {
            value
                .map(|v| v.trim().to_lowercase())
                .filter(|v| !v.is_empty())
        }

        ProductFilter {
            category: non_empty(self.category),
            tag: non_empty(self.tag),
            search: non_empty(self.q).map(|q| q.chars().take(100).collect()),
            sort: self.sort.unwrap_or_default(),
            page: self.page.unwrap_or(1).max(1),
            per_page: self
                .per_page
                .unwrap_or(DEFAULT_PER_PAGE)
                .clamp(1, MAX_PER_PAGE),
        }
    }
}

impl ProductFilter {
    /// `ILIKE` pattern for the search term, with wildcards escaped.
    #[must_use]
    pub fn search_pattern(&self) -> Option<String> {
        self.search.as_ref().map(|s| {
            let escaped = s
                .replace('\\', "\\\\")
                .replace('%', "\\%")
                .replace('_', "\\_");
            format!("%{escaped}%")
        })
    }
}

/// One page of product cards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductPage {
    pub items: Vec<ProductSummary>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

/// Admin input for creating or replacing a product.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductInput {
    pub name: String,
    pub slug: Option<String>,
    #[serde(default)]
    pub description: String,
    pub category_id: Option<CategoryId>,
    pub base_price: Decimal,
    #[serde(default)]
    pub is_published: bool,
}

/// Admin input for a variant.
#[derive(Debug, Clone, Deserialize)]
pub struct VariantInput {
    pub name: String,
    pub sku: Option<String>,
    pub color: Option<String>,
    pub size: Option<String>,
    pub price: Decimal,
    pub printful_variant_id: Option<i64>,
}

/// Admin input for an image.
#[derive(Debug, Clone, Deserialize)]
pub struct ImageInput {
    pub url: String,
    pub color: Option<String>,
    pub position: Option<i32>,
}

/// Admin input for a translation.
#[derive(Debug, Clone, Deserialize)]
pub struct TranslationInput {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Admin input for a category.
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryInput {
    pub name: String,
    pub slug: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub position: i32,
}

/// Admin input for a tag.
#[derive(Debug, Clone, Deserialize)]
pub struct TagInput {
    pub name: String,
    pub slug: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_defaults() {
        let filter = ProductQuery::default().normalize();
        assert_eq!(filter.page, 1);
        assert_eq!(filter.per_page, DEFAULT_PER_PAGE);
        assert_eq!(filter.sort, ProductSort::Newest);
        assert!(filter.search.is_none());
    }

    #[test]
    fn test_normalize_clamps() {
        let filter = ProductQuery {
            page: Some(0),
            per_page: Some(1000),
            ..ProductQuery::default()
        }
        .normalize();
        assert_eq!(filter.page, 1);
        assert_eq!(filter.per_page, MAX_PER_PAGE);

        let filter = ProductQuery {
            per_page: Some(0),
            ..ProductQuery::default()
        }
        .normalize();
        assert_eq!(filter.per_page, 1);
    }

    #[test]
    fn test_normalize_trims_filters() {
        let filter = ProductQuery {
            category: Some("  Shirts ".to_string()),
            tag: Some("   ".to_string()),
            q: Some(" Hoodie ".to_string()),
            ..ProductQuery::default()
        }
        .normalize();
        assert_eq!(filter.category.as_deref(), Some("shirts"));
        assert!(filter.tag.is_none());
        assert_eq!(filter.search.as_deref(), Some("hoodie"));
    }

    #[test]
    fn test_search_pattern_escapes_wildcards() {
        let filter = ProductQuery {
            q: Some("100%_cotton".to_string()),
            ..ProductQuery::default()
        }
        .normalize();
        assert_eq!(
            filter.search_pattern().as_deref(),
            Some("%100\\%\\_cotton%")
        );
    }

    #[test]
    fn test_sort_deserialize() {
        let sort: ProductSort = serde_json::from_str("\"price_desc\"").unwrap_or_default();
        assert_eq!(sort, ProductSort::PriceDesc);
    }
}
