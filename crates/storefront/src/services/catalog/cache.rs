//! Read-through cache for public catalog queries.
//!
//! Entries live for 5 minutes and the whole cache is dropped on every
//! admin catalog write and after a sync.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;

use printshop_core::Locale;

use crate::models::catalog::{Category, ProductDetail, ProductFilter, ProductPage, Tag};

/// Cache key for catalog reads.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Products(Locale, ProductFilter),
    Product(Locale, String),
    Categories,
    Tags,
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Products(Arc<ProductPage>),
    Product(Arc<ProductDetail>),
    Categories(Arc<Vec<Category>>),
    Tags(Arc<Vec<Tag>>),
}

/// Shared catalog cache. Cloning is cheap.
#[derive(Clone)]
pub struct CatalogCache {
    cache: Cache<CacheKey, CacheValue>,
}

impl std::fmt::Debug for CatalogCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogCache")
            .field("entries", &self.cache.entry_count())
            .finish()
    }
}

impl Default for CatalogCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(300))
    }
}

impl CatalogCache {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(ttl)
            .build();
        Self { cache }
    }

    pub async fn get(&self, key: &CacheKey) -> Option<CacheValue> {
        self.cache.get(key).await
    }

    pub async fn insert(&self, key: CacheKey, value: CacheValue) {
        self.cache.insert(key, value).await;
    }

    /// Drop every entry.
    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::catalog::ProductQuery;

    #[tokio::test]
    async fn test_keys_are_per_locale() {
        let cache = CatalogCache::default();
        let filter = ProductQuery::default().normalize();
        let page = ProductPage {
            items: vec![],
            page: 1,
            per_page: 24,
            total: 0,
        };
        cache
            .insert(
                CacheKey::Products(Locale::En, filter.clone()),
                CacheValue::Products(Arc::new(page)),
            )
            .await;

        assert!(
            cache
                .get(&CacheKey::Products(Locale::En, filter.clone()))
                .await
                .is_some()
        );
        assert!(
            cache
                .get(&CacheKey::Products(Locale::Es, filter))
                .await
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_invalidate_all() {
        let cache = CatalogCache::default();
        cache
            .insert(CacheKey::Tags, CacheValue::Tags(Arc::new(vec![])))
            .await;
        cache.invalidate_all();
        assert!(cache.get(&CacheKey::Tags).await.is_none());
    }
}
