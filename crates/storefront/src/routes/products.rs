//! Catalog and review route handlers.
//!
//! Catalog reads go through the moka cache keyed by locale and the
//! normalized query.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Serialize;
use tracing::instrument;

use crate::db::{OrderRepository, ProductRepository, ReviewRepository, TaxonomyRepository};
use crate::error::{AppError, Result};
use crate::middleware::{RequestLocale, RequireAuth};
use crate::models::catalog::{Category, ProductDetail, ProductPage, ProductQuery, Tag};
use crate::models::review::{NewReview, Review};
use crate::services::badges::BadgeService;
use crate::services::catalog::{CacheKey, CacheValue};
use crate::state::AppState;

/// List published products.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    RequestLocale(locale): RequestLocale,
    Query(query): Query<ProductQuery>,
) -> Result<Json<Arc<ProductPage>>> {
    let filter = query.normalize();
    let key = CacheKey::Products(locale, filter.clone());
    if let Some(CacheValue::Products(page)) = state.catalog_cache().get(&key).await {
        return Ok(Json(page));
    }

    let page = Arc::new(
        ProductRepository::new(state.pool())
            .list(&filter, locale, false)
            .await?,
    );
    state
        .catalog_cache()
        .insert(key, CacheValue::Products(Arc::clone(&page)))
        .await;
    Ok(Json(page))
}

/// Product page by slug.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    RequestLocale(locale): RequestLocale,
    Path(slug): Path<String>,
) -> Result<Json<Arc<ProductDetail>>> {
    let key = CacheKey::Product(locale, slug.clone());
    if let Some(CacheValue::Product(detail)) = state.catalog_cache().get(&key).await {
        return Ok(Json(detail));
    }

    let detail = ProductRepository::new(state.pool())
        .get_detail(&slug, locale, false)
        .await?
        .map(Arc::new)
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;
    state
        .catalog_cache()
        .insert(key, CacheValue::Product(Arc::clone(&detail)))
        .await;
    Ok(Json(detail))
}

/// All categories.
pub async fn categories(State(state): State<AppState>) -> Result<Json<Arc<Vec<Category>>>> {
    if let Some(CacheValue::Categories(list)) = state.catalog_cache().get(&CacheKey::Categories).await {
        return Ok(Json(list));
    }
    let list = Arc::new(TaxonomyRepository::new(state.pool()).list_categories().await?);
    state
        .catalog_cache()
        .insert(CacheKey::Categories, CacheValue::Categories(Arc::clone(&list)))
        .await;
    Ok(Json(list))
}

/// All tags.
pub async fn tags(State(state): State<AppState>) -> Result<Json<Arc<Vec<Tag>>>> {
    if let Some(CacheValue::Tags(list)) = state.catalog_cache().get(&CacheKey::Tags).await {
        return Ok(Json(list));
    }
    let list = Arc::new(TaxonomyRepository::new(state.pool()).list_tags().await?);
    state
        .catalog_cache()
        .insert(CacheKey::Tags, CacheValue::Tags(Arc::clone(&list)))
        .await;
    Ok(Json(list))
}

// =============================================================================
// Reviews
// =============================================================================

/// Approved reviews for a product, newest first.
#[instrument(skip(state))]
pub async fn reviews(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Vec<Review>>> {
    let products = ProductRepository::new(state.pool());
    let product = products
        .get_by_slug(&slug)
        .await?
        .filter(|p| p.is_published)
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;

    let reviews = ReviewRepository::new(state.pool())
        .list_approved(product.id)
        .await?;
    Ok(Json(reviews))
}

#[derive(Debug, Serialize)]
pub struct CreatedReview {
    pub id: printshop_core::ReviewId,
    pub status: printshop_core::ReviewStatus,
    pub verified_purchase: bool,
}

/// Submit a review. Verified purchases are published immediately.
#[instrument(skip(state, user, review), fields(user_id = %user.id))]
pub async fn create_review(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(slug): Path<String>,
    Json(review): Json<NewReview>,
) -> Result<(StatusCode, Json<CreatedReview>)> {
    let review = review.validate().map_err(AppError::BadRequest)?;

    let product = ProductRepository::new(state.pool())
        .get_by_slug(&slug)
        .await?
        .filter(|p| p.is_published)
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;

    let verified_purchase = OrderRepository::new(state.pool())
        .user_purchased_product(user.id, product.id)
        .await?;

    let id = ReviewRepository::new(state.pool())
        .create(product.id, user.id, &review, verified_purchase)
        .await?;

    BadgeService::new(state.pool(), state.push())
        .refresh(user.id)
        .await;

    // Only approved reviews change the cached rating
    if verified_purchase {
        state.catalog_cache().invalidate_all();
    }

    let status = if verified_purchase {
        printshop_core::ReviewStatus::Approved
    } else {
        printshop_core::ReviewStatus::Pending
    };
    Ok((
        StatusCode::CREATED,
        Json(CreatedReview {
            id,
            status,
            verified_purchase,
        }),
    ))
}
