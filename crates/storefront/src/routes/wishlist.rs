//! Wishlist route handlers (requires auth).

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use tracing::instrument;

use printshop_core::ProductId;

use crate::db::{ProductRepository, WishlistRepository};
use crate::error::{AppError, Result};
use crate::middleware::{RequestLocale, RequireAuth};
use crate::models::catalog::ProductSummary;
use crate::services::badges::BadgeService;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AddToWishlist {
    pub product_id: ProductId,
}

/// Saved products.
pub async fn list(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    RequestLocale(locale): RequestLocale,
) -> Result<Json<Vec<ProductSummary>>> {
    let items = WishlistRepository::new(state.pool())
        .list(user.id, locale)
        .await?;
    Ok(Json(items))
}

/// Save a product. Saving twice is not an error.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn add(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(body): Json<AddToWishlist>,
) -> Result<StatusCode> {
    if !ProductRepository::new(state.pool())
        .is_published(body.product_id)
        .await?
    {
        return Err(AppError::NotFound("Product not found".to_string()));
    }

    let added = WishlistRepository::new(state.pool())
        .add(user.id, body.product_id)
        .await?;
    if added {
        BadgeService::new(state.pool(), state.push())
            .refresh(user.id)
            .await;
        Ok(StatusCode::CREATED)
    } else {
        Ok(StatusCode::OK)
    }
}

/// Remove a saved product.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(product_id): Path<i32>,
) -> Result<StatusCode> {
    WishlistRepository::new(state.pool())
        .remove(user.id, ProductId::new(product_id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
