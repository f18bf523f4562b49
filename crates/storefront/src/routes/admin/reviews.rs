//! Admin review moderation.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;

use printshop_core::{ReviewId, ReviewStatus};

use super::page_params;
use crate::db::ReviewRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::review::Review;
use crate::services::badges::BadgeService;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ReviewListQuery {
    pub status: Option<ReviewStatus>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct StatusChange {
    pub status: ReviewStatus,
}

pub async fn list(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Query(query): Query<ReviewListQuery>,
) -> Result<Json<Vec<Review>>> {
    let (page, per_page) = page_params(query.page, query.per_page);
    let reviews = ReviewRepository::new(state.pool())
        .list(query.status, page, per_page)
        .await?;
    Ok(Json(reviews))
}

/// Approve or reject a review. Product ratings change, so the catalog cache
/// is dropped.
pub async fn set_status(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(body): Json<StatusChange>,
) -> Result<Json<Review>> {
    let id = ReviewId::new(id);
    let repo = ReviewRepository::new(state.pool());
    repo.set_status(id, body.status).await?;
    let review = repo
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Review not found".to_string()))?;

    state.catalog_cache().invalidate_all();
    if review.status == ReviewStatus::Approved {
        BadgeService::new(state.pool(), state.push())
            .refresh(review.user_id)
            .await;
    }
    Ok(Json(review))
}

pub async fn delete(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode> {
    ReviewRepository::new(state.pool())
        .delete(ReviewId::new(id))
        .await?;
    state.catalog_cache().invalidate_all();
    Ok(StatusCode::NO_CONTENT)
}
