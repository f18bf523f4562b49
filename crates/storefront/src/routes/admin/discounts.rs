//! Admin discount code management.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use tracing::{info, instrument};

use printshop_core::DiscountId;

use crate::db::DiscountRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::discount::{Discount, DiscountInput};
use crate::state::AppState;

pub async fn list(
    _admin: RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<Discount>>> {
    Ok(Json(DiscountRepository::new(state.pool()).list().await?))
}

#[instrument(skip(state, admin, input), fields(admin_id = %admin.id))]
pub async fn create(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<DiscountInput>,
) -> Result<(StatusCode, Json<Discount>)> {
    let input = input.validate().map_err(AppError::BadRequest)?;
    let discount = DiscountRepository::new(state.pool()).create(&input).await?;

    info!(code = %discount.code, kind = %discount.kind, "Discount created");
    Ok((StatusCode::CREATED, Json(discount)))
}

pub async fn update(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(input): Json<DiscountInput>,
) -> Result<Json<Discount>> {
    let input = input.validate().map_err(AppError::BadRequest)?;
    let discount = DiscountRepository::new(state.pool())
        .update(DiscountId::new(id), &input)
        .await?;
    Ok(Json(discount))
}

/// Deactivate rather than delete; past orders still name the code.
pub async fn deactivate(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Discount>> {
    let discount = DiscountRepository::new(state.pool())
        .deactivate(DiscountId::new(id))
        .await?;
    Ok(Json(discount))
}
