//! Account route handlers (requires auth).

use axum::{
    Json,
    extract::{Path, State},
};
use tracing::instrument;

use printshop_core::OrderId;

use crate::db::{BadgeRepository, OrderRepository, UserRepository};
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::User;
use crate::models::badge::Badge;
use crate::models::order::{OrderSummary, OrderWithItems};
use crate::models::user::{ProfileUpdate, ReferralSummary};
use crate::services::auth::validate_display_name;
use crate::state::AppState;

/// Current user's profile.
pub async fn profile(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<User>> {
    let user = UserRepository::new(state.pool())
        .get_by_id(user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Account not found".to_string()))?;
    Ok(Json(user))
}

/// Update display name or marketing consent.
#[instrument(skip(state, user, update), fields(user_id = %user.id))]
pub async fn update_profile(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<User>> {
    let display_name = update
        .display_name
        .as_deref()
        .map(validate_display_name)
        .transpose()?;

    let user = UserRepository::new(state.pool())
        .update_profile(user.id, display_name, update.marketing_opt_in)
        .await?;
    Ok(Json(user))
}

/// Order history.
pub async fn orders(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<OrderSummary>>> {
    let orders = OrderRepository::new(state.pool())
        .list_for_user(user.id)
        .await?;
    Ok(Json(orders))
}

/// One of the user's own orders. Other users' orders are reported missing.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn order(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<i32>,
) -> Result<Json<OrderWithItems>> {
    let order = OrderRepository::new(state.pool())
        .get_for_user(OrderId::new(id), user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;
    Ok(Json(order))
}

/// Badges earned so far.
pub async fn badges(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<Badge>>> {
    let badges = BadgeRepository::new(state.pool())
        .list_for_user(user.id)
        .await?;
    Ok(Json(badges))
}

/// Referral code, share link and how many people it brought in.
pub async fn referrals(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<ReferralSummary>> {
    let users = UserRepository::new(state.pool());
    let account = users
        .get_by_id(user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Account not found".to_string()))?;
    let (referred_count, referred_buyers) = users.referral_counts(user.id).await?;

    Ok(Json(ReferralSummary {
        share_url: state.email().referral_url(&account.referral_code),
        code: account.referral_code,
        referred_count,
        referred_buyers,
    }))
}
