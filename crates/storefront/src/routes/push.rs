//! Push subscription route handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use tracing::instrument;

use crate::db::PushSubscriptionRepository;
use crate::error::{AppError, Result};
use crate::middleware::OptionalAuth;
use crate::state::AppState;

const MAX_PLAYER_ID_LEN: usize = 128;

#[derive(Debug, Deserialize)]
pub struct Subscribe {
    pub player_id: String,
}

fn valid_player_id(id: &str) -> Result<&str> {
    let id = id.trim();
    if id.is_empty() || id.len() > MAX_PLAYER_ID_LEN {
        return Err(AppError::BadRequest("invalid subscription id".to_string()));
    }
    Ok(id)
}

/// Register a device. Logged-in users get the subscription linked to them.
#[instrument(skip(state, user, body))]
pub async fn subscribe(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Json(body): Json<Subscribe>,
) -> Result<StatusCode> {
    let player_id = valid_player_id(&body.player_id)?;
    PushSubscriptionRepository::new(state.pool())
        .upsert(player_id, user.map(|u| u.id))
        .await?;
    Ok(StatusCode::CREATED)
}

/// Forget a device.
#[instrument(skip(state))]
pub async fn unsubscribe(
    State(state): State<AppState>,
    Path(player_id): Path<String>,
) -> Result<StatusCode> {
    let player_id = valid_player_id(&player_id)?;
    PushSubscriptionRepository::new(state.pool())
        .delete(player_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
