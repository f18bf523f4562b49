//! Scheduled job endpoints, called by an external scheduler with the cron
//! bearer token.

use axum::{Json, extract::State};
use chrono::Utc;
use serde_json::{Value, json};
use tracing::instrument;

use crate::error::Result;
use crate::middleware::RequireCron;
use crate::services::reminders::{JobReport, ReminderService};
use crate::state::AppState;

fn reminders(state: &AppState) -> ReminderService<'_> {
    ReminderService::new(state.pool(), state.config(), state.email())
}

/// `POST /api/cron/abandoned-checkouts`
#[instrument(skip_all)]
pub async fn abandoned_checkouts(
    _cron: RequireCron,
    State(state): State<AppState>,
) -> Result<Json<JobReport>> {
    Ok(Json(reminders(&state).abandoned_checkouts(Utc::now()).await?))
}

/// `POST /api/cron/review-requests`
#[instrument(skip_all)]
pub async fn review_requests(
    _cron: RequireCron,
    State(state): State<AppState>,
) -> Result<Json<JobReport>> {
    Ok(Json(reminders(&state).review_requests(Utc::now()).await?))
}

/// `POST /api/cron/expire-checkouts`
#[instrument(skip_all)]
pub async fn expire_checkouts(
    _cron: RequireCron,
    State(state): State<AppState>,
) -> Result<Json<Value>> {
    let expired = reminders(&state).expire_checkouts(Utc::now()).await?;
    Ok(Json(json!({ "expired": expired })))
}
