//! Guard for the scheduled-job endpoints.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use secrecy::ExposeSecret;

use crate::error::AppError;
use crate::services::stripe::constant_time_compare;
use crate::state::AppState;

/// Extractor that requires `Authorization: Bearer <CRON_SECRET>`.
pub struct RequireCron;

impl FromRequestParts<AppState> for RequireCron {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim);

        match token {
            Some(token) if constant_time_compare(token, state.config().cron_secret.expose_secret()) => {
                Ok(Self)
            }
            _ => {
                tracing::warn!(path = %parts.uri.path(), "Rejected cron request");
                Err(AppError::Unauthorized("Invalid cron token".to_string()))
            }
        }
    }
}
