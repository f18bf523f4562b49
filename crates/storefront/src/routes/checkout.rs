//! Checkout route handler.
//!
//! Creates a hosted Stripe Checkout Session for the session cart. The priced
//! cart is stored alongside the Stripe session id; the order itself is only
//! written when the payment webhook arrives.

use axum::{Json, extract::State};
use serde::Serialize;
use tower_sessions::Session;
use tracing::{info, instrument};

use crate::db::CheckoutSessionRepository;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::OptionalAuth;
use crate::routes::cart::load_cart;
use crate::services::checkout::CheckoutService;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub url: String,
}

/// Start checkout.
#[instrument(skip(state, session, user))]
pub async fn create(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
) -> Result<Json<CheckoutResponse>> {
    let cart = load_cart(&session).await;
    if cart.is_empty() {
        return Err(AppError::BadRequest("Your cart is empty".to_string()));
    }

    let service = CheckoutService::new(state.pool(), state.config());
    let priced = service.price(&cart).await?;
    if priced.is_empty() {
        return Err(AppError::BadRequest(
            "None of the items in your cart are available".to_string(),
        ));
    }

    let params = service.session_params(&priced, user.as_ref())?;
    let created = state.stripe().create_checkout_session(&params).await?;
    let url = created
        .url
        .ok_or_else(|| AppError::Internal("Stripe returned a session without a URL".to_string()))?;

    CheckoutSessionRepository::new(state.pool())
        .create(
            &created.id,
            user.as_ref().map(|u| u.id),
            user.as_ref().map(|u| u.email.as_str()),
            &priced,
        )
        .await?;

    info!(
        session_id = %created.id,
        total = %priced.totals.total,
        lines = priced.lines.len(),
        "Checkout session created"
    );
    add_breadcrumb(
        "checkout",
        "Checkout started",
        Some(&[("session_id", created.id.as_str())][..]),
    );

    Ok(Json(CheckoutResponse { url }))
}
