//! Payment and fulfillment provider webhooks.
//!
//! Both providers redeliver on any non-2xx answer, so handlers only fail when
//! a retry could succeed. Events that can never be applied are acknowledged.

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use serde_json::{Value, json};
use tracing::{info, instrument, warn};

use crate::db::CheckoutSessionRepository;
use crate::error::{AppError, Result};
use crate::services::fulfillment::{EventOutcome, FulfillmentService, ReconcileOutcome};
use crate::services::printful::WebhookEvent;
use crate::services::stripe::{CheckoutSessionObject, StripeError, events};
use crate::state::AppState;

const STRIPE_SIGNATURE_HEADER: &str = "stripe-signature";

fn received() -> Json<Value> {
    Json(json!({ "received": true }))
}

fn fulfillment(state: &AppState) -> FulfillmentService<'_> {
    FulfillmentService::new(
        state.pool(),
        state.config(),
        state.printful(),
        state.email(),
        state.push(),
    )
}

// =============================================================================
// Stripe
// =============================================================================

/// `POST /api/webhooks/stripe`
#[instrument(skip(state, headers, body))]
pub async fn stripe(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>> {
    let signature = headers
        .get(STRIPE_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::BadRequest("Missing Stripe-Signature header".to_string()))?;
    let payload = std::str::from_utf8(&body)
        .map_err(|_| AppError::BadRequest("Payload is not UTF-8".to_string()))?;

    let event = state
        .stripe()
        .construct_event(payload, signature)
        .map_err(|e| match e {
            StripeError::InvalidSignature(reason) => {
                warn!(%reason, "Rejected Stripe webhook");
                AppError::BadRequest("Invalid signature".to_string())
            }
            other => AppError::BadRequest(other.to_string()),
        })?;

    info!(event_id = %event.id, kind = %event.kind, "Stripe event received");

    match event.kind.as_str() {
        events::CHECKOUT_COMPLETED | events::CHECKOUT_ASYNC_PAYMENT_SUCCEEDED => {
            let session: CheckoutSessionObject = serde_json::from_value(event.data.object)
                .map_err(|e| AppError::BadRequest(format!("Invalid checkout session: {e}")))?;

            if !session.is_paid() {
                info!(session_id = %session.id, status = %session.payment_status, "Checkout not paid yet");
                return Ok(received());
            }

            match fulfillment(&state).reconcile_checkout(&session).await? {
                ReconcileOutcome::Created {
                    order_id,
                    submission,
                } => {
                    info!(order_id = %order_id, ?submission, "Order created from checkout");
                }
                ReconcileOutcome::Resumed {
                    order_id,
                    submission,
                } => {
                    info!(order_id = %order_id, ?submission, "Stalled order submitted on redelivery");
                }
                ReconcileOutcome::Duplicate => {
                    info!(session_id = %session.id, "Duplicate checkout event ignored");
                }
            }
        }
        events::CHECKOUT_EXPIRED => {
            if let Some(id) = event.data.object.get("id").and_then(Value::as_str) {
                CheckoutSessionRepository::new(state.pool())
                    .mark_expired(id)
                    .await?;
            }
        }
        _ => {}
    }

    Ok(received())
}

// =============================================================================
// Printful
// =============================================================================

/// `POST /api/webhooks/printful`
#[instrument(skip(state, body))]
pub async fn printful(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<Value>)> {
    let event: WebhookEvent = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("Invalid Printful payload: {e}")))?;

    if event.store_id().as_deref() != Some(state.printful().store_id()) {
        warn!(store = ?event.store_id(), "Printful webhook for another store");
        return Err(AppError::Unauthorized("Unknown store".to_string()));
    }

    match fulfillment(&state).apply_printful_event(&event).await? {
        EventOutcome::Applied { order_id, status } => {
            info!(order_id = %order_id, %status, kind = %event.kind, "Printful event applied");
        }
        EventOutcome::Ignored(reason) => {
            info!(kind = %event.kind, reason, "Printful event ignored");
        }
    }

    Ok((StatusCode::OK, received()))
}
