//! Cart route handlers.
//!
//! The cart lives in the session as variant ids and quantities. Every
//! response re-prices it from the database.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use printshop_core::VariantId;

use crate::db::ProductRepository;
use crate::error::{AppError, Result};
use crate::models::cart::{Cart, CartError, PricedCart};
use crate::models::discount::normalize_code;
use crate::models::keys;
use crate::services::checkout::CheckoutService;
use crate::state::AppState;

// =============================================================================
// Request Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct AddItem {
    pub variant_id: VariantId,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

const fn default_quantity() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
pub struct UpdateItem {
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
pub struct ApplyDiscount {
    pub code: String,
}

// =============================================================================
// Session Helpers
// =============================================================================

/// Load the cart from the session; a missing or unreadable cart is empty.
pub(crate) async fn load_cart(session: &Session) -> Cart {
    session
        .get::<Cart>(keys::CART)
        .await
        .ok()
        .flatten()
        .unwrap_or_default()
}

pub(crate) async fn save_cart(session: &Session, cart: &Cart) -> Result<()> {
    session.insert(keys::CART, cart).await?;
    Ok(())
}

/// Price the cart and drop lines whose variants disappeared.
async fn priced(state: &AppState, session: &Session, mut cart: Cart) -> Result<Json<PricedCart>> {
    let priced = CheckoutService::new(state.pool(), state.config())
        .price(&cart)
        .await?;

    if priced.lines.len() != cart.lines.len() {
        cart.retain_variants(|id| priced.lines.iter().any(|l| l.variant_id == id));
        save_cart(session, &cart).await?;
    }
    Ok(Json(priced))
}

fn cart_error(e: CartError) -> AppError {
    match e {
        CartError::NotInCart => AppError::NotFound(e.to_string()),
        CartError::InvalidQuantity | CartError::TooManyLines => AppError::BadRequest(e.to_string()),
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Current cart with prices and totals.
#[instrument(skip(state, session))]
pub async fn show(State(state): State<AppState>, session: Session) -> Result<Json<PricedCart>> {
    let cart = load_cart(&session).await;
    priced(&state, &session, cart).await
}

/// Add a variant to the cart.
#[instrument(skip(state, session))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    Json(item): Json<AddItem>,
) -> Result<Json<PricedCart>> {
    let available = ProductRepository::new(state.pool())
        .cart_variants(&[item.variant_id])
        .await?;
    if available.is_empty() {
        return Err(AppError::NotFound("Product variant not available".to_string()));
    }

    let mut cart = load_cart(&session).await;
    cart.add(item.variant_id, item.quantity).map_err(cart_error)?;
    save_cart(&session, &cart).await?;
    priced(&state, &session, cart).await
}

/// Set a line's quantity. Zero removes the line.
#[instrument(skip(state, session))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    Path(variant_id): Path<i32>,
    Json(item): Json<UpdateItem>,
) -> Result<Json<PricedCart>> {
    let mut cart = load_cart(&session).await;
    cart.set_quantity(VariantId::new(variant_id), item.quantity)
        .map_err(cart_error)?;
    save_cart(&session, &cart).await?;
    priced(&state, &session, cart).await
}

/// Remove a line.
#[instrument(skip(state, session))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    Path(variant_id): Path<i32>,
) -> Result<Json<PricedCart>> {
    let mut cart = load_cart(&session).await;
    if cart.remove(VariantId::new(variant_id)) {
        save_cart(&session, &cart).await?;
    }
    priced(&state, &session, cart).await
}

/// Empty the cart, discount included.
#[instrument(skip(state, session))]
pub async fn clear(State(state): State<AppState>, session: Session) -> Result<Json<PricedCart>> {
    let mut cart = load_cart(&session).await;
    cart.clear();
    cart.discount_code = None;
    save_cart(&session, &cart).await?;
    priced(&state, &session, cart).await
}

/// Validate a discount code against the current cart and keep it.
#[instrument(skip(state, session, body))]
pub async fn apply_discount(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<ApplyDiscount>,
) -> Result<Json<PricedCart>> {
    let code = normalize_code(&body.code);
    if code.is_empty() {
        return Err(AppError::BadRequest("discount code is required".to_string()));
    }

    let mut cart = load_cart(&session).await;
    cart.discount_code = Some(code);
    let priced = CheckoutService::new(state.pool(), state.config())
        .price(&cart)
        .await?;
    if let Some(reason) = priced.discount_error {
        return Err(AppError::BadRequest(reason));
    }

    save_cart(&session, &cart).await?;
    Ok(Json(priced))
}

/// Drop the discount code.
#[instrument(skip(state, session))]
pub async fn remove_discount(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<PricedCart>> {
    let mut cart = load_cart(&session).await;
    cart.discount_code = None;
    save_cart(&session, &cart).await?;
    priced(&state, &session, cart).await
}
