//! Admin order management.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use tracing::{info, instrument};

use printshop_core::{OrderId, OrderStatus};

use super::page_params;
use crate::db::OrderRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::order::{Order, OrderSummary, OrderWithItems};
use crate::services::fulfillment::FulfillmentService;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct OrderListQuery {
    pub status: Option<OrderStatus>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct StatusChange {
    pub status: OrderStatus,
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

pub async fn list(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Query(query): Query<OrderListQuery>,
) -> Result<Json<Vec<OrderSummary>>> {
    let (page, per_page) = page_params(query.page, query.per_page);
    let orders = OrderRepository::new(state.pool())
        .list(query.status, page, per_page)
        .await?;
    Ok(Json(orders))
}

pub async fn show(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<OrderWithItems>> {
    OrderRepository::new(state.pool())
        .get_with_items(OrderId::new(id))
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))
}

/// Move an order along its lifecycle. Disallowed edges answer 409.
#[instrument(skip(state, admin, body), fields(admin_id = %admin.id, to = %body.status))]
pub async fn set_status(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(body): Json<StatusChange>,
) -> Result<Json<Order>> {
    let order = fulfillment(&state)
        .set_status(OrderId::new(id), body.status)
        .await?;
    Ok(Json(order))
}

/// Resubmit an order stuck in `fulfillment_failed`.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn resubmit(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Order>> {
    let order = fulfillment(&state).resubmit(OrderId::new(id)).await?;
    info!(order_id = %order.id, printful_order_id = ?order.printful_order_id, "Order resubmitted");
    Ok(Json(order))
}
