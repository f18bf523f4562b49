//! Admin dashboard.

use axum::{Json, extract::State};

use crate::db::OrderRepository;
use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::models::order::DashboardStats;
use crate::state::AppState;

/// Order volume, revenue and queues needing attention.
pub async fn show(
    _admin: RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<DashboardStats>> {
    let stats = OrderRepository::new(state.pool()).dashboard_stats().await?;
    Ok(Json(stats))
}
