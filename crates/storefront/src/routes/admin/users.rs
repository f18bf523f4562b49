//! Admin user management.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use tracing::{info, instrument};

use printshop_core::{UserId, UserRole};

use super::page_params;
use crate::db::UserRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::User;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UserListQuery {
    pub q: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct RoleChange {
    pub role: UserRole,
}

pub async fn list(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Query(query): Query<UserListQuery>,
) -> Result<Json<Vec<User>>> {
    let (page, per_page) = page_params(query.page, query.per_page);
    let search = query.q.as_deref().map(str::trim).filter(|q| !q.is_empty());
    let users = UserRepository::new(state.pool())
        .list(search, page, per_page)
        .await?;
    Ok(Json(users))
}

/// Change a user's role. Admins cannot demote themselves.
#[instrument(skip(state, admin, body), fields(admin_id = %admin.id, role = %body.role))]
pub async fn set_role(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(body): Json<RoleChange>,
) -> Result<Json<User>> {
    let id = UserId::new(id);
    if id == admin.id && body.role != UserRole::Admin {
        return Err(AppError::BadRequest("cannot remove your own admin role".to_string()));
    }

    let user = UserRepository::new(state.pool())
        .set_role(id, body.role)
        .await?;
    info!(user_id = %user.id, role = %user.role, "User role changed");
    Ok(Json(user))
}
