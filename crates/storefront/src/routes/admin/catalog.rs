//! Printful catalog sync trigger.

use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;
use tracing::{info, instrument};

use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::services::catalog::{CatalogSync, SyncReport};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct SyncQuery {
    #[serde(default)]
    pub dry_run: bool,
}

/// `POST /admin/api/catalog/sync[?dry_run=true]`
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn sync(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Query(query): Query<SyncQuery>,
) -> Result<Json<SyncReport>> {
    let report = CatalogSync::new(state.pool(), state.printful(), state.catalog_cache())
        .run(query.dry_run)
        .await?;

    info!(
        created = report.products_created,
        updated = report.products_updated,
        errors = report.errors.len(),
        dry_run = report.dry_run,
        "Catalog sync finished"
    );
    Ok(Json(report))
}
