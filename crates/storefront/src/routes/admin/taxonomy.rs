//! Admin category and tag management.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use printshop_core::{CategoryId, TagId};

use super::resolve_slug;
use crate::db::TaxonomyRepository;
use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::models::catalog::{Category, CategoryInput, Tag, TagInput};
use crate::state::AppState;

pub async fn create_category(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<CategoryInput>,
) -> Result<(StatusCode, Json<Category>)> {
    let slug = resolve_slug(input.slug.as_deref(), &input.name)?;
    let category = TaxonomyRepository::new(state.pool())
        .create_category(&input, &slug)
        .await?;
    state.catalog_cache().invalidate_all();
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn update_category(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(input): Json<CategoryInput>,
) -> Result<Json<Category>> {
    let slug = resolve_slug(input.slug.as_deref(), &input.name)?;
    let category = TaxonomyRepository::new(state.pool())
        .update_category(CategoryId::new(id), &input, &slug)
        .await?;
    state.catalog_cache().invalidate_all();
    Ok(Json(category))
}

pub async fn delete_category(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode> {
    TaxonomyRepository::new(state.pool())
        .delete_category(CategoryId::new(id))
        .await?;
    state.catalog_cache().invalidate_all();
    Ok(StatusCode::NO_CONTENT)
}

pub async fn create_tag(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<TagInput>,
) -> Result<(StatusCode, Json<Tag>)> {
    let slug = resolve_slug(input.slug.as_deref(), &input.name)?;
    let tag = TaxonomyRepository::new(state.pool())
        .create_tag(&input, &slug)
        .await?;
    state.catalog_cache().invalidate_all();
    Ok((StatusCode::CREATED, Json(tag)))
}

pub async fn update_tag(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(input): Json<TagInput>,
) -> Result<Json<Tag>> {
    let slug = resolve_slug(input.slug.as_deref(), &input.name)?;
    let tag = TaxonomyRepository::new(state.pool())
        .update_tag(TagId::new(id), &input, &slug)
        .await?;
    state.catalog_cache().invalidate_all();
    Ok(Json(tag))
}

pub async fn delete_tag(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode> {
    TaxonomyRepository::new(state.pool())
        .delete_tag(TagId::new(id))
        .await?;
    state.catalog_cache().invalidate_all();
    Ok(StatusCode::NO_CONTENT)
}
