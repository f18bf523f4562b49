//! Admin product management. Every write invalidates the catalog cache.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use printshop_core::{ImageId, Locale, ProductId, TagId, VariantId};

use super::resolve_slug;
use crate::db::ProductRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::catalog::{
    ImageInput, Product, ProductImage, ProductInput, ProductPage, ProductQuery,
    ProductTranslation, Tag, TranslationInput, Variant, VariantInput,
};
use crate::state::AppState;

/// Product with everything an edit screen needs.
#[derive(Debug, Serialize)]
pub struct AdminProduct {
    #[serde(flatten)]
    pub product: Product,
    pub variants: Vec<Variant>,
    pub images: Vec<ProductImage>,
    pub tags: Vec<Tag>,
}

#[derive(Debug, Deserialize)]
pub struct TagIds {
    pub tag_ids: Vec<TagId>,
}

fn validate_product(input: &ProductInput) -> Result<()> {
    if input.base_price.is_sign_negative() {
        return Err(AppError::BadRequest("base price must not be negative".to_string()));
    }
    Ok(())
}

pub async fn list(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> Result<Json<ProductPage>> {
    let page = ProductRepository::new(state.pool())
        .list(&query.normalize(), Locale::default(), true)
        .await?;
    Ok(Json(page))
}

pub async fn show(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<AdminProduct>> {
    let id = ProductId::new(id);
    let repo = ProductRepository::new(state.pool());
    let product = repo
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;

    Ok(Json(AdminProduct {
        product,
        variants: repo.variants(id).await?,
        images: repo.images(id).await?,
        tags: repo.tags(id).await?,
    }))
}

#[instrument(skip(state, admin, input), fields(admin_id = %admin.id))]
pub async fn create(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<ProductInput>,
) -> Result<(StatusCode, Json<Product>)> {
    validate_product(&input)?;
    let slug = resolve_slug(input.slug.as_deref(), &input.name)?;
    let product = ProductRepository::new(state.pool())
        .create(&input, &slug)
        .await?;
    state.catalog_cache().invalidate_all();

    info!(product_id = %product.id, slug = %product.slug, "Product created");
    Ok((StatusCode::CREATED, Json(product)))
}

#[instrument(skip(state, admin, input), fields(admin_id = %admin.id))]
pub async fn update(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(input): Json<ProductInput>,
) -> Result<Json<Product>> {
    validate_product(&input)?;
    let slug = resolve_slug(input.slug.as_deref(), &input.name)?;
    let product = ProductRepository::new(state.pool())
        .update(ProductId::new(id), &input, &slug)
        .await?;
    state.catalog_cache().invalidate_all();
    Ok(Json(product))
}

#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn delete(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode> {
    ProductRepository::new(state.pool())
        .delete(ProductId::new(id))
        .await?;
    state.catalog_cache().invalidate_all();

    info!(product_id = id, "Product deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn set_published(state: &AppState, id: i32, published: bool) -> Result<StatusCode> {
    ProductRepository::new(state.pool())
        .set_published(ProductId::new(id), published)
        .await?;
    state.catalog_cache().invalidate_all();
    Ok(StatusCode::NO_CONTENT)
}

pub async fn publish(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode> {
    set_published(&state, id, true).await
}

pub async fn unpublish(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode> {
    set_published(&state, id, false).await
}

pub async fn upsert_translation(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path((id, locale)): Path<(i32, String)>,
    Json(input): Json<TranslationInput>,
) -> Result<Json<ProductTranslation>> {
    let locale: Locale = locale
        .parse()
        .map_err(|_| AppError::BadRequest(format!("unsupported locale: {locale}")))?;
    if locale.is_default() {
        return Err(AppError::BadRequest(
            "the default locale is edited on the product itself".to_string(),
        ));
    }
    if input.name.trim().is_empty() {
        return Err(AppError::BadRequest("name is required".to_string()));
    }

    let translation = ProductRepository::new(state.pool())
        .upsert_translation(ProductId::new(id), locale, &input)
        .await?;
    state.catalog_cache().invalidate_all();
    Ok(Json(translation))
}

pub async fn add_variant(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(input): Json<VariantInput>,
) -> Result<(StatusCode, Json<Variant>)> {
    if input.name.trim().is_empty() {
        return Err(AppError::BadRequest("name is required".to_string()));
    }
    if input.price.is_sign_negative() {
        return Err(AppError::BadRequest("price must not be negative".to_string()));
    }

    let variant = ProductRepository::new(state.pool())
        .add_variant(ProductId::new(id), &input)
        .await?;
    state.catalog_cache().invalidate_all();
    Ok((StatusCode::CREATED, Json(variant)))
}

pub async fn remove_variant(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path((id, variant_id)): Path<(i32, i32)>,
) -> Result<StatusCode> {
    ProductRepository::new(state.pool())
        .remove_variant(ProductId::new(id), VariantId::new(variant_id))
        .await?;
    state.catalog_cache().invalidate_all();
    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_image(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(input): Json<ImageInput>,
) -> Result<(StatusCode, Json<ProductImage>)> {
    if url::Url::parse(input.url.trim()).is_err() {
        return Err(AppError::BadRequest("image url must be absolute".to_string()));
    }

    let image = ProductRepository::new(state.pool())
        .add_image(ProductId::new(id), &input)
        .await?;
    state.catalog_cache().invalidate_all();
    Ok((StatusCode::CREATED, Json(image)))
}

pub async fn remove_image(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path((id, image_id)): Path<(i32, i32)>,
) -> Result<StatusCode> {
    ProductRepository::new(state.pool())
        .remove_image(ProductId::new(id), ImageId::new(image_id))
        .await?;
    state.catalog_cache().invalidate_all();
    Ok(StatusCode::NO_CONTENT)
}

pub async fn set_tags(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(body): Json<TagIds>,
) -> Result<Json<Vec<Tag>>> {
    let id = ProductId::new(id);
    let repo = ProductRepository::new(state.pool());
    repo.set_tags(id, &body.tag_ids).await?;
    state.catalog_cache().invalidate_all();
    Ok(Json(repo.tags(id).await?))
}
