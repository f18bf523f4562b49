//! Admin JSON API, mounted at `/admin/api`.
//!
//! Every handler takes [`RequireAdmin`](crate::middleware::RequireAdmin),
//! which re-reads the role from the database on each request.
//!
//! # Route Structure
//!
//! ```text
//! GET    /dashboard                          - Sales and fulfillment summary
//!
//! # Catalog
//! GET    /products                           - List (including unpublished)
//! POST   /products                           - Create
//! GET    /products/{id}                      - Detail with variants, images, tags
//! PUT    /products/{id}                      - Replace fields
//! DELETE /products/{id}                      - Delete
//! POST   /products/{id}/publish              - Publish
//! POST   /products/{id}/unpublish            - Unpublish
//! PUT    /products/{id}/translations/{locale} - Upsert translation
//! POST   /products/{id}/variants             - Add variant
//! DELETE /products/{id}/variants/{variant}   - Remove variant
//! POST   /products/{id}/images               - Add image
//! DELETE /products/{id}/images/{image}       - Remove image
//! PUT    /products/{id}/tags                 - Replace tags
//! POST   /categories, PUT|DELETE /categories/{id}
//! POST   /tags, PUT|DELETE /tags/{id}
//! POST   /catalog/sync                       - Run the Printful sync
//!
//! # Orders
//! GET    /orders                             - List (status filter, pagination)
//! GET    /orders/{id}                        - Detail with items
//! PUT    /orders/{id}/status                 - Validated status change
//! POST   /orders/{id}/resubmit               - Resubmit a failed fulfillment
//!
//! # Discounts, reviews, users
//! GET|POST /discounts, PUT|DELETE /discounts/{id}
//! GET    /reviews, PUT /reviews/{id}/status, DELETE /reviews/{id}
//! GET    /users, PUT /users/{id}/role
//! ```

mod catalog;
mod dashboard;
mod discounts;
mod orders;
mod products;
mod reviews;
mod taxonomy;
mod users;

use axum::{
    Router,
    routing::{delete, get, post, put},
};

use printshop_core::Slug;

use crate::error::{AppError, Result};
use crate::state::AppState;

const DEFAULT_PER_PAGE: u32 = 50;
const MAX_PER_PAGE: u32 = 200;

/// Clamped `(page, per_page)` for the admin listings.
fn page_params(page: Option<u32>, per_page: Option<u32>) -> (u32, u32) {
    (
        page.unwrap_or(1).max(1),
        per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE),
    )
}

/// An explicit slug must already be valid; otherwise derive one from the name.
fn resolve_slug(explicit: Option<&str>, name: &str) -> Result<Slug> {
    if name.trim().is_empty() {
        return Err(AppError::BadRequest("name is required".to_string()));
    }
    match explicit.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => Slug::parse(s).map_err(|e| AppError::BadRequest(e.to_string())),
        None => Ok(Slug::from_title(name)),
    }
}

/// Create the admin API router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard::show))
        // Products
        .route("/products", get(products::list).post(products::create))
        .route(
            "/products/{id}",
            get(products::show)
                .put(products::update)
                .delete(products::delete),
        )
        .route("/products/{id}/publish", post(products::publish))
        .route("/products/{id}/unpublish", post(products::unpublish))
        .route(
            "/products/{id}/translations/{locale}",
            put(products::upsert_translation),
        )
        .route("/products/{id}/variants", post(products::add_variant))
        .route(
            "/products/{id}/variants/{variant_id}",
            delete(products::remove_variant),
        )
        .route("/products/{id}/images", post(products::add_image))
        .route(
            "/products/{id}/images/{image_id}",
            delete(products::remove_image),
        )
        .route("/products/{id}/tags", put(products::set_tags))
        // Taxonomy
        .route("/categories", post(taxonomy::create_category))
        .route(
            "/categories/{id}",
            put(taxonomy::update_category).delete(taxonomy::delete_category),
        )
        .route("/tags", post(taxonomy::create_tag))
        .route(
            "/tags/{id}",
            put(taxonomy::update_tag).delete(taxonomy::delete_tag),
        )
        .route("/catalog/sync", post(catalog::sync))
        // Orders
        .route("/orders", get(orders::list))
        .route("/orders/{id}", get(orders::show))
        .route("/orders/{id}/status", put(orders::set_status))
        .route("/orders/{id}/resubmit", post(orders::resubmit))
        // Discounts
        .route("/discounts", get(discounts::list).post(discounts::create))
        .route(
            "/discounts/{id}",
            put(discounts::update).delete(discounts::deactivate),
        )
        // Reviews
        .route("/reviews", get(reviews::list))
        .route("/reviews/{id}", delete(reviews::delete))
        .route("/reviews/{id}/status", put(reviews::set_status))
        // Users
        .route("/users", get(users::list))
        .route("/users/{id}/role", put(users::set_role))
}
