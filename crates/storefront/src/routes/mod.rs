//! HTTP route handlers for the storefront API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                          - Liveness
//! GET  /health/ready                    - Readiness (database)
//!
//! # Catalog
//! GET  /api/products                    - Product listing
//! GET  /api/products/{slug}             - Product detail
//! GET  /api/products/{slug}/reviews     - Approved reviews
//! POST /api/products/{slug}/reviews     - Submit a review (auth)
//! GET  /api/categories                  - Categories
//! GET  /api/tags                        - Tags
//!
//! # Cart (session)
//! GET    /api/cart                      - Priced cart
//! DELETE /api/cart                      - Empty the cart
//! POST   /api/cart/items                - Add a variant
//! PATCH  /api/cart/items/{variant_id}   - Set quantity (0 removes)
//! DELETE /api/cart/items/{variant_id}   - Remove a line
//! POST   /api/cart/discount             - Apply a discount code
//! DELETE /api/cart/discount             - Clear the discount code
//! POST   /api/checkout                  - Create a Stripe Checkout Session
//!
//! # Auth
//! POST /api/auth/register, /api/auth/login, /api/auth/logout
//! GET  /api/auth/me
//!
//! # Account (auth)
//! GET|PATCH /api/account/profile
//! GET  /api/account/orders, /api/account/orders/{id}
//! GET  /api/account/badges, /api/account/referrals
//! GET|POST /api/wishlist, DELETE /api/wishlist/{product_id}
//!
//! # Push
//! POST   /api/push/subscriptions
//! DELETE /api/push/subscriptions/{player_id}
//!
//! # Providers and scheduler
//! POST /api/webhooks/stripe, /api/webhooks/printful
//! POST /api/cron/abandoned-checkouts, /api/cron/review-requests,
//!      /api/cron/expire-checkouts
//!
//! # Admin
//! /admin/api/...                        - see [`admin`]
//! ```
//!
//! Any of these may be prefixed with a locale segment (`/es/api/products`);
//! [`locale_middleware`](crate::middleware::locale_middleware) strips it
//! before routing.

pub mod account;
pub mod admin;
pub mod auth;
pub mod cart;
pub mod checkout;
pub mod cron;
pub mod health;
pub mod products;
pub mod push;
pub mod webhooks;
pub mod wishlist;

use axum::{
    Router,
    routing::{delete, get, patch, post},
};
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::middleware::{
    api_rate_limiter, auth_rate_limiter, create_session_layer, request_id_middleware,
    security_headers_middleware, webhook_rate_limiter,
};
use crate::state::AppState;

/// Login, registration and checkout share the strict tier.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/checkout", post(checkout::create))
        .layer(auth_rate_limiter())
}

/// Catalog, cart, account, wishlist and push routes.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/me", get(auth::me))
        // Catalog
        .route("/products", get(products::index))
        .route("/products/{slug}", get(products::show))
        .route(
            "/products/{slug}/reviews",
            get(products::reviews).post(products::create_review),
        )
        .route("/categories", get(products::categories))
        .route("/tags", get(products::tags))
        // Cart
        .route("/cart", get(cart::show).delete(cart::clear))
        .route("/cart/items", post(cart::add))
        .route(
            "/cart/items/{variant_id}",
            patch(cart::update).delete(cart::remove),
        )
        .route(
            "/cart/discount",
            post(cart::apply_discount).delete(cart::remove_discount),
        )
        // Account
        .route(
            "/account/profile",
            get(account::profile).patch(account::update_profile),
        )
        .route("/account/orders", get(account::orders))
        .route("/account/orders/{id}", get(account::order))
        .route("/account/badges", get(account::badges))
        .route("/account/referrals", get(account::referrals))
        // Wishlist
        .route("/wishlist", get(wishlist::list).post(wishlist::add))
        .route("/wishlist/{product_id}", delete(wishlist::remove))
        // Push
        .route("/push/subscriptions", post(push::subscribe))
        .route(
            "/push/subscriptions/{player_id}",
            delete(push::unsubscribe),
        )
        .layer(api_rate_limiter())
}

/// Provider webhooks and scheduler callbacks.
pub fn callback_routes() -> Router<AppState> {
    Router::new()
        .route("/webhooks/stripe", post(webhooks::stripe))
        .route("/webhooks/printful", post(webhooks::printful))
        .route(
            "/cron/abandoned-checkouts",
            post(cron::abandoned_checkouts),
        )
        .route("/cron/review-requests", post(cron::review_requests))
        .route("/cron/expire-checkouts", post(cron::expire_checkouts))
        .layer(webhook_rate_limiter())
}

/// The full application router with state, sessions, security headers,
/// request ids and request tracing applied.
///
/// Locale prefixes are handled outside the router; see `main`.
pub fn app(state: AppState) -> Router {
    let session_layer = create_session_layer(state.pool(), state.config());

    let api = Router::new()
        .merge(auth_routes())
        .merge(api_routes())
        .merge(callback_routes());

    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/api", api)
        .nest("/admin/api", admin::routes().layer(api_rate_limiter()))
        .layer(session_layer)
        .layer(axum::middleware::from_fn(security_headers_middleware))
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use http_body_util::BodyExt;
    use sqlx::postgres::PgPoolOptions;
    use tower::{Layer, ServiceExt};

    use super::*;
    use crate::config::test_config;
    use crate::middleware::locale_middleware;

    fn test_app() -> Router {
        let config = test_config();
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/printshop_test")
            .unwrap();
        app(AppState::new(config, pool).unwrap())
    }

    fn request(method: &str, uri: &str) -> axum::http::request::Builder {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("x-forwarded-for", "203.0.113.7")
    }

    async fn body_string(response: axum::response::Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = test_app()
            .oneshot(request("GET", "/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::X_CONTENT_TYPE_OPTIONS).unwrap(),
            "nosniff"
        );
        assert!(response.headers().contains_key("x-request-id"));
        assert_eq!(body_string(response).await, "ok");
    }

    #[tokio::test]
    async fn test_forwarded_request_id_is_echoed() {
        let response = test_app()
            .oneshot(
                request("GET", "/health")
                    .header("x-request-id", "edge-4f2a9c")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.headers().get("x-request-id").unwrap(), "edge-4f2a9c");

        let response = test_app()
            .oneshot(
                request("GET", "/health")
                    .header("x-request-id", "not an id")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let replaced = response.headers().get("x-request-id").unwrap();
        assert_ne!(replaced, "not an id");
        assert_eq!(replaced.len(), 36);
    }

    #[tokio::test]
    async fn test_me_without_session_is_null() {
        let response = test_app()
            .oneshot(request("GET", "/api/auth/me").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, r#"{"user":null}"#);
    }

    #[tokio::test]
    async fn test_account_requires_login() {
        let response = test_app()
            .oneshot(
                request("GET", "/api/account/profile")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_admin_requires_login() {
        let response = test_app()
            .oneshot(
                request("GET", "/admin/api/dashboard")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_cron_rejects_wrong_token() {
        let app = test_app();

        let missing = app
            .clone()
            .oneshot(
                request("POST", "/api/cron/expire-checkouts")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

        let wrong = app
            .oneshot(
                request("POST", "/api/cron/expire-checkouts")
                    .header(header::AUTHORIZATION, "Bearer nope")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_stripe_webhook_rejects_bad_signature() {
        let app = test_app();

        let unsigned = app
            .clone()
            .oneshot(
                request("POST", "/api/webhooks/stripe")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(unsigned.status(), StatusCode::BAD_REQUEST);

        let forged = app
            .oneshot(
                request("POST", "/api/webhooks/stripe")
                    .header("stripe-signature", "t=1,v1=deadbeef")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(forged.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_printful_webhook_rejects_other_store() {
        let payload = r#"{"type":"package_shipped","store":999,"data":{}}"#;
        let response = test_app()
            .oneshot(
                request("POST", "/api/webhooks/printful")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(payload))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_locale_prefix_is_stripped() {
        let service = axum::middleware::from_fn(locale_middleware).layer(test_app());
        let response = service
            .oneshot(request("GET", "/es/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let response = test_app()
            .oneshot(request("GET", "/api/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
