//! Integration tests for the public storefront API.
//!
//! These tests require:
//! - A running `PostgreSQL` database with migrations applied (`ps-cli migrate`)
//! - The storefront server running (`cargo run -p printshop-storefront`)
//!
//! Run with: `cargo test -p printshop-integration-tests -- --ignored`

use printshop_integration_tests::{client, json_body, register, unique_email, url};
use reqwest::StatusCode;
use serde_json::json;

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_health_endpoints() {
    let client = client();

    let live = client.get(url("/health")).send().await.unwrap();
    assert_eq!(live.status(), StatusCode::OK);
    assert_eq!(live.text().await.unwrap(), "ok");

    let ready = client.get(url("/health/ready")).send().await.unwrap();
    assert_eq!(ready.status(), StatusCode::OK);
}

// =============================================================================
// Accounts
// =============================================================================

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_register_login_logout() {
    let client = client();
    let email = register(&client).await;

    let me = json_body(client.get(url("/api/auth/me")).send().await.unwrap()).await;
    assert_eq!(me["user"]["email"], email);

    let logout = client.post(url("/api/auth/logout")).send().await.unwrap();
    assert_eq!(logout.status(), StatusCode::NO_CONTENT);
    let me = json_body(client.get(url("/api/auth/me")).send().await.unwrap()).await;
    assert!(me["user"].is_null());

    let login = client
        .post(url("/api/auth/login"))
        .json(&json!({ "email": email, "password": "correct horse battery" }))
        .send()
        .await
        .unwrap();
    assert_eq!(login.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_duplicate_registration_conflicts() {
    let client = client();
    let email = register(&client).await;

    let again = client
        .post(url("/api/auth/register"))
        .json(&json!({ "email": email, "password": "another long password" }))
        .send()
        .await
        .unwrap();
    assert_eq!(again.status(), StatusCode::CONFLICT);
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_short_password_rejected() {
    let resp = client()
        .post(url("/api/auth/register"))
        .json(&json!({ "email": unique_email(), "password": "short" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_wrong_password_rejected() {
    let client = client();
    let email = register(&client).await;

    let resp = reqwest::Client::new()
        .post(url("/api/auth/login"))
        .json(&json!({ "email": email, "password": "not the password" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_account_pages_require_login() {
    let client = client();
    for path in [
        "/api/account/profile",
        "/api/account/orders",
        "/api/account/badges",
        "/api/wishlist",
    ] {
        let resp = client.get(url(path)).send().await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{path}");
    }
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_referral_code_and_profile() {
    let client = client();
    register(&client).await;

    let referrals = json_body(
        client
            .get(url("/api/account/referrals"))
            .send()
            .await
            .unwrap(),
    )
    .await;
    let code = referrals["code"].as_str().unwrap();
    assert_eq!(code.len(), 8);
    assert!(referrals["share_url"].as_str().unwrap().contains(code));

    let updated = client
        .patch(url("/api/account/profile"))
        .json(&json!({ "display_name": "Renamed", "marketing_opt_in": true }))
        .send()
        .await
        .unwrap();
    assert_eq!(updated.status(), StatusCode::OK);
    let profile = json_body(updated).await;
    assert_eq!(profile["display_name"], "Renamed");
    assert_eq!(profile["marketing_opt_in"], true);
}

// =============================================================================
// Catalog and cart
// =============================================================================

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_product_listing_shape() {
    let page = json_body(
        client()
            .get(url("/api/products?per_page=1000&page=0"))
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(page["page"], 1);
    assert_eq!(page["per_page"], 100);
    assert!(page["items"].is_array());
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_missing_product_is_404() {
    let resp = client()
        .get(url("/api/products/no-such-product-anywhere"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_locale_prefix_routes_to_api() {
    let resp = client().get(url("/es/api/categories")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_empty_cart_and_checkout() {
    let client = client();

    let cart = json_body(client.get(url("/api/cart")).send().await.unwrap()).await;
    assert_eq!(cart["lines"], json!([]));

    let unknown = client
        .post(url("/api/cart/items"))
        .json(&json!({ "variant_id": 2_000_000_000, "quantity": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);

    let checkout = client.post(url("/api/checkout")).send().await.unwrap();
    assert_eq!(checkout.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_unknown_discount_rejected() {
    let resp = client()
        .post(url("/api/cart/discount"))
        .json(&json!({ "code": "NOPE-NOT-REAL" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// =============================================================================
// Push
// =============================================================================

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_push_subscription_roundtrip() {
    let client = client();
    let player_id = uuid::Uuid::new_v4().to_string();

    let created = client
        .post(url("/api/push/subscriptions"))
        .json(&json!({ "player_id": player_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(created.status(), StatusCode::CREATED);

    let deleted = client
        .delete(url(&format!("/api/push/subscriptions/{player_id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);
}
