//! Integration tests for the admin JSON API.
//!
//! These tests require:
//! - A running `PostgreSQL` database with migrations applied (`ps-cli migrate`)
//! - The storefront server running against the same database
//! - `STOREFRONT_DATABASE_URL` set so test users can be promoted
//!
//! Run with: `cargo test -p printshop-integration-tests -- --ignored`

use printshop_integration_tests::{admin_client, client, json_body, register, url};
use reqwest::StatusCode;
use serde_json::json;
use uuid::Uuid;

// =============================================================================
// Access control
// =============================================================================

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_admin_requires_admin_role() {
    let anonymous = client()
        .get(url("/admin/api/dashboard"))
        .send()
        .await
        .unwrap();
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

    let customer = client();
    register(&customer).await;
    let resp = customer
        .get(url("/admin/api/dashboard"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_admin_dashboard() {
    let admin = admin_client().await;
    let resp = admin.get(url("/admin/api/dashboard")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

// =============================================================================
// Catalog management
// =============================================================================

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_product_lifecycle() {
    let admin = admin_client().await;
    let marker = Uuid::new_v4().simple().to_string();

    let category = admin
        .post(url("/admin/api/categories"))
        .json(&json!({ "name": format!("Prints {marker}") }))
        .send()
        .await
        .unwrap();
    assert_eq!(category.status(), StatusCode::CREATED);
    let category = json_body(category).await;

    let product = admin
        .post(url("/admin/api/products"))
        .json(&json!({
            "name": format!("Poster {marker}"),
            "description": "A poster",
            "category_id": category["id"],
            "base_price": "24.00",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(product.status(), StatusCode::CREATED);
    let product = json_body(product).await;
    let product_id = product["id"].as_i64().unwrap();
    let slug = product["slug"].as_str().unwrap().to_string();
    assert_eq!(product["is_published"], false);

    // Drafts stay off the storefront.
    let hidden = client()
        .get(url(&format!("/api/products/{slug}")))
        .send()
        .await
        .unwrap();
    assert_eq!(hidden.status(), StatusCode::NOT_FOUND);

    let variant = admin
        .post(url(&format!("/admin/api/products/{product_id}/variants")))
        .json(&json!({ "name": "A3", "size": "A3", "price": "24.00" }))
        .send()
        .await
        .unwrap();
    assert_eq!(variant.status(), StatusCode::CREATED);

    let publish = admin
        .post(url(&format!("/admin/api/products/{product_id}/publish")))
        .send()
        .await
        .unwrap();
    assert_eq!(publish.status(), StatusCode::NO_CONTENT);

    let detail = json_body(
        client()
            .get(url(&format!("/api/products/{slug}")))
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(detail["name"], format!("Poster {marker}"));
    assert_eq!(detail["variants"].as_array().unwrap().len(), 1);
    assert_eq!(detail["category"]["id"], category["id"]);

    let listing = json_body(
        client()
            .get(url(&format!("/api/products?q={marker}")))
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(listing["items"][0]["slug"], slug);

    let deleted = admin
        .delete(url(&format!("/admin/api/products/{product_id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_product_requires_name_and_valid_image_url() {
    let admin = admin_client().await;

    let nameless = admin
        .post(url("/admin/api/products"))
        .json(&json!({ "name": "  ", "base_price": "10.00" }))
        .send()
        .await
        .unwrap();
    assert_eq!(nameless.status(), StatusCode::BAD_REQUEST);

    let product = json_body(
        admin
            .post(url("/admin/api/products"))
            .json(&json!({
                "name": format!("Mug {}", Uuid::new_v4().simple()),
                "base_price": "12.00",
            }))
            .send()
            .await
            .unwrap(),
    )
    .await;
    let product_id = product["id"].as_i64().unwrap();

    let relative = admin
        .post(url(&format!("/admin/api/products/{product_id}/images")))
        .json(&json!({ "url": "/images/mug.png" }))
        .send()
        .await
        .unwrap();
    assert_eq!(relative.status(), StatusCode::BAD_REQUEST);
}

// =============================================================================
// Discounts
// =============================================================================

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_discount_create_and_deactivate() {
    let admin = admin_client().await;
    let marker: String = Uuid::new_v4().simple().to_string().chars().take(10).collect();
    let code = format!("it-{marker}");

    let invalid = admin
        .post(url("/admin/api/discounts"))
        .json(&json!({ "code": code, "kind": "percentage", "value": "150" }))
        .send()
        .await
        .unwrap();
    assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);

    let created = admin
        .post(url("/admin/api/discounts"))
        .json(&json!({ "code": code, "kind": "percentage", "value": "10" }))
        .send()
        .await
        .unwrap();
    assert_eq!(created.status(), StatusCode::CREATED);
    let discount = json_body(created).await;
    assert_eq!(discount["code"], code.to_uppercase());
    assert_eq!(discount["is_active"], true);

    let id = discount["id"].as_i64().unwrap();
    let deactivated = json_body(
        admin
            .delete(url(&format!("/admin/api/discounts/{id}")))
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(deactivated["is_active"], false);

    let rejected = client()
        .post(url("/api/cart/discount"))
        .json(&json!({ "code": code }))
        .send()
        .await
        .unwrap();
    assert_eq!(rejected.status(), StatusCode::BAD_REQUEST);
}

// =============================================================================
// Orders and users
// =============================================================================

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_missing_order_is_404() {
    let admin = admin_client().await;
    let resp = admin
        .get(url("/admin/api/orders/2000000000"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_admin_cannot_demote_self() {
    let admin = admin_client().await;
    let me = json_body(admin.get(url("/api/auth/me")).send().await.unwrap()).await;
    let id = me["user"]["id"].as_i64().unwrap();

    let resp = admin
        .put(url(&format!("/admin/api/users/{id}/role")))
        .json(&json!({ "role": "customer" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_promote_customer() {
    let admin = admin_client().await;
    let customer = client();
    let email = register(&customer).await;

    let users = json_body(
        admin
            .get(url(&format!("/admin/api/users?q={email}")))
            .send()
            .await
            .unwrap(),
    )
    .await;
    let id = users[0]["id"].as_i64().unwrap();

    let promoted = json_body(
        admin
            .put(url(&format!("/admin/api/users/{id}/role")))
            .json(&json!({ "role": "admin" }))
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(promoted["role"], "admin");

    let resp = customer
        .get(url("/admin/api/dashboard"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}
