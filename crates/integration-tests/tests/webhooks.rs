//! Webhook and scheduler callback tests.
//!
//! The signature tests run without a server. The ignored tests need the
//! storefront running and the server's `STRIPE_WEBHOOK_SECRET` and
//! `CRON_SECRET` in the environment; the checkout tests also need
//! `STOREFRONT_DATABASE_URL`.

use printshop_core::{ProductId, VariantId};
use printshop_integration_tests::{
    admin_client, client, database, json_body, stripe_signature, stripe_signature_at,
    unique_email, url,
};
use printshop_storefront::db::CheckoutSessionRepository;
use printshop_storefront::models::cart::{CartTotals, PricedCart, PricedLine};
use printshop_storefront::services::stripe::{SIGNATURE_TOLERANCE_SECS, verify_signature};
use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

const SECRET: &str = "whsec_integration";
const NOW: i64 = 1_750_000_000;

// =============================================================================
// Stripe signatures
// =============================================================================

#[test]
fn test_signature_accepts_matching_header() {
    let payload = r#"{"id":"evt_1","type":"ping"}"#;
    let header = stripe_signature_at(SECRET, payload, NOW);
    assert!(verify_signature(SECRET.as_bytes(), payload, &header, NOW).is_ok());
}

#[test]
fn test_signature_rejects_tampered_payload() {
    let header = stripe_signature_at(SECRET, r#"{"amount":100}"#, NOW);
    assert!(verify_signature(SECRET.as_bytes(), r#"{"amount":1}"#, &header, NOW).is_err());
}

#[test]
fn test_signature_rejects_wrong_secret() {
    let payload = "{}";
    let header = stripe_signature_at("whsec_other", payload, NOW);
    assert!(verify_signature(SECRET.as_bytes(), payload, &header, NOW).is_err());
}

#[test]
fn test_signature_rejects_stale_timestamp() {
    let payload = "{}";
    let header = stripe_signature_at(SECRET, payload, NOW - SIGNATURE_TOLERANCE_SECS - 1);
    assert!(verify_signature(SECRET.as_bytes(), payload, &header, NOW).is_err());

    let edge = stripe_signature_at(SECRET, payload, NOW - SIGNATURE_TOLERANCE_SECS);
    assert!(verify_signature(SECRET.as_bytes(), payload, &edge, NOW).is_ok());
}

#[test]
fn test_signature_accepts_any_v1_entry() {
    let payload = "{}";
    let valid = stripe_signature_at(SECRET, payload, NOW);
    let (_, good) = valid.split_once(",v1=").unwrap();
    let header = format!("t={NOW},v1={},v1={good}", "0".repeat(64));
    assert!(verify_signature(SECRET.as_bytes(), payload, &header, NOW).is_ok());
}

// =============================================================================
// Live endpoints
// =============================================================================

#[tokio::test]
#[ignore = "Requires running storefront server and STRIPE_WEBHOOK_SECRET"]
async fn test_signed_unknown_event_is_acknowledged() {
    let secret = std::env::var("STRIPE_WEBHOOK_SECRET").expect("STRIPE_WEBHOOK_SECRET not set");
    let payload = json!({
        "id": "evt_integration",
        "type": "customer.created",
        "data": { "object": {} },
    })
    .to_string();

    let resp = client()
        .post(url("/api/webhooks/stripe"))
        .header("stripe-signature", stripe_signature(&secret, &payload))
        .header("content-type", "application/json")
        .body(payload)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await, json!({ "received": true }));
}

#[tokio::test]
#[ignore = "Requires running storefront server and CRON_SECRET"]
async fn test_cron_expire_checkouts() {
    let secret = std::env::var("CRON_SECRET").expect("CRON_SECRET not set");

    let resp = client()
        .post(url("/api/cron/expire-checkouts"))
        .bearer_auth(&secret)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(json_body(resp).await["expired"].is_u64());
}

#[tokio::test]
#[ignore = "Requires running storefront server and CRON_SECRET"]
async fn test_cron_jobs_report() {
    let secret = std::env::var("CRON_SECRET").expect("CRON_SECRET not set");

    for path in ["/api/cron/abandoned-checkouts", "/api/cron/review-requests"] {
        let resp = client()
            .post(url(path))
            .bearer_auth(&secret)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK, "{path}");
        assert!(json_body(resp).await.is_object(), "{path}");
    }
}

// =============================================================================
// Checkout reconciliation
// =============================================================================

/// A published product with one variant, created through the admin API.
async fn stocked_variant(admin: &reqwest::Client) -> (i32, i32) {
    let product = json_body(
        admin
            .post(url("/admin/api/products"))
            .json(&json!({
                "name": format!("Tote {}", Uuid::new_v4().simple()),
                "base_price": "12.00",
            }))
            .send()
            .await
            .unwrap(),
    )
    .await;
    let product_id = product["id"].as_i64().unwrap();

    let variant = json_body(
        admin
            .post(url(&format!("/admin/api/products/{product_id}/variants")))
            .json(&json!({ "name": "Natural", "price": "12.00" }))
            .send()
            .await
            .unwrap(),
    )
    .await;

    let published = admin
        .post(url(&format!("/admin/api/products/{product_id}/publish")))
        .send()
        .await
        .unwrap();
    assert_eq!(published.status(), StatusCode::NO_CONTENT);

    (
        i32::try_from(product_id).unwrap(),
        i32::try_from(variant["id"].as_i64().unwrap()).unwrap(),
    )
}

/// Two totes at 12.00 with `code` taking 10% off.
fn discounted_cart(product_id: i32, variant_id: i32, code: &str) -> PricedCart {
    PricedCart {
        lines: vec![PricedLine {
            variant_id: VariantId::new(variant_id),
            product_id: ProductId::new(product_id),
            product_slug: "tote".to_string(),
            product_name: "Tote".to_string(),
            variant_name: "Natural".to_string(),
            image_url: None,
            quantity: 2,
            unit_price: Decimal::new(1200, 2),
            line_total: Decimal::new(2400, 2),
            printful_variant_id: None,
        }],
        discount_code: Some(code.to_string()),
        discount_error: None,
        totals: CartTotals {
            subtotal: Decimal::new(2400, 2),
            discount_total: Decimal::new(240, 2),
            shipping_total: Decimal::ZERO,
            total: Decimal::new(2160, 2),
        },
        currency: "USD".to_string(),
    }
}

fn completed_event(session_id: &str, email: &str) -> String {
    json!({
        "id": format!("evt_{}", Uuid::new_v4().simple()),
        "type": "checkout.session.completed",
        "data": { "object": {
            "id": session_id,
            "payment_status": "paid",
            "payment_intent": "pi_integration",
            "amount_total": 2160,
            "customer_details": { "email": email, "name": "Ana Lima" },
            "collected_information": { "shipping_details": {
                "name": "Ana Lima",
                "address": {
                    "line1": "1 Main St",
                    "city": "Austin",
                    "state": "TX",
                    "postal_code": "78701",
                    "country": "US",
                },
            }},
            "metadata": {},
        }},
    })
    .to_string()
}

async fn deliver(secret: &str, payload: &str) -> StatusCode {
    client()
        .post(url("/api/webhooks/stripe"))
        .header("stripe-signature", stripe_signature(secret, payload))
        .header("content-type", "application/json")
        .body(payload.to_string())
        .send()
        .await
        .unwrap()
        .status()
}

async fn order_count(pool: &PgPool, session_id: &str) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM storefront.orders WHERE stripe_session_id = $1")
        .bind(session_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

#[tokio::test]
#[ignore = "Requires running storefront server, database and STRIPE_WEBHOOK_SECRET"]
async fn test_repeated_checkout_event_creates_one_order() {
    let secret = std::env::var("STRIPE_WEBHOOK_SECRET").expect("STRIPE_WEBHOOK_SECRET not set");
    let pool = database().await;
    let admin = admin_client().await;
    let (product_id, variant_id) = stocked_variant(&admin).await;

    let code: String = Uuid::new_v4().simple().to_string().chars().take(10).collect();
    let code = format!("ONCE-{}", code.to_uppercase());
    let created = admin
        .post(url("/admin/api/discounts"))
        .json(&json!({ "code": code, "kind": "percentage", "value": "10" }))
        .send()
        .await
        .unwrap();
    assert_eq!(created.status(), StatusCode::CREATED);

    let session_id = format!("cs_test_{}", Uuid::new_v4().simple());
    let email = unique_email();
    CheckoutSessionRepository::new(&pool)
        .create(
            &session_id,
            None,
            Some(&email),
            &discounted_cart(product_id, variant_id, &code),
        )
        .await
        .unwrap();

    let payload = completed_event(&session_id, &email);
    assert_eq!(deliver(&secret, &payload).await, StatusCode::OK);
    assert_eq!(deliver(&secret, &payload).await, StatusCode::OK);

    assert_eq!(order_count(&pool, &session_id).await, 1);
    let times_used: i32 =
        sqlx::query_scalar("SELECT times_used FROM storefront.discounts WHERE code = $1")
            .bind(&code)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(times_used, 1);

    let status: String =
        sqlx::query_scalar("SELECT status FROM storefront.checkout_sessions WHERE stripe_session_id = $1")
            .bind(&session_id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(status, "completed");
}

#[tokio::test]
#[ignore = "Requires running storefront server, database and STRIPE_WEBHOOK_SECRET"]
async fn test_redelivery_submits_stalled_order() {
    let secret = std::env::var("STRIPE_WEBHOOK_SECRET").expect("STRIPE_WEBHOOK_SECRET not set");
    let pool = database().await;
    let admin = admin_client().await;
    let (product_id, variant_id) = stocked_variant(&admin).await;

    let session_id = format!("cs_test_{}", Uuid::new_v4().simple());
    let email = unique_email();
    CheckoutSessionRepository::new(&pool)
        .create(
            &session_id,
            None,
            Some(&email),
            &discounted_cart(product_id, variant_id, "UNUSED"),
        )
        .await
        .unwrap();

    // An order saved by an earlier delivery that died before recording its
    // Printful submission. Without lines it can only end up failed.
    let address = json!({
        "line1": "1 Main St", "line2": null, "city": "Austin", "state": "TX",
        "postal_code": "78701", "country": "US", "phone": null,
    });
    sqlx::query(
        r"
        INSERT INTO storefront.orders
            (stripe_session_id, email, status, currency, subtotal, total,
             shipping_name, shipping_address, created_at)
        VALUES ($1, $2, 'paid', 'USD', 24.00, 24.00, 'Ana Lima', $3, NOW() - INTERVAL '10 minutes')
        ",
    )
    .bind(&session_id)
    .bind(&email)
    .bind(&address)
    .execute(&pool)
    .await
    .unwrap();

    let payload = completed_event(&session_id, &email);
    assert_eq!(deliver(&secret, &payload).await, StatusCode::OK);

    assert_eq!(order_count(&pool, &session_id).await, 1);
    let (status, printful_order_id, fulfillment_error): (String, Option<i64>, Option<String>) =
        sqlx::query_as(
            "SELECT status, printful_order_id, fulfillment_error
             FROM storefront.orders WHERE stripe_session_id = $1",
        )
        .bind(&session_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(status, "fulfillment_failed");
    assert!(printful_order_id.is_none());
    assert!(fulfillment_error.is_some());

    // Once recorded, further deliveries leave it alone.
    assert_eq!(deliver(&secret, &payload).await, StatusCode::OK);
    let after: String =
        sqlx::query_scalar("SELECT status FROM storefront.orders WHERE stripe_session_id = $1")
            .bind(&session_id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(after, "fulfillment_failed");
}
