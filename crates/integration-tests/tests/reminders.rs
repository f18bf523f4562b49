//! Reminder batch selection against a real database.
//!
//! These tests only need `STOREFRONT_DATABASE_URL` pointing at a migrated
//! database; the server does not have to run.

use chrono::{TimeDelta, Utc};
use printshop_core::OrderId;
use printshop_integration_tests::{database, unique_email};
use printshop_storefront::db::{CheckoutSessionRepository, OrderRepository};
use printshop_storefront::models::cart::{CartTotals, PricedCart};
use printshop_storefront::services::reminders::{MAX_SEND_ATTEMPTS, abandoned_window};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

const LIMIT: i64 = 100_000;

fn empty_cart() -> PricedCart {
    PricedCart {
        lines: Vec::new(),
        discount_code: None,
        discount_error: None,
        totals: CartTotals {
            subtotal: Decimal::ZERO,
            discount_total: Decimal::ZERO,
            shipping_total: Decimal::ZERO,
            total: Decimal::ZERO,
        },
        currency: "USD".to_string(),
    }
}

/// An open session created two hours ago.
async fn stale_session(pool: &PgPool) -> String {
    let session_id = format!("cs_test_{}", Uuid::new_v4().simple());
    CheckoutSessionRepository::new(pool)
        .create(&session_id, None, Some(&unique_email()), &empty_cart())
        .await
        .unwrap();
    sqlx::query(
        "UPDATE storefront.checkout_sessions SET created_at = NOW() - INTERVAL '2 hours' WHERE stripe_session_id = $1",
    )
    .bind(&session_id)
    .execute(pool)
    .await
    .unwrap();
    session_id
}

async fn is_abandoned_candidate(pool: &PgPool, session_id: &str) -> bool {
    let (older_than, newer_than) = abandoned_window(Utc::now(), 60);
    CheckoutSessionRepository::new(pool)
        .abandoned(older_than, newer_than, MAX_SEND_ATTEMPTS, LIMIT)
        .await
        .unwrap()
        .iter()
        .any(|s| s.stripe_session_id == session_id)
}

#[tokio::test]
#[ignore = "Requires database"]
async fn test_failing_reminder_leaves_the_batch() {
    let pool = database().await;
    let repo = CheckoutSessionRepository::new(&pool);
    let session_id = stale_session(&pool).await;

    for _ in 0..MAX_SEND_ATTEMPTS {
        assert!(is_abandoned_candidate(&pool, &session_id).await);
        repo.record_reminder_failure(&session_id).await.unwrap();
    }
    assert!(!is_abandoned_candidate(&pool, &session_id).await);
}

#[tokio::test]
#[ignore = "Requires database"]
async fn test_failing_review_request_leaves_the_batch() {
    let pool = database().await;
    let orders = OrderRepository::new(&pool);

    let address = serde_json::json!({
        "line1": "1 Main St", "line2": null, "city": "Austin", "state": "TX",
        "postal_code": "78701", "country": "US", "phone": null,
    });
    let id: i32 = sqlx::query_scalar(
        r"
        INSERT INTO storefront.orders
            (stripe_session_id, email, status, currency, subtotal, total, shipping_address)
        VALUES ($1, $2, 'delivered', 'USD', 10.00, 10.00, $3)
        RETURNING id
        ",
    )
    .bind(format!("cs_test_{}", Uuid::new_v4().simple()))
    .bind(unique_email())
    .bind(&address)
    .fetch_one(&pool)
    .await
    .unwrap();
    let id = OrderId::new(id);

    let shipped_before = Utc::now() - TimeDelta::days(14);
    for attempt in 0..=MAX_SEND_ATTEMPTS {
        let picked = orders
            .review_request_candidates(shipped_before, MAX_SEND_ATTEMPTS, LIMIT)
            .await
            .unwrap()
            .iter()
            .any(|c| c.id == id);
        assert_eq!(picked, attempt < MAX_SEND_ATTEMPTS, "after {attempt} failures");
        orders.record_review_request_failure(id).await.unwrap();
    }
}
