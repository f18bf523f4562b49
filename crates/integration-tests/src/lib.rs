//! Integration test helpers for Printshop.
//!
//! # Running Tests
//!
//! ```bash
//! # Start the database and apply migrations
//! task db:start
//! cargo run -p printshop-cli -- migrate
//!
//! # Start the server, then run the ignored tests against it
//! cargo run -p printshop-storefront &
//! cargo test -p printshop-integration-tests -- --ignored
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_BASE_URL` - Server under test (default: `http://localhost:3000`)
//! - `STOREFRONT_DATABASE_URL` - Same database the server uses, for promoting
//!   test users to admin
//! - `STRIPE_WEBHOOK_SECRET`, `CRON_SECRET` - The server's secrets, for signed
//!   webhook and cron calls

use std::time::{SystemTime, UNIX_EPOCH};

use hmac::{Hmac, Mac};
use printshop_core::{Email, UserRole};
use printshop_storefront::db::UserRepository;
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use sha2::Sha256;
use sqlx::PgPool;
use uuid::Uuid;

/// Base URL of the storefront under test.
#[must_use]
pub fn base_url() -> String {
    std::env::var("STOREFRONT_BASE_URL")
        .unwrap_or_else(|_| "http://localhost:3000".to_string())
        .trim_end_matches('/')
        .to_string()
}

/// Absolute URL for a path on the server under test.
#[must_use]
pub fn url(path: &str) -> String {
    format!("{}{path}", base_url())
}

/// HTTP client that keeps the session cookie.
///
/// # Panics
///
/// Panics if the client cannot be built.
#[must_use]
pub fn client() -> Client {
    Client::builder()
        .cookie_store(true)
        .build()
        .expect("Failed to create HTTP client")
}

/// A fresh email address so tests never collide.
#[must_use]
pub fn unique_email() -> String {
    format!("test-{}@example.com", Uuid::new_v4().simple())
}

/// Register (and thereby log in) a new customer, returning their email.
///
/// # Panics
///
/// Panics if registration does not return 201.
pub async fn register(client: &Client) -> String {
    let email = unique_email();
    let resp = client
        .post(url("/api/auth/register"))
        .json(&json!({
            "email": email,
            "password": "correct horse battery",
            "display_name": "Test Customer",
        }))
        .send()
        .await
        .expect("Failed to register");
    assert_eq!(resp.status(), StatusCode::CREATED);
    email
}

/// Pool on the server's database.
///
/// # Panics
///
/// Panics if no database URL is configured or the connection fails.
pub async fn database() -> PgPool {
    let url = std::env::var("STOREFRONT_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .expect("STOREFRONT_DATABASE_URL not set");
    PgPool::connect(&url).await.expect("Failed to connect to database")
}

/// Register a user and give them the admin role.
///
/// # Panics
///
/// Panics if registration or the role change fails.
pub async fn admin_client() -> Client {
    let client = client();
    let email = register(&client).await;
    let pool = database().await;
    UserRepository::new(&pool)
        .set_role_by_email(&Email::parse(&email).expect("valid email"), UserRole::Admin)
        .await
        .expect("Failed to promote test user");
    client
}

/// `Stripe-Signature` header for `payload`, signed now with `secret`.
///
/// # Panics
///
/// Panics if the system clock is before the Unix epoch.
#[must_use]
pub fn stripe_signature(secret: &str, payload: &str) -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock before epoch")
        .as_secs();
    stripe_signature_at(secret, payload, i64::try_from(now).unwrap_or(i64::MAX))
}

/// `Stripe-Signature` header for `payload` at a fixed timestamp.
///
/// # Panics
///
/// Panics if HMAC rejects the key, which it never does for SHA-256.
#[must_use]
pub fn stripe_signature_at(secret: &str, payload: &str, timestamp: i64) -> String {
    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(format!("{timestamp}.{payload}").as_bytes());
    format!("t={timestamp},v1={}", hex::encode(mac.finalize().into_bytes()))
}

/// Read a JSON body, panicking with the raw text if it isn't JSON.
///
/// # Panics
///
/// Panics if the body cannot be read or parsed.
pub async fn json_body(resp: reqwest::Response) -> Value {
    let text = resp.text().await.expect("Failed to read body");
    serde_json::from_str(&text).unwrap_or_else(|e| panic!("not JSON ({e}): {text}"))
}
