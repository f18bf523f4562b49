//! Stripe Checkout integration.
//!
//! - [`StripeClient`] creates hosted Checkout Sessions and verifies webhooks
//! - [`types`] holds the form builder and the webhook payload shapes

mod client;
mod error;
pub mod types;

pub use client::{SIGNATURE_TOLERANCE_SECS, StripeClient, verify_signature};
pub(crate) use client::constant_time_compare;
pub use error::StripeError;
pub use types::{CheckoutSessionObject, CheckoutSessionParams, CreatedSession, Event, LineItem};

/// Webhook event types the storefront acts on.
pub mod events {
    pub const CHECKOUT_COMPLETED: &str = "checkout.session.completed";
    pub const CHECKOUT_ASYNC_PAYMENT_SUCCEEDED: &str = "checkout.session.async_payment_succeeded";
    pub const CHECKOUT_EXPIRED: &str = "checkout.session.expired";
}
