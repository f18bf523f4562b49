//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `auth` - Password hashing, registration and login
//! - `badges` - Badge evaluation and awarding
//! - `catalog` - Catalog read cache and Printful catalog sync
//! - `checkout` - Cart pricing and Stripe checkout session parameters
//! - `email` - Transactional email over SMTP
//! - `fulfillment` - Paid checkout reconciliation and order lifecycle
//! - `printful` - Printful API client
//! - `push` - Push notifications
//! - `reminders` - Abandoned checkout and review request jobs
//! - `stripe` - Stripe API client and webhook verification

pub mod auth;
pub mod badges;
pub mod catalog;
pub mod checkout;
pub mod email;
pub mod fulfillment;
pub mod printful;
pub mod push;
pub mod reminders;
pub mod stripe;
