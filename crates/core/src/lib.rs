//! Printshop Core - Shared types library.
//!
//! This crate provides common types used across all Printshop components:
//! - `storefront` - Public JSON API, admin API, webhooks and cron endpoints
//! - `cli` - Command-line tools for migrations, catalog sync and diagnostics
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, emails, slugs,
//!   locales and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
