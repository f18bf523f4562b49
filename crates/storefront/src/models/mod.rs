//! Domain models for the storefront.
//!
//! Row types derive `sqlx::FromRow` and are loaded with runtime-checked
//! queries in `crate::db`. Request payloads that need validation carry their
//! own `validate` methods so handlers stay thin.

pub mod badge;
pub mod cart;
pub mod catalog;
pub mod discount;
pub mod order;
pub mod review;
pub mod session;
pub mod user;

pub use session::{CurrentUser, keys};
pub use user::User;
