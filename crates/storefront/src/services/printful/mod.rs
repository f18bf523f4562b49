//! Printful print-on-demand integration.
//!
//! - [`PrintfulClient`] lists store products and creates orders
//! - [`types`] holds API payloads, webhook bodies and the status mapping

mod client;
mod error;
pub mod types;

pub use client::{PAGE_SIZE, PrintfulClient};
pub use error::PrintfulError;
pub use types::{
    NewPrintfulOrder, PrintfulOrder, SyncProductDetail, SyncProductSummary, SyncVariant,
    WebhookEvent, events, order_status_from_printful,
};
