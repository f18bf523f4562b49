//! Orders and order items.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;

use printshop_core::{OrderId, OrderItemId, OrderStatus, ProductId, UserId, VariantId};

/// Shipping address as collected by Stripe Checkout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub state: Option<String>,
    pub postal_code: String,
    /// Two-letter ISO country code.
    pub country: String,
    pub phone: Option<String>,
}

/// An order row.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Order {
    pub id: OrderId,
    pub stripe_session_id: String,
    pub stripe_payment_intent: Option<String>,
    pub user_id: Option<UserId>,
    pub email: String,
    pub status: OrderStatus,
    pub currency: String,
    pub subtotal: Decimal,
    pub discount_total: Decimal,
    pub shipping_total: Decimal,
    pub total: Decimal,
    pub discount_code: Option<String>,
    pub shipping_name: String,
    pub shipping_address: Json<ShippingAddress>,
    pub printful_order_id: Option<i64>,
    pub tracking_number: Option<String>,
    pub tracking_url: Option<String>,
    pub carrier: Option<String>,
    pub fulfillment_error: Option<String>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub review_request_sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Reference sent to Printful as `external_id`.
    #[must_use]
    pub fn external_id(&self) -> String {
        external_id(self.id)
    }
}

/// Printful `external_id` for an order.
#[must_use]
pub fn external_id(id: OrderId) -> String {
    format!("order-{id}")
}

/// Parse an order id back out of a Printful `external_id`.
#[must_use]
pub fn parse_external_id(external_id: &str) -> Option<OrderId> {
    external_id
        .strip_prefix("order-")
        .and_then(|id| id.parse().ok())
}

/// An order line.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: Option<ProductId>,
    pub variant_id: Option<VariantId>,
    pub product_name: String,
    pub variant_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub printful_variant_id: Option<i64>,
}

/// Order with its lines.
#[derive(Debug, Clone, Serialize)]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// Row for order lists.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderSummary {
    pub id: OrderId,
    pub email: String,
    pub status: OrderStatus,
    pub currency: String,
    pub total: Decimal,
    pub item_count: i64,
    pub created_at: DateTime<Utc>,
}

/// Data needed to insert an order created from a completed checkout.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub stripe_session_id: String,
    pub stripe_payment_intent: Option<String>,
    pub user_id: Option<UserId>,
    pub email: String,
    pub currency: String,
    pub subtotal: Decimal,
    pub discount_total: Decimal,
    pub shipping_total: Decimal,
    pub total: Decimal,
    pub discount_code: Option<String>,
    pub shipping_name: String,
    pub shipping_address: ShippingAddress,
    pub items: Vec<NewOrderItem>,
}

/// Line of a [`NewOrder`].
#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub product_id: ProductId,
    pub variant_id: VariantId,
    pub product_name: String,
    pub variant_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub printful_variant_id: Option<i64>,
}

/// Tracking details from a shipment notification.
#[derive(Debug, Clone, Default)]
pub struct Shipment {
    pub tracking_number: Option<String>,
    pub tracking_url: Option<String>,
    pub carrier: Option<String>,
}

/// Order that is due a review request email.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ReviewRequestCandidate {
    pub id: OrderId,
    pub email: String,
    pub user_id: Option<UserId>,
}

/// Admin dashboard numbers.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    pub orders_last_30_days: i64,
    pub revenue_last_30_days: Decimal,
    pub orders_by_status: Vec<StatusCount>,
    pub pending_reviews: i64,
    pub failed_fulfillments: i64,
}

/// Count of orders in one status.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct StatusCount {
    pub status: OrderStatus,
    pub count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_external_id_roundtrip() {
        let id = OrderId::new(1042);
        assert_eq!(external_id(id), "order-1042");
        assert_eq!(parse_external_id("order-1042"), Some(id));
        assert_eq!(parse_external_id("1042"), None);
        assert_eq!(parse_external_id("order-abc"), None);
    }
}
