//! Printful API payloads.
//!
//! Printful wraps every response in `{"code": ..., "result": ...}`. Only the
//! fields the storefront reads are modelled.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use printshop_core::OrderStatus;

/// Standard response envelope.
#[derive(Debug, Deserialize)]
pub(super) struct Envelope<T> {
    pub result: T,
    pub paging: Option<Paging>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub(super) struct Paging {
    pub total: u32,
}

/// Error envelope. Older endpoints put the message in `result`.
#[derive(Debug, Deserialize)]
pub(super) struct ErrorEnvelope {
    pub error: Option<ErrorBody>,
    pub result: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ErrorBody {
    pub message: Option<String>,
}

impl ErrorEnvelope {
    pub fn message(self) -> Option<String> {
        self.error.and_then(|e| e.message).or_else(|| match self.result {
            Some(serde_json::Value::String(s)) => Some(s),
            _ => None,
        })
    }
}

// =============================================================================
// Sync products
// =============================================================================

/// Entry of the store product list.
#[derive(Debug, Clone, Deserialize)]
pub struct SyncProductSummary {
    pub id: i64,
    pub name: String,
    pub thumbnail_url: Option<String>,
}

/// Store product with its variants.
#[derive(Debug, Clone, Deserialize)]
pub struct SyncProductDetail {
    pub sync_product: SyncProductSummary,
    #[serde(default)]
    pub sync_variants: Vec<SyncVariant>,
}

/// A store variant linked to a catalog variant.
#[derive(Debug, Clone, Deserialize)]
pub struct SyncVariant {
    pub id: i64,
    pub name: String,
    pub sku: Option<String>,
    pub retail_price: Option<Decimal>,
    pub color: Option<String>,
    pub size: Option<String>,
    #[serde(default = "default_true")]
    pub synced: bool,
    #[serde(default)]
    pub is_ignored: bool,
    pub product: Option<CatalogVariantRef>,
    #[serde(default)]
    pub files: Vec<PrintFile>,
}

const fn default_true() -> bool {
    true
}

/// Catalog product the variant is printed on.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogVariantRef {
    pub variant_id: Option<i64>,
    pub product_id: Option<i64>,
    pub image: Option<String>,
    pub name: Option<String>,
}

/// A file attached to a variant. Mockups have type `preview`.
#[derive(Debug, Clone, Deserialize)]
pub struct PrintFile {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub preview_url: Option<String>,
    pub thumbnail_url: Option<String>,
}

impl SyncVariant {
    /// Whether the variant can be sold.
    #[must_use]
    pub const fn is_sellable(&self) -> bool {
        self.synced && !self.is_ignored
    }

    /// Mockup image showing the design on this variant.
    #[must_use]
    pub fn preview_url(&self) -> Option<&str> {
        self.files
            .iter()
            .filter(|f| f.kind.as_deref() == Some("preview"))
            .find_map(|f| f.preview_url.as_deref().or(f.thumbnail_url.as_deref()))
    }

    /// Blank catalog product image for this variant.
    #[must_use]
    pub fn catalog_image(&self) -> Option<&str> {
        self.product.as_ref().and_then(|p| p.image.as_deref())
    }
}

// =============================================================================
// Orders
// =============================================================================

/// Order creation request.
#[derive(Debug, Clone, Serialize)]
pub struct NewPrintfulOrder {
    pub external_id: String,
    pub recipient: Recipient,
    pub items: Vec<OrderItem>,
    pub retail_costs: RetailCosts,
}

/// Shipping recipient.
#[derive(Debug, Clone, Serialize)]
pub struct Recipient {
    pub name: String,
    pub address1: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address2: Option<String>,
    pub city: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_code: Option<String>,
    pub country_code: String,
    pub zip: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub email: String,
}

/// Order line referencing a store variant.
#[derive(Debug, Clone, Serialize)]
pub struct OrderItem {
    pub sync_variant_id: i64,
    pub quantity: i32,
    pub retail_price: Decimal,
    pub name: String,
}

/// Amounts the customer paid, shown on packing slips.
#[derive(Debug, Clone, Serialize)]
pub struct RetailCosts {
    pub currency: String,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub shipping: Decimal,
    pub total: Decimal,
}

/// Created order.
#[derive(Debug, Clone, Deserialize)]
pub struct PrintfulOrder {
    pub id: i64,
    pub external_id: Option<String>,
    pub status: String,
}

/// Map a Printful order status onto ours.
#[must_use]
pub fn order_status_from_printful(status: &str) -> Option<OrderStatus> {
    match status {
        "draft" | "pending" => Some(OrderStatus::Submitted),
        "inprocess" => Some(OrderStatus::InProduction),
        "onhold" => Some(OrderStatus::OnHold),
        "partial" | "fulfilled" => Some(OrderStatus::Shipped),
        "canceled" => Some(OrderStatus::Canceled),
        "failed" => Some(OrderStatus::FulfillmentFailed),
        _ => None,
    }
}

// =============================================================================
// Webhooks
// =============================================================================

/// Webhook notification body.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub kind: String,
    /// Store id; Printful sends it as a number.
    pub store: serde_json::Value,
    #[serde(default)]
    pub data: WebhookData,
}

/// Event data. Which fields are present depends on the event type.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookData {
    pub order: Option<WebhookOrder>,
    pub shipment: Option<WebhookShipment>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookOrder {
    pub id: i64,
    pub external_id: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookShipment {
    pub carrier: Option<String>,
    pub service: Option<String>,
    pub tracking_number: Option<serde_json::Value>,
    pub tracking_url: Option<String>,
}

impl WebhookEvent {
    /// Store id as a string, whether sent as number or string.
    #[must_use]
    pub fn store_id(&self) -> Option<String> {
        match &self.store {
            serde_json::Value::Number(n) => Some(n.to_string()),
            serde_json::Value::String(s) => Some(s.clone()),
            _ => None,
        }
    }

    /// Our order reference, if the event carries one.
    #[must_use]
    pub fn external_id(&self) -> Option<&str> {
        self.data
            .order
            .as_ref()
            .and_then(|o| o.external_id.as_deref())
    }
}

impl WebhookShipment {
    /// Tracking number; Printful sends numbers for some carriers.
    #[must_use]
    pub fn tracking_number(&self) -> Option<String> {
        match &self.tracking_number {
            Some(serde_json::Value::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(serde_json::Value::Number(n)) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// Webhook event types.
pub mod events {
    pub const PACKAGE_SHIPPED: &str = "package_shipped";
    pub const PACKAGE_RETURNED: &str = "package_returned";
    pub const ORDER_FAILED: &str = "order_failed";
    pub const ORDER_CANCELED: &str = "order_canceled";
    pub const ORDER_PUT_HOLD: &str = "order_put_hold";
    pub const ORDER_REMOVE_HOLD: &str = "order_remove_hold";
    pub const ORDER_UPDATED: &str = "order_updated";
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_variant_images() {
        let json = serde_json::json!({
            "id": 4001,
            "name": "Logo Tee - Black / M",
            "sku": "TEE-BLK-M",
            "retail_price": "24.50",
            "color": "Black",
            "size": "M",
            "product": {"variant_id": 4012, "product_id": 71, "image": "https://files.cdn/blank.png"},
            "files": [
                {"type": "default", "preview_url": "https://files.cdn/print.png"},
                {"type": "preview", "preview_url": "https://files.cdn/mockup.png"}
            ]
        });
        let variant: SyncVariant = serde_json::from_value(json).unwrap();
        assert!(variant.is_sellable());
        assert_eq!(variant.retail_price, Some(Decimal::new(2450, 2)));
        assert_eq!(variant.preview_url(), Some("https://files.cdn/mockup.png"));
        assert_eq!(variant.catalog_image(), Some("https://files.cdn/blank.png"));
    }

    #[test]
    fn test_webhook_shipped() {
        let json = serde_json::json!({
            "type": "package_shipped",
            "created": 1_750_000_000,
            "retries": 0,
            "store": 1_234_567,
            "data": {
                "shipment": {"carrier": "USPS", "service": "First Class",
                             "tracking_number": 9_400_111, "tracking_url": "https://track/1"},
                "order": {"id": 88, "external_id": "order-12", "status": "fulfilled"}
            }
        });
        let event: WebhookEvent = serde_json::from_value(json).unwrap();
        assert_eq!(event.kind, events::PACKAGE_SHIPPED);
        assert_eq!(event.store_id().as_deref(), Some("1234567"));
        assert_eq!(event.external_id(), Some("order-12"));
        let shipment = event.data.shipment.unwrap();
        assert_eq!(shipment.tracking_number().as_deref(), Some("9400111"));
    }

    #[test]
    fn test_webhook_without_data() {
        let json = serde_json::json!({"type": "stock_updated", "store": "99"});
        let event: WebhookEvent = serde_json::from_value(json).unwrap();
        assert_eq!(event.store_id().as_deref(), Some("99"));
        assert!(event.external_id().is_none());
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            order_status_from_printful("inprocess"),
            Some(OrderStatus::InProduction)
        );
        assert_eq!(
            order_status_from_printful("fulfilled"),
            Some(OrderStatus::Shipped)
        );
        assert_eq!(order_status_from_printful("archived"), None);
    }

    #[test]
    fn test_error_envelope_message() {
        let body: ErrorEnvelope = serde_json::from_value(serde_json::json!({
            "code": 400, "result": "Invalid recipient", "error": {"reason": "BadRequest", "message": "Recipient zip is missing"}
        }))
        .unwrap();
        assert_eq!(body.message().as_deref(), Some("Recipient zip is missing"));

        let legacy: ErrorEnvelope =
            serde_json::from_value(serde_json::json!({"code": 404, "result": "Not found"})).unwrap();
        assert_eq!(legacy.message().as_deref(), Some("Not found"));
    }
}
