//! Stripe API request and webhook payload types.
//!
//! Only the fields this store reads are modelled; everything else in the
//! payloads is ignored.

use std::collections::HashMap;

use serde::Deserialize;

use crate::models::order::ShippingAddress;

/// A Checkout line item with inline price data, amounts in minor units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineItem {
    pub name: String,
    pub image_url: Option<String>,
    pub unit_amount: i64,
    pub quantity: u32,
}

/// Parameters for creating a Checkout Session.
#[derive(Debug, Clone)]
pub struct CheckoutSessionParams {
    pub line_items: Vec<LineItem>,
    /// Lower-case ISO currency code.
    pub currency: String,
    /// Flat shipping in minor units.
    pub shipping_amount: i64,
    pub allowed_countries: Vec<String>,
    pub customer_email: Option<String>,
    pub success_url: String,
    pub cancel_url: String,
    pub metadata: Vec<(String, String)>,
}

impl CheckoutSessionParams {
    /// Flatten into Stripe's bracketed form encoding.
    #[must_use]
    pub fn to_form(&self) -> Vec<(String, String)> {
        let mut form = vec![
            ("mode".to_string(), "payment".to_string()),
            ("success_url".to_string(), self.success_url.clone()),
            ("cancel_url".to_string(), self.cancel_url.clone()),
        ];

        if let Some(email) = &self.customer_email {
            form.push(("customer_email".to_string(), email.clone()));
        }

        for (i, item) in self.line_items.iter().enumerate() {
            let prefix = format!("line_items[{i}]");
            form.push((format!("{prefix}[quantity]"), item.quantity.to_string()));
            form.push((
                format!("{prefix}[price_data][currency]"),
                self.currency.clone(),
            ));
            form.push((
                format!("{prefix}[price_data][unit_amount]"),
                item.unit_amount.to_string(),
            ));
            form.push((
                format!("{prefix}[price_data][product_data][name]"),
                item.name.clone(),
            ));
            if let Some(image) = &item.image_url {
                form.push((
                    format!("{prefix}[price_data][product_data][images][0]"),
                    image.clone(),
                ));
            }
        }

        let rate = "shipping_options[0][shipping_rate_data]";
        form.push((format!("{rate}[type]"), "fixed_amount".to_string()));
        form.push((format!("{rate}[display_name]"), "Shipping".to_string()));
        form.push((
            format!("{rate}[fixed_amount][amount]"),
            self.shipping_amount.to_string(),
        ));
        form.push((format!("{rate}[fixed_amount][currency]"), self.currency.clone()));

        for (i, country) in self.allowed_countries.iter().enumerate() {
            form.push((
                format!("shipping_address_collection[allowed_countries][{i}]"),
                country.clone(),
            ));
        }

        form.push((
            "phone_number_collection[enabled]".to_string(),
            "true".to_string(),
        ));

        for (key, value) in &self.metadata {
            form.push((format!("metadata[{key}]"), value.clone()));
        }

        form
    }
}

/// The part of a created session the storefront needs.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedSession {
    pub id: String,
    pub url: Option<String>,
}

/// Error envelope returned by the Stripe API.
#[derive(Debug, Deserialize)]
pub(super) struct ApiErrorResponse {
    pub error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
pub(super) struct ApiErrorBody {
    pub message: Option<String>,
}

/// A webhook event.
#[derive(Debug, Clone, Deserialize)]
pub struct Event {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub data: EventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventData {
    pub object: serde_json::Value,
}

/// A Checkout Session as delivered in webhook events.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSessionObject {
    pub id: String,
    pub payment_status: String,
    pub payment_intent: Option<String>,
    pub amount_total: Option<i64>,
    pub customer_details: Option<CustomerDetails>,
    /// Older API versions.
    pub shipping_details: Option<ShippingDetails>,
    /// Newer API versions nest shipping details here.
    pub collected_information: Option<CollectedInformation>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CustomerDetails {
    pub email: Option<String>,
    pub name: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CollectedInformation {
    pub shipping_details: Option<ShippingDetails>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShippingDetails {
    pub name: Option<String>,
    pub address: StripeAddress,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StripeAddress {
    pub line1: Option<String>,
    pub line2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
}

impl CheckoutSessionObject {
    /// Whether the money has been collected.
    #[must_use]
    pub fn is_paid(&self) -> bool {
        self.payment_status == "paid" || self.payment_status == "no_payment_required"
    }

    /// Shipping details from whichever field the API version uses.
    #[must_use]
    pub fn shipping(&self) -> Option<&ShippingDetails> {
        self.collected_information
            .as_ref()
            .and_then(|c| c.shipping_details.as_ref())
            .or(self.shipping_details.as_ref())
    }

    /// Customer email as entered at checkout.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.customer_details
            .as_ref()
            .and_then(|c| c.email.as_deref())
    }

    /// Recipient name and address.
    #[must_use]
    pub fn shipping_address(&self) -> (String, ShippingAddress) {
        let phone = self
            .customer_details
            .as_ref()
            .and_then(|c| c.phone.clone());
        let Some(shipping) = self.shipping() else {
            let name = self
                .customer_details
                .as_ref()
                .and_then(|c| c.name.clone())
                .unwrap_or_default();
            return (
                name,
                ShippingAddress {
                    phone,
                    ..ShippingAddress::default()
                },
            );
        };

        let a = &shipping.address;
        (
            shipping.name.clone().unwrap_or_default(),
            ShippingAddress {
                line1: a.line1.clone().unwrap_or_default(),
                line2: a.line2.clone().filter(|l| !l.is_empty()),
                city: a.city.clone().unwrap_or_default(),
                state: a.state.clone().filter(|s| !s.is_empty()),
                postal_code: a.postal_code.clone().unwrap_or_default(),
                country: a.country.clone().unwrap_or_default(),
                phone,
            },
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn params() -> CheckoutSessionParams {
        CheckoutSessionParams {
            line_items: vec![LineItem {
                name: "Tee - M".to_string(),
                image_url: Some("https://cdn.example.com/tee.png".to_string()),
                unit_amount: 2500,
                quantity: 2,
            }],
            currency: "usd".to_string(),
            shipping_amount: 500,
            allowed_countries: vec!["US".to_string(), "CA".to_string()],
            customer_email: Some("ana@example.com".to_string()),
            success_url: "https://shop.test/checkout/success".to_string(),
            cancel_url: "https://shop.test/cart".to_string(),
            metadata: vec![("user_id".to_string(), "7".to_string())],
        }
    }

    fn get<'a>(form: &'a [(String, String)], key: &str) -> Option<&'a str> {
        form.iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_form_encoding() {
        let form = params().to_form();
        assert_eq!(get(&form, "mode"), Some("payment"));
        assert_eq!(get(&form, "customer_email"), Some("ana@example.com"));
        assert_eq!(get(&form, "line_items[0][quantity]"), Some("2"));
        assert_eq!(
            get(&form, "line_items[0][price_data][unit_amount]"),
            Some("2500")
        );
        assert_eq!(
            get(&form, "line_items[0][price_data][product_data][images][0]"),
            Some("https://cdn.example.com/tee.png")
        );
        assert_eq!(
            get(&form, "shipping_options[0][shipping_rate_data][fixed_amount][amount]"),
            Some("500")
        );
        assert_eq!(
            get(&form, "shipping_address_collection[allowed_countries][1]"),
            Some("CA")
        );
        assert_eq!(get(&form, "metadata[user_id]"), Some("7"));
    }

    #[test]
    fn test_guest_form_has_no_email() {
        let mut p = params();
        p.customer_email = None;
        assert!(get(&p.to_form(), "customer_email").is_none());
    }

    #[test]
    fn test_session_object_shipping_new_api() {
        let json = serde_json::json!({
            "id": "cs_test_1",
            "payment_status": "paid",
            "payment_intent": "pi_1",
            "amount_total": 5500,
            "customer_details": {"email": "ana@example.com", "name": "Ana", "phone": "+15550100"},
            "collected_information": {"shipping_details": {
                "name": "Ana Lima",
                "address": {"line1": "1 Main St", "line2": "", "city": "Austin",
                            "state": "TX", "postal_code": "78701", "country": "US"}
            }},
            "metadata": {"user_id": "7"}
        });
        let session: CheckoutSessionObject = serde_json::from_value(json).unwrap();
        assert!(session.is_paid());
        assert_eq!(session.email(), Some("ana@example.com"));

        let (name, address) = session.shipping_address();
        assert_eq!(name, "Ana Lima");
        assert_eq!(address.city, "Austin");
        assert_eq!(address.line2, None);
        assert_eq!(address.phone.as_deref(), Some("+15550100"));
    }

    #[test]
    fn test_session_object_shipping_old_api() {
        let json = serde_json::json!({
            "id": "cs_test_2",
            "payment_status": "unpaid",
            "shipping_details": {
                "name": "Bo",
                "address": {"line1": "2 Side Rd", "city": "Leeds",
                            "postal_code": "LS1", "country": "GB"}
            }
        });
        let session: CheckoutSessionObject = serde_json::from_value(json).unwrap();
        assert!(!session.is_paid());
        let (name, address) = session.shipping_address();
        assert_eq!(name, "Bo");
        assert_eq!(address.country, "GB");
        assert!(session.metadata.is_empty());
    }
}
