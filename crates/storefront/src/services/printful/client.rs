//! Printful REST API client.

use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use tracing::{debug, error, instrument};

use super::error::PrintfulError;
use super::types::{
    Envelope, ErrorEnvelope, NewPrintfulOrder, PrintfulOrder, SyncProductDetail,
    SyncProductSummary,
};
use crate::config::PrintfulConfig;

/// Page size for store product listings (Printful's maximum).
pub const PAGE_SIZE: u32 = 100;

/// Printful API client scoped to one store.
#[derive(Clone)]
pub struct PrintfulClient {
    client: reqwest::Client,
    api_base: String,
    store_id: String,
}

impl std::fmt::Debug for PrintfulClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrintfulClient")
            .field("api_base", &self.api_base)
            .field("store_id", &self.store_id)
            .finish_non_exhaustive()
    }
}

impl PrintfulClient {
    /// Create a new Printful client.
    ///
    /// # Errors
    ///
    /// Returns error if the token is not a valid header value or the HTTP
    /// client fails to build.
    pub fn new(config: &PrintfulConfig) -> Result<Self, PrintfulError> {
        let mut headers = HeaderMap::new();

        let mut auth = HeaderValue::from_str(&format!(
            "Bearer {}",
            config.api_token.expose_secret()
        ))
        .map_err(|e| PrintfulError::Request(format!("Invalid API token format: {e}")))?;
        auth.set_sensitive(true);
        headers.insert("Authorization", auth);

        headers.insert(
            "X-PF-Store-Id",
            HeaderValue::from_str(&config.store_id)
                .map_err(|e| PrintfulError::Request(format!("Invalid store id: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| PrintfulError::Request(e.to_string()))?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            store_id: config.store_id.clone(),
        })
    }

    /// Configured store id.
    #[must_use]
    pub fn store_id(&self) -> &str {
        &self.store_id
    }

    /// List every sync product in the store, following pagination.
    ///
    /// # Errors
    ///
    /// Returns error if any page request fails.
    #[instrument(skip(self))]
    pub async fn list_sync_products(&self) -> Result<Vec<SyncProductSummary>, PrintfulError> {
        let mut products = Vec::new();
        let mut offset = 0;

        loop {
            let url = format!(
                "{}/store/products?offset={offset}&limit={PAGE_SIZE}",
                self.api_base
            );
            let page: Envelope<Vec<SyncProductSummary>> = self.get(&url).await?;
            let fetched = u32::try_from(page.result.len()).unwrap_or(PAGE_SIZE);
            products.extend(page.result);
            offset += fetched;

            let total = page.paging.map_or(0, |p| p.total);
            if fetched == 0 || offset >= total {
                break;
            }
        }

        debug!(count = products.len(), "Fetched Printful sync products");
        Ok(products)
    }

    /// Fetch one sync product with its variants.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the product does not exist.
    #[instrument(skip(self))]
    pub async fn get_sync_product(&self, id: i64) -> Result<SyncProductDetail, PrintfulError> {
        let url = format!("{}/store/products/{id}", self.api_base);
        let envelope: Envelope<SyncProductDetail> = self.get(&url).await?;
        Ok(envelope.result)
    }

    /// Create an order. With `confirm` the order goes straight to production;
    /// otherwise it stays a draft in the Printful dashboard.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or Printful rejects the order.
    #[instrument(skip(self, order), fields(external_id = %order.external_id))]
    pub async fn create_order(
        &self,
        order: &NewPrintfulOrder,
        confirm: bool,
    ) -> Result<PrintfulOrder, PrintfulError> {
        if order.items.is_empty() {
            return Err(PrintfulError::InvalidOrder("order has no items".to_string()));
        }

        let url = format!("{}/orders?confirm={confirm}", self.api_base);
        let response = self
            .client
            .post(&url)
            .json(order)
            .send()
            .await
            .map_err(|e| PrintfulError::Request(e.to_string()))?;

        let envelope: Envelope<PrintfulOrder> = Self::parse(response).await?;
        debug!(printful_order_id = envelope.result.id, status = %envelope.result.status, "Printful order created");
        Ok(envelope.result)
    }

    /// Cheap authenticated call used by diagnostics.
    ///
    /// # Errors
    ///
    /// Returns error if the token is rejected or Printful is unreachable.
    #[instrument(skip(self))]
    pub async fn check_credentials(&self) -> Result<(), PrintfulError> {
        let url = format!("{}/store", self.api_base);
        let _: Envelope<serde_json::Value> = self.get(&url).await?;
        Ok(())
    }

    async fn get<T: DeserializeOwned>(&self, url: &str) -> Result<T, PrintfulError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| PrintfulError::Request(e.to_string()))?;
        Self::parse(response).await
    }

    async fn parse<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, PrintfulError> {
        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorEnvelope>()
                .await
                .ok()
                .and_then(ErrorEnvelope::message)
                .unwrap_or_else(|| "Unknown error".to_string());
            error!(status = %status, message = %message, "Printful API error");
            return Err(PrintfulError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| PrintfulError::Response(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::config::test_config;
    use crate::services::printful::types::{Recipient, RetailCosts};

    #[test]
    fn test_debug_hides_token() {
        let client = PrintfulClient::new(&test_config().printful).unwrap();
        let debug = format!("{client:?}");
        assert!(debug.contains("1234567"));
        assert!(!debug.contains("pf_unit_token"));
        assert_eq!(client.store_id(), "1234567");
    }

    #[tokio::test]
    async fn test_empty_order_rejected_before_request() {
        let client = PrintfulClient::new(&test_config().printful).unwrap();
        let order = NewPrintfulOrder {
            external_id: "order-1".to_string(),
            recipient: Recipient {
                name: "Ana".to_string(),
                address1: "1 Main St".to_string(),
                address2: None,
                city: "Austin".to_string(),
                state_code: Some("TX".to_string()),
                country_code: "US".to_string(),
                zip: "78701".to_string(),
                phone: None,
                email: "ana@example.com".to_string(),
            },
            items: vec![],
            retail_costs: RetailCosts {
                currency: "USD".to_string(),
                subtotal: Decimal::ZERO,
                discount: Decimal::ZERO,
                shipping: Decimal::ZERO,
                total: Decimal::ZERO,
            },
        };
        let result = client.create_order(&order, false).await;
        assert!(matches!(result, Err(PrintfulError::InvalidOrder(_))));
    }
}
