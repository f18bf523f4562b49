//! Push notifications through the push provider's REST API.
//!
//! Subscriptions are identified by the provider's player/subscription id,
//! registered by the browser after the user grants permission. When push is
//! not configured every send is a no-op.

use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use printshop_core::UserId;

use crate::config::PushConfig;
use crate::db::{PushSubscriptionRepository, RepositoryError};

/// Errors that can occur when sending push notifications.
#[derive(Debug, Error)]
pub enum PushError {
    /// HTTP request failed.
    #[error("Push request failed: {0}")]
    Request(String),

    /// Provider returned an error response.
    #[error("Push API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Subscription lookup failed.
    #[error("Push subscription lookup failed: {0}")]
    Repository(#[from] RepositoryError),
}

/// A notification to deliver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushMessage {
    pub title: String,
    pub body: String,
    /// Page opened when the notification is clicked.
    pub url: Option<String>,
}

impl PushMessage {
    #[must_use]
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            url: None,
        }
    }

    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

#[derive(Debug, Serialize)]
struct LocalizedText<'a> {
    en: &'a str,
}

#[derive(Debug, Serialize)]
struct NotificationRequest<'a> {
    app_id: &'a str,
    include_subscription_ids: &'a [String],
    headings: LocalizedText<'a>,
    contents: LocalizedText<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct NotificationErrorResponse {
    #[serde(default)]
    errors: serde_json::Value,
}

#[derive(Clone)]
struct Provider {
    client: reqwest::Client,
    app_id: String,
    api_base: String,
}

/// Push notification client. Disabled when built without configuration.
#[derive(Clone, Default)]
pub struct PushClient {
    provider: Option<Provider>,
}

impl std::fmt::Debug for PushClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PushClient")
            .field("enabled", &self.is_enabled())
            .field("app_id", &self.provider.as_ref().map(|p| p.app_id.as_str()))
            .finish_non_exhaustive()
    }
}

impl PushClient {
    /// Create a push client; `None` yields a disabled client.
    ///
    /// # Errors
    ///
    /// Returns error if the API key is not a valid header value or the HTTP
    /// client fails to build.
    pub fn new(config: Option<&PushConfig>) -> Result<Self, PushError> {
        let Some(config) = config else {
            return Ok(Self::default());
        };

        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Key {}", config.api_key.expose_secret()))
            .map_err(|e| PushError::Request(format!("Invalid API key format: {e}")))?;
        auth.set_sensitive(true);
        headers.insert("Authorization", auth);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| PushError::Request(e.to_string()))?;

        Ok(Self {
            provider: Some(Provider {
                client,
                app_id: config.app_id.clone(),
                api_base: config.api_base.trim_end_matches('/').to_string(),
            }),
        })
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.provider.is_some()
    }

    /// Send a notification to the given subscriptions.
    ///
    /// # Errors
    ///
    /// Returns error if the provider rejects the request.
    #[instrument(skip(self, subscription_ids, message), fields(recipients = subscription_ids.len()))]
    pub async fn send(
        &self,
        subscription_ids: &[String],
        message: &PushMessage,
    ) -> Result<(), PushError> {
        let Some(provider) = &self.provider else {
            debug!("Push disabled, skipping notification");
            return Ok(());
        };
        if subscription_ids.is_empty() {
            return Ok(());
        }

        let request = NotificationRequest {
            app_id: &provider.app_id,
            include_subscription_ids: subscription_ids,
            headings: LocalizedText { en: &message.title },
            contents: LocalizedText { en: &message.body },
            url: message.url.as_deref(),
        };

        let response = provider
            .client
            .post(format!("{}/notifications", provider.api_base))
            .json(&request)
            .send()
            .await
            .map_err(|e| PushError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<NotificationErrorResponse>()
                .await
                .map(|e| e.errors.to_string())
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(PushError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(())
    }

    /// Notify every subscription belonging to a user. Failures are logged.
    pub async fn notify_user(&self, pool: &PgPool, user_id: UserId, message: &PushMessage) {
        if !self.is_enabled() {
            return;
        }
        let result = async {
            let ids = PushSubscriptionRepository::new(pool)
                .player_ids_for_user(user_id)
                .await?;
            self.send(&ids, message).await
        }
        .await;

        if let Err(e) = result {
            warn!(user_id = %user_id, error = %e, "Failed to send user push notification");
        }
    }

    /// Notify subscriptions of admin users. Failures are logged.
    pub async fn notify_admins(&self, pool: &PgPool, message: &PushMessage) {
        if !self.is_enabled() {
            return;
        }
        let result = async {
            let ids = PushSubscriptionRepository::new(pool).admin_player_ids().await?;
            self.send(&ids, message).await
        }
        .await;

        if let Err(e) = result {
            warn!(error = %e, "Failed to send admin push notification");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;

    use super::*;

    #[tokio::test]
    async fn test_disabled_client_is_noop() {
        let client = PushClient::new(None).unwrap();
        assert!(!client.is_enabled());
        let result = client
            .send(&["abc".to_string()], &PushMessage::new("Hi", "There"))
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_empty_recipients_skip_request() {
        let config = PushConfig {
            app_id: "app-1".to_string(),
            api_key: SecretString::from("push_unit_key"),
            api_base: "http://127.0.0.1:9".to_string(),
        };
        let client = PushClient::new(Some(&config)).unwrap();
        assert!(client.is_enabled());
        assert!(client.send(&[], &PushMessage::new("Hi", "There")).await.is_ok());
        assert!(!format!("{client:?}").contains("push_unit_key"));
    }

    #[test]
    fn test_request_shape() {
        let ids = vec!["sub-1".to_string()];
        let message = PushMessage::new("Shipped", "Your order is on its way")
            .with_url("https://shop.test/account/orders/4");
        let request = NotificationRequest {
            app_id: "app-1",
            include_subscription_ids: &ids,
            headings: LocalizedText { en: &message.title },
            contents: LocalizedText { en: &message.body },
            url: message.url.as_deref(),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["include_subscription_ids"][0], "sub-1");
        assert_eq!(json["headings"]["en"], "Shipped");
        assert_eq!(json["url"], "https://shop.test/account/orders/4");
    }
}
