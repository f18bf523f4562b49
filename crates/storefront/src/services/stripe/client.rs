//! Stripe REST API client.
//!
//! Stripe takes form-encoded requests with bracketed keys and returns JSON.
//! Only Checkout Session creation and webhook verification are needed.

use hmac::{Hmac, Mac};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use tracing::{debug, error, instrument};

use super::error::StripeError;
use super::types::{ApiErrorResponse, CheckoutSessionParams, CreatedSession, Event};
use crate::config::StripeConfig;

/// Maximum age of a signed webhook, in seconds.
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

/// Stripe API client.
#[derive(Clone)]
pub struct StripeClient {
    client: Client,
    secret_key: SecretString,
    webhook_secret: SecretString,
    api_base: String,
}

impl std::fmt::Debug for StripeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeClient")
            .field("secret_key", &"[REDACTED]")
            .field("webhook_secret", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}

impl StripeClient {
    /// Create a new Stripe client.
    #[must_use]
    pub fn new(config: &StripeConfig) -> Self {
        Self {
            client: Client::new(),
            secret_key: config.secret_key.clone(),
            webhook_secret: config.webhook_secret.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
        }
    }

    /// Create a Checkout Session.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or Stripe rejects it.
    #[instrument(skip(self, params), fields(lines = params.line_items.len()))]
    pub async fn create_checkout_session(
        &self,
        params: &CheckoutSessionParams,
    ) -> Result<CreatedSession, StripeError> {
        let response = self
            .client
            .post(format!("{}/v1/checkout/sessions", self.api_base))
            .bearer_auth(self.secret_key.expose_secret())
            .form(&params.to_form())
            .send()
            .await
            .map_err(|e| StripeError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ApiErrorResponse>()
                .await
                .ok()
                .and_then(|e| e.error.message)
                .unwrap_or_else(|| "Unknown error".to_string());
            error!(status = %status, message = %message, "Stripe API error creating session");
            return Err(StripeError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let session: CreatedSession = response
            .json()
            .await
            .map_err(|e| StripeError::Response(e.to_string()))?;

        debug!(session_id = %session.id, "Checkout session created");
        Ok(session)
    }

    /// Cheap authenticated call used by diagnostics.
    ///
    /// # Errors
    ///
    /// Returns error if the key is rejected or Stripe is unreachable.
    #[instrument(skip(self))]
    pub async fn check_credentials(&self) -> Result<(), StripeError> {
        let response = self
            .client
            .get(format!("{}/v1/balance", self.api_base))
            .bearer_auth(self.secret_key.expose_secret())
            .send()
            .await
            .map_err(|e| StripeError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(StripeError::Api {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }
        Ok(())
    }

    /// Verify a webhook's `Stripe-Signature` header and parse the event.
    ///
    /// # Errors
    ///
    /// Returns `StripeError::InvalidSignature` if verification fails and
    /// `StripeError::InvalidPayload` if the body is not an event.
    #[instrument(skip(self, payload, signature_header))]
    pub fn construct_event(&self, payload: &str, signature_header: &str) -> Result<Event, StripeError> {
        verify_signature(
            self.webhook_secret.expose_secret().as_bytes(),
            payload,
            signature_header,
            chrono::Utc::now().timestamp(),
        )?;

        serde_json::from_str(payload).map_err(|e| StripeError::InvalidPayload(e.to_string()))
    }
}

/// Check a `Stripe-Signature` header (`t=<ts>,v1=<hex>[,v1=<hex>...]`)
/// against the raw payload at time `now`.
///
/// Any `v1` entry may match, which covers secret rotation.
///
/// # Errors
///
/// Returns `StripeError::InvalidSignature` describing the failure.
pub fn verify_signature(
    secret: &[u8],
    payload: &str,
    header: &str,
    now: i64,
) -> Result<(), StripeError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = Some(value),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp =
        timestamp.ok_or_else(|| StripeError::InvalidSignature("Missing timestamp".to_string()))?;
    let ts: i64 = timestamp
        .parse()
        .map_err(|_| StripeError::InvalidSignature("Invalid timestamp".to_string()))?;

    if signatures.is_empty() {
        return Err(StripeError::InvalidSignature(
            "No v1 signature".to_string(),
        ));
    }

    if now.abs_diff(ts) > SIGNATURE_TOLERANCE_SECS.unsigned_abs() {
        return Err(StripeError::InvalidSignature(
            "Timestamp outside tolerance".to_string(),
        ));
    }

    let mut mac = Hmac::<Sha256>::new_from_slice(secret)
        .map_err(|e| StripeError::InvalidSignature(e.to_string()))?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload.as_bytes());
    let expected = hex::encode(mac.finalize().into_bytes());

    if !signatures
        .iter()
        .any(|sig| constant_time_compare(&expected, sig))
    {
        return Err(StripeError::InvalidSignature(
            "Signature mismatch".to_string(),
        ));
    }

    Ok(())
}

/// Constant-time string comparison to prevent timing attacks.
pub(crate) fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }

    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"whsec_test_secret";
    const NOW: i64 = 1_750_000_000;

    fn sign(ts: i64, payload: &str) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(SECRET).expect("valid key length");
        mac.update(format!("{ts}.{payload}").as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("hello", "hello"));
        assert!(!constant_time_compare("hello", "world"));
        assert!(!constant_time_compare("hello", "hell"));
    }

    #[test]
    fn test_valid_signature() {
        let payload = r#"{"id":"evt_1"}"#;
        let header = format!("t={NOW},v1={}", sign(NOW, payload));
        assert!(verify_signature(SECRET, payload, &header, NOW + 10).is_ok());
    }

    #[test]
    fn test_any_v1_may_match() {
        let payload = "{}";
        let header = format!("t={NOW},v1=deadbeef,v0=ignored,v1={}", sign(NOW, payload));
        assert!(verify_signature(SECRET, payload, &header, NOW).is_ok());
    }

    #[test]
    fn test_tampered_payload() {
        let header = format!("t={NOW},v1={}", sign(NOW, r#"{"amount":1}"#));
        let result = verify_signature(SECRET, r#"{"amount":9}"#, &header, NOW);
        assert!(matches!(result, Err(StripeError::InvalidSignature(_))));
    }

    #[test]
    fn test_outside_tolerance() {
        let payload = "{}";
        let old = NOW - SIGNATURE_TOLERANCE_SECS - 1;
        let header = format!("t={old},v1={}", sign(old, payload));
        let result = verify_signature(SECRET, payload, &header, NOW);
        assert!(matches!(result, Err(StripeError::InvalidSignature(msg)) if msg.contains("tolerance")));
    }

    #[test]
    fn test_malformed_headers() {
        let no_signature = format!("t={NOW}");
        let earliest = format!("t={},v1=00", i64::MIN);
        let latest = format!("t={},v1=00", i64::MAX);
        for header in [
            "",
            "v1=abc",
            "t=abc,v1=abc",
            no_signature.as_str(),
            earliest.as_str(),
            latest.as_str(),
        ] {
            assert!(
                verify_signature(SECRET, "{}", header, NOW).is_err(),
                "header {header:?} should be rejected"
            );
        }
    }
}
