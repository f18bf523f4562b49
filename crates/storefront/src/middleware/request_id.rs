//! Correlation ids for storefront requests.
//!
//! An id forwarded by the edge proxy is reused when it looks like one;
//! anything else gets a fresh UUID. The id lands on the `http_request` span,
//! on Sentry events as `storefront.request_id` and on the response.

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use tracing::Span;
use uuid::Uuid;

/// Header carrying the correlation id in both directions.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Sentry tag the id is reported under.
pub const SENTRY_TAG: &str = "storefront.request_id";

/// Longest forwarded id we keep.
const MAX_FORWARDED_LEN: usize = 128;

/// Returns the forwarded id if it is short and made of token characters.
///
/// Log lines and Sentry tags are keyed on this value, so spaces, quotes and
/// control characters are refused.
#[must_use]
pub fn forwarded_request_id(value: &str) -> Option<&str> {
    let valid = !value.is_empty()
        && value.len() <= MAX_FORWARDED_LEN
        && value
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b':'));
    valid.then_some(value)
}

/// Tags the request with a correlation id and echoes it back.
pub async fn request_id_middleware(request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .and_then(forwarded_request_id)
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    Span::current().record("request_id", request_id.as_str());
    sentry::configure_scope(|scope| scope.set_tag(SENTRY_TAG, &request_id));

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forwarded_request_id() {
        assert_eq!(
            forwarded_request_id("8f14e45f-ceea-4a7b-9b1c-1e2d3c4b5a69"),
            Some("8f14e45f-ceea-4a7b-9b1c-1e2d3c4b5a69")
        );
        assert_eq!(forwarded_request_id("cf-ray:7d1a.LHR"), Some("cf-ray:7d1a.LHR"));
        assert_eq!(forwarded_request_id(""), None);
        assert_eq!(forwarded_request_id("has space"), None);
        assert_eq!(forwarded_request_id("quote\"d"), None);
        assert_eq!(forwarded_request_id(&"a".repeat(MAX_FORWARDED_LEN + 1)), None);
        assert!(forwarded_request_id(&"a".repeat(MAX_FORWARDED_LEN)).is_some());
    }
}
