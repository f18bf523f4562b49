//! Locale resolution.
//!
//! A leading locale segment is stripped from the path before routing, so
//! `/es/api/products` is served by the `/api/products` handler. Without a
//! prefix the `locale` cookie wins, then `Accept-Language`, then English.
//! This runs outside the router because routing happens on the rewritten URI.

use axum::{
    extract::{FromRequestParts, Request},
    http::{HeaderMap, Uri, header, request::Parts},
    middleware::Next,
    response::Response,
};

use printshop_core::Locale;

/// Cookie holding an explicit locale choice.
pub const LOCALE_COOKIE: &str = "locale";

/// Split a supported locale prefix off `path`.
///
/// Returns the locale and the remaining path, which always starts with `/`.
#[must_use]
pub fn strip_locale_prefix(path: &str) -> Option<(Locale, String)> {
    let rest = path.strip_prefix('/')?;
    let (segment, tail) = rest.split_once('/').map_or((rest, ""), |(s, t)| (s, t));
    if segment.len() != 2 {
        return None;
    }
    let locale = segment.parse::<Locale>().ok()?;
    Some((locale, format!("/{tail}")))
}

fn locale_from_headers(headers: &HeaderMap) -> Option<Locale> {
    let from_cookie = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == LOCALE_COOKIE)
        .and_then(|(_, value)| value.parse::<Locale>().ok());

    from_cookie.or_else(|| {
        headers
            .get(header::ACCEPT_LANGUAGE)
            .and_then(|v| v.to_str().ok())
            .and_then(Locale::from_accept_language)
    })
}

/// Resolve the request locale and rewrite prefixed paths.
pub async fn locale_middleware(mut request: Request, next: Next) -> Response {
    let prefixed = strip_locale_prefix(request.uri().path());

    let locale = match prefixed {
        Some((locale, path)) => {
            let path_and_query = match request.uri().query() {
                Some(query) => format!("{path}?{query}"),
                None => path,
            };
            if let Ok(uri) = path_and_query.parse::<Uri>() {
                *request.uri_mut() = uri;
            }
            locale
        }
        None => locale_from_headers(request.headers()).unwrap_or_default(),
    };

    request.extensions_mut().insert(locale);
    next.run(request).await
}

/// Extractor for the locale resolved by [`locale_middleware`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestLocale(pub Locale);

impl<S> FromRequestParts<S> for RequestLocale
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(
            parts.extensions.get::<Locale>().copied().unwrap_or_default(),
        ))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_strip_locale_prefix() {
        assert_eq!(
            strip_locale_prefix("/es/api/products"),
            Some((Locale::Es, "/api/products".to_string()))
        );
        assert_eq!(strip_locale_prefix("/fr"), Some((Locale::Fr, "/".to_string())));
        assert_eq!(strip_locale_prefix("/api/products"), None);
        assert_eq!(strip_locale_prefix("/de/api"), None);
        assert_eq!(strip_locale_prefix("/"), None);
    }

    #[test]
    fn test_cookie_beats_accept_language() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("ps_session=abc; locale=fr"));
        headers.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_static("es-MX,es;q=0.9"));
        assert_eq!(locale_from_headers(&headers), Some(Locale::Fr));

        headers.remove(header::COOKIE);
        assert_eq!(locale_from_headers(&headers), Some(Locale::Es));

        headers.remove(header::ACCEPT_LANGUAGE);
        assert_eq!(locale_from_headers(&headers), None);
    }
}
