//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront
//! - `STOREFRONT_SESSION_SECRET` - Session signing secret (min 32 chars, high entropy)
//! - `STRIPE_SECRET_KEY` - Stripe API secret key
//! - `STRIPE_WEBHOOK_SECRET` - Stripe webhook endpoint signing secret
//! - `PRINTFUL_API_TOKEN` - Printful private token
//! - `PRINTFUL_STORE_ID` - Printful store ID (webhooks from other stores are rejected)
//! - `CRON_SECRET` - Bearer token required by `/api/cron/*`
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `STOREFRONT_CURRENCY` - Store currency (default: USD)
//! - `STOREFRONT_FLAT_SHIPPING` - Flat shipping charge per order (default: 0.00)
//! - `STRIPE_SHIPPING_COUNTRIES` - Comma-separated ISO country codes (default: US,CA,GB,AU,FR,ES)
//! - `PRINTFUL_AUTO_CONFIRM` - Confirm Printful orders immediately (default: false)
//! - `SMTP_HOST`, `SMTP_PORT`, `SMTP_USERNAME`, `SMTP_PASSWORD`, `EMAIL_FROM` - Transactional
//!   email (disabled when `SMTP_HOST` is unset)
//! - `PUSH_APP_ID`, `PUSH_API_KEY` - Push notifications (disabled when unset)
//! - `ABANDONED_CHECKOUT_DELAY_MINUTES` - Reminder delay, 1 to 2879 (default: 60)
//! - `REVIEW_REQUEST_DELAY_DAYS` - Review request delay after shipping, 1 to 365 (default: 7)
//! - `SENTRY_DSN`, `SENTRY_ENVIRONMENT`, `SENTRY_SAMPLE_RATE`, `SENTRY_TRACES_SAMPLE_RATE`

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::ops::RangeInclusive;
use std::str::FromStr;

use printshop_core::CurrencyCode;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_SESSION_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront (no trailing slash)
    pub base_url: String,
    /// Session signing secret
    pub session_secret: SecretString,
    /// Currency all prices are stored and charged in
    pub currency: CurrencyCode,
    /// Flat shipping charge added at checkout
    pub flat_shipping: Decimal,
    /// Stripe payments configuration
    pub stripe: StripeConfig,
    /// Printful fulfillment configuration
    pub printful: PrintfulConfig,
    /// SMTP configuration; `None` disables email
    pub email: Option<EmailConfig>,
    /// Push provider configuration; `None` disables push
    pub push: Option<PushConfig>,
    /// Shared secret for cron-triggered endpoints
    pub cron_secret: SecretString,
    /// Reminder timing
    pub reminders: ReminderConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
    /// Fraction of error events sent to Sentry
    pub sentry_sample_rate: f32,
    /// Fraction of transactions traced
    pub sentry_traces_sample_rate: f32,
}

/// Stripe configuration.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct StripeConfig {
    /// Secret API key (`sk_...`)
    pub secret_key: SecretString,
    /// Webhook endpoint signing secret (`whsec_...`)
    pub webhook_secret: SecretString,
    /// API base URL (overridable for tests)
    pub api_base: String,
    /// Countries shipping addresses may be collected for
    pub shipping_countries: Vec<String>,
}

impl std::fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeConfig")
            .field("secret_key", &"[REDACTED]")
            .field("webhook_secret", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .field("shipping_countries", &self.shipping_countries)
            .finish()
    }
}

/// Printful configuration.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct PrintfulConfig {
    /// Private API token
    pub api_token: SecretString,
    /// Store ID; sent as `X-PF-Store-Id` and checked on incoming webhooks
    pub store_id: String,
    /// API base URL (overridable for tests)
    pub api_base: String,
    /// Confirm orders for production immediately instead of leaving drafts
    pub auto_confirm: bool,
}

impl std::fmt::Debug for PrintfulConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrintfulConfig")
            .field("api_token", &"[REDACTED]")
            .field("store_id", &self.store_id)
            .field("api_base", &self.api_base)
            .field("auto_confirm", &self.auto_confirm)
            .finish()
    }
}

/// SMTP configuration for transactional email.
#[derive(Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: SecretString,
    pub from_address: String,
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_username", &self.smtp_username)
            .field("smtp_password", &"[REDACTED]")
            .field("from_address", &self.from_address)
            .finish()
    }
}

/// Push notification provider configuration.
#[derive(Clone)]
pub struct PushConfig {
    pub app_id: String,
    pub api_key: SecretString,
    pub api_base: String,
}

impl std::fmt::Debug for PushConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PushConfig")
            .field("app_id", &self.app_id)
            .field("api_key", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .finish()
    }
}

/// Timing for cron-driven reminder emails.
#[derive(Debug, Clone, Copy)]
pub struct ReminderConfig {
    /// Minutes an open checkout must sit before a reminder is sent
    pub abandoned_checkout_delay_minutes: i64,
    /// Days after shipping before a review request is sent
    pub review_request_delay_days: i64,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            abandoned_checkout_delay_minutes: 60,
            review_request_delay_days: 7,
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("STOREFRONT_DATABASE_URL")?;
        let host = get_parsed_or_default::<IpAddr>("STOREFRONT_HOST", "127.0.0.1")?;
        let port = get_parsed_or_default::<u16>("STOREFRONT_PORT", "3000")?;
        let base_url = get_required_env("STOREFRONT_BASE_URL")?
            .trim_end_matches('/')
            .to_string();
        url::Url::parse(&base_url).map_err(|e| {
            ConfigError::InvalidEnvVar("STOREFRONT_BASE_URL".to_string(), e.to_string())
        })?;
        let session_secret = get_validated_secret("STOREFRONT_SESSION_SECRET")?;
        validate_session_secret(&session_secret, "STOREFRONT_SESSION_SECRET")?;

        let currency = get_env_or_default("STOREFRONT_CURRENCY", "USD")
            .parse::<CurrencyCode>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STOREFRONT_CURRENCY".to_string(), e.to_string())
            })?;
        let flat_shipping = get_parsed_or_default::<Decimal>("STOREFRONT_FLAT_SHIPPING", "0.00")?;
        if flat_shipping.is_sign_negative() {
            return Err(ConfigError::InvalidEnvVar(
                "STOREFRONT_FLAT_SHIPPING".to_string(),
                "must not be negative".to_string(),
            ));
        }

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            session_secret,
            currency,
            flat_shipping,
            stripe: StripeConfig::from_env()?,
            printful: PrintfulConfig::from_env()?,
            email: EmailConfig::from_env()?,
            push: PushConfig::from_env()?,
            cron_secret: get_validated_secret("CRON_SECRET")?,
            reminders: ReminderConfig::from_env()?,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: get_parsed_or_default("SENTRY_SAMPLE_RATE", "1.0")?,
            sentry_traces_sample_rate: get_parsed_or_default("SENTRY_TRACES_SAMPLE_RATE", "0.1")?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether cookies should carry the `Secure` attribute.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }

    /// Build an absolute URL for a path on this storefront.
    #[must_use]
    pub fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

impl StripeConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let shipping_countries = get_env_or_default("STRIPE_SHIPPING_COUNTRIES", "US,CA,GB,AU,FR,ES")
            .split(',')
            .map(|c| c.trim().to_ascii_uppercase())
            .filter(|c| !c.is_empty())
            .collect::<Vec<_>>();
        if shipping_countries.iter().any(|c| c.len() != 2) {
            return Err(ConfigError::InvalidEnvVar(
                "STRIPE_SHIPPING_COUNTRIES".to_string(),
                "expected two-letter ISO country codes".to_string(),
            ));
        }

        Ok(Self {
            secret_key: get_validated_secret("STRIPE_SECRET_KEY")?,
            webhook_secret: get_validated_secret("STRIPE_WEBHOOK_SECRET")?,
            api_base: get_env_or_default("STRIPE_API_BASE", "https://api.stripe.com"),
            shipping_countries,
        })
    }
}

impl PrintfulConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            api_token: get_validated_secret("PRINTFUL_API_TOKEN")?,
            store_id: get_required_env("PRINTFUL_STORE_ID")?,
            api_base: get_env_or_default("PRINTFUL_API_BASE", "https://api.printful.com"),
            auto_confirm: get_parsed_or_default("PRINTFUL_AUTO_CONFIRM", "false")?,
        })
    }
}

impl EmailConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(smtp_host) = get_optional_env("SMTP_HOST") else {
            return Ok(None);
        };

        Ok(Some(Self {
            smtp_host,
            smtp_port: get_parsed_or_default("SMTP_PORT", "587")?,
            smtp_username: get_required_env("SMTP_USERNAME")?,
            smtp_password: get_required_secret("SMTP_PASSWORD")?,
            from_address: get_required_env("EMAIL_FROM")?,
        }))
    }
}

impl PushConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(app_id) = get_optional_env("PUSH_APP_ID") else {
            return Ok(None);
        };

        Ok(Some(Self {
            app_id,
            api_key: get_validated_secret("PUSH_API_KEY")?,
            api_base: get_env_or_default("PUSH_API_BASE", "https://api.onesignal.com"),
        }))
    }
}

/// Reminders only go out while a checkout can still complete (48 hours).
const ABANDONED_DELAY_MINUTES_RANGE: RangeInclusive<i64> = 1..=2879;
const REVIEW_DELAY_DAYS_RANGE: RangeInclusive<i64> = 1..=365;

impl ReminderConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let abandoned_checkout_delay_minutes = in_range(
            "ABANDONED_CHECKOUT_DELAY_MINUTES",
            get_parsed_or_default(
                "ABANDONED_CHECKOUT_DELAY_MINUTES",
                &defaults.abandoned_checkout_delay_minutes.to_string(),
            )?,
            &ABANDONED_DELAY_MINUTES_RANGE,
        )?;
        let review_request_delay_days = in_range(
            "REVIEW_REQUEST_DELAY_DAYS",
            get_parsed_or_default(
                "REVIEW_REQUEST_DELAY_DAYS",
                &defaults.review_request_delay_days.to_string(),
            )?,
            &REVIEW_DELAY_DAYS_RANGE,
        )?;

        Ok(Self {
            abandoned_checkout_delay_minutes,
            review_request_delay_days,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a required environment variable as a secret.
fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    Ok(SecretString::from(value))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
/// Database URL alone, for tools that don't need the full configuration.
///
/// Reads `STOREFRONT_DATABASE_URL`, falling back to `DATABASE_URL`, after
/// loading `.env` if present.
///
/// # Errors
///
/// Returns `ConfigError::MissingEnvVar` if neither is set.
pub fn database_url_from_env() -> Result<SecretString, ConfigError> {
    let _ = dotenvy::dotenv();
    get_database_url("STOREFRONT_DATABASE_URL")
}

fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable, treating empty values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get an environment variable parsed into `T`, with a default.
fn get_parsed_or_default<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Reject a parsed value outside `range`.
fn in_range(key: &str, value: i64, range: &RangeInclusive<i64>) -> Result<i64, ConfigError> {
    if range.contains(&value) {
        Ok(value)
    } else {
        Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!(
                "{value} is outside {}..={}",
                range.start(),
                range.end()
            ),
        ))
    }
}

/// Validate that a session secret meets minimum length requirements.
fn validate_session_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_SESSION_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_SESSION_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

/// Configuration used by unit tests across the crate.
#[cfg(test)]
pub(crate) fn test_config() -> StorefrontConfig {
    StorefrontConfig {
        database_url: SecretString::from("postgres://localhost/printshop_test"),
        host: IpAddr::from([127, 0, 0, 1]),
        port: 3000,
        base_url: "http://localhost:3000".to_string(),
        session_secret: SecretString::from("s".repeat(32)),
        currency: CurrencyCode::USD,
        flat_shipping: Decimal::new(500, 2),
        stripe: StripeConfig {
            secret_key: SecretString::from("sk_test_unit"),
            webhook_secret: SecretString::from("whsec_unit_test_secret"),
            api_base: "http://127.0.0.1:9".to_string(),
            shipping_countries: vec!["US".to_string(), "CA".to_string()],
        },
        printful: PrintfulConfig {
            api_token: SecretString::from("pf_unit_token"),
            store_id: "1234567".to_string(),
            api_base: "http://127.0.0.1:9".to_string(),
            auto_confirm: false,
        },
        email: None,
        push: None,
        cron_secret: SecretString::from("cron-unit-secret"),
        reminders: ReminderConfig::default(),
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 1.0,
        sentry_traces_sample_rate: 0.0,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_reminder_delays_are_bounded() {
        let defaults = ReminderConfig::default();
        assert!(ABANDONED_DELAY_MINUTES_RANGE.contains(&defaults.abandoned_checkout_delay_minutes));
        assert!(REVIEW_DELAY_DAYS_RANGE.contains(&defaults.review_request_delay_days));

        assert_eq!(in_range("D", 30, &REVIEW_DELAY_DAYS_RANGE).ok(), Some(30));
        for value in [i64::MIN, -1, 0, 366, i64::MAX] {
            assert!(matches!(
                in_range("REVIEW_REQUEST_DELAY_DAYS", value, &REVIEW_DELAY_DAYS_RANGE),
                Err(ConfigError::InvalidEnvVar(key, _)) if key == "REVIEW_REQUEST_DELAY_DAYS"
            ));
        }
        for value in [i64::MIN, 0, 2880, i64::MAX] {
            assert!(in_range("M", value, &ABANDONED_DELAY_MINUTES_RANGE).is_err());
        }
    }

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_single_char() {
        assert!((shannon_entropy("aaaaaaa") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-stripe-key-here", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
        assert!(validate_secret_strength("changeme123", "TEST_VAR").is_err());
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_accepts_provider_keys() {
        assert!(validate_secret_strength("whsec_Q8vR2mZt7LkP4nWx9sYb3JcF", "STRIPE").is_ok());
        assert!(validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "TEST").is_ok());
    }

    #[test]
    fn test_validate_session_secret_length() {
        assert!(validate_session_secret(&SecretString::from("short"), "S").is_err());
        assert!(validate_session_secret(&SecretString::from("a".repeat(32)), "S").is_ok());
    }

    #[test]
    fn test_socket_addr_and_urls() {
        let config = test_config();
        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
        assert!(!config.is_secure());
        assert_eq!(
            config.url_for("/checkout/success"),
            "http://localhost:3000/checkout/success"
        );
        assert_eq!(config.url_for("account"), "http://localhost:3000/account");
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = test_config();
        let debug_output = format!("{:?}", config.stripe);
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("whsec_unit_test_secret"));

        let debug_output = format!("{:?}", config.printful);
        assert!(debug_output.contains("1234567"));
        assert!(!debug_output.contains("pf_unit_token"));
    }
}
