//! Transactional email.
//!
//! Uses SMTP via lettre for delivery with Askama templates, one HTML and one
//! plain text body per message. When SMTP is not configured messages are
//! rendered and dropped with a debug log.

use askama::Template;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use thiserror::Error;
use tracing::{debug, info, instrument};

use printshop_core::{CurrencyCode, Price};

use crate::config::EmailConfig;
use crate::models::cart::PricedCart;
use crate::models::order::{Order, OrderItem};

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

/// A priced line as shown in an email.
#[derive(Debug, Clone)]
pub struct EmailLine {
    pub name: String,
    pub quantity: i64,
    pub amount: String,
}

/// A product link in a review request.
#[derive(Debug, Clone)]
pub struct ReviewLink {
    pub name: String,
    pub url: String,
}

// =============================================================================
// Templates
// =============================================================================

#[derive(Template)]
#[template(path = "email/order_confirmation.html")]
struct OrderConfirmationHtml<'a> {
    order_number: &'a str,
    lines: &'a [EmailLine],
    subtotal: &'a str,
    discount: Option<&'a str>,
    shipping: &'a str,
    total: &'a str,
    order_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/order_confirmation.txt")]
struct OrderConfirmationText<'a> {
    order_number: &'a str,
    lines: &'a [EmailLine],
    subtotal: &'a str,
    discount: Option<&'a str>,
    shipping: &'a str,
    total: &'a str,
    order_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/shipping_update.html")]
struct ShippingUpdateHtml<'a> {
    order_number: &'a str,
    carrier: Option<&'a str>,
    tracking_number: Option<&'a str>,
    tracking_url: Option<&'a str>,
}

#[derive(Template)]
#[template(path = "email/shipping_update.txt")]
struct ShippingUpdateText<'a> {
    order_number: &'a str,
    carrier: Option<&'a str>,
    tracking_number: Option<&'a str>,
    tracking_url: Option<&'a str>,
}

#[derive(Template)]
#[template(path = "email/abandoned_checkout.html")]
struct AbandonedCheckoutHtml<'a> {
    lines: &'a [EmailLine],
    total: &'a str,
    cart_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/abandoned_checkout.txt")]
struct AbandonedCheckoutText<'a> {
    lines: &'a [EmailLine],
    total: &'a str,
    cart_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/review_request.html")]
struct ReviewRequestHtml<'a> {
    order_number: &'a str,
    products: &'a [ReviewLink],
}

#[derive(Template)]
#[template(path = "email/review_request.txt")]
struct ReviewRequestText<'a> {
    order_number: &'a str,
    products: &'a [ReviewLink],
}

#[derive(Template)]
#[template(path = "email/welcome.html")]
struct WelcomeHtml<'a> {
    name: &'a str,
    referral_url: &'a str,
    shop_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/welcome.txt")]
struct WelcomeText<'a> {
    name: &'a str,
    referral_url: &'a str,
    shop_url: &'a str,
}

// =============================================================================
// Service
// =============================================================================

/// Email service for sending transactional emails.
#[derive(Clone)]
pub struct EmailService {
    mailer: Option<AsyncSmtpTransport<Tokio1Executor>>,
    from_address: String,
    base_url: String,
}

impl std::fmt::Debug for EmailService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailService")
            .field("enabled", &self.mailer.is_some())
            .field("from_address", &self.from_address)
            .finish_non_exhaustive()
    }
}

impl EmailService {
    /// Create an email service. `None` yields a service that only logs.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay can't be set up.
    pub fn new(config: Option<&EmailConfig>, base_url: &str) -> Result<Self, SmtpError> {
        let base_url = base_url.trim_end_matches('/').to_string();
        let Some(config) = config else {
            return Ok(Self {
                mailer: None,
                from_address: String::new(),
                base_url,
            });
        };

        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer: Some(mailer),
            from_address: config.from_address.clone(),
            base_url,
        })
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.mailer.is_some()
    }

    /// Send the order confirmation.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    #[instrument(skip(self, order, items), fields(order_id = %order.id))]
    pub async fn send_order_confirmation(
        &self,
        order: &Order,
        items: &[OrderItem],
    ) -> Result<(), EmailError> {
        let currency = &order.currency;
        let lines: Vec<EmailLine> = items
            .iter()
            .map(|i| EmailLine {
                name: format!("{} ({})", i.product_name, i.variant_name),
                quantity: i64::from(i.quantity),
                amount: format_amount(i.unit_price * Decimal::from(i.quantity), currency),
            })
            .collect();
        let order_number = order.id.to_string();
        let subtotal = format_amount(order.subtotal, currency);
        let discount = (!order.discount_total.is_zero())
            .then(|| format_amount(order.discount_total, currency));
        let shipping = format_amount(order.shipping_total, currency);
        let total = format_amount(order.total, currency);
        let order_url = format!("{}/account/orders/{}", self.base_url, order.id);

        let html = OrderConfirmationHtml {
            order_number: &order_number,
            lines: &lines,
            subtotal: &subtotal,
            discount: discount.as_deref(),
            shipping: &shipping,
            total: &total,
            order_url: &order_url,
        }
        .render()?;
        let text = OrderConfirmationText {
            order_number: &order_number,
            lines: &lines,
            subtotal: &subtotal,
            discount: discount.as_deref(),
            shipping: &shipping,
            total: &total,
            order_url: &order_url,
        }
        .render()?;

        self.send_multipart_email(
            &order.email,
            &format!("Order #{order_number} confirmed"),
            &text,
            &html,
        )
        .await
    }

    /// Send a shipping notification with tracking details.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    #[instrument(skip(self, order), fields(order_id = %order.id))]
    pub async fn send_shipping_update(&self, order: &Order) -> Result<(), EmailError> {
        let order_number = order.id.to_string();
        let html = ShippingUpdateHtml {
            order_number: &order_number,
            carrier: order.carrier.as_deref(),
            tracking_number: order.tracking_number.as_deref(),
            tracking_url: order.tracking_url.as_deref(),
        }
        .render()?;
        let text = ShippingUpdateText {
            order_number: &order_number,
            carrier: order.carrier.as_deref(),
            tracking_number: order.tracking_number.as_deref(),
            tracking_url: order.tracking_url.as_deref(),
        }
        .render()?;

        self.send_multipart_email(
            &order.email,
            &format!("Order #{order_number} has shipped"),
            &text,
            &html,
        )
        .await
    }

    /// Remind a customer about a checkout they didn't finish.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    #[instrument(skip(self, to, cart))]
    pub async fn send_abandoned_checkout(&self, to: &str, cart: &PricedCart) -> Result<(), EmailError> {
        let lines: Vec<EmailLine> = cart
            .lines
            .iter()
            .map(|l| EmailLine {
                name: format!("{} ({})", l.product_name, l.variant_name),
                quantity: i64::from(l.quantity),
                amount: format_amount(l.line_total, &cart.currency),
            })
            .collect();
        let total = format_amount(cart.totals.total, &cart.currency);
        let cart_url = format!("{}/cart", self.base_url);

        let html = AbandonedCheckoutHtml {
            lines: &lines,
            total: &total,
            cart_url: &cart_url,
        }
        .render()?;
        let text = AbandonedCheckoutText {
            lines: &lines,
            total: &total,
            cart_url: &cart_url,
        }
        .render()?;

        self.send_multipart_email(to, "You left something in your cart", &text, &html)
            .await
    }

    /// Ask a customer to review what they bought.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    #[instrument(skip(self, order, products), fields(order_id = %order.id))]
    pub async fn send_review_request(
        &self,
        order: &Order,
        products: &[ReviewLink],
    ) -> Result<(), EmailError> {
        let order_number = order.id.to_string();
        let html = ReviewRequestHtml {
            order_number: &order_number,
            products,
        }
        .render()?;
        let text = ReviewRequestText {
            order_number: &order_number,
            products,
        }
        .render()?;

        self.send_multipart_email(&order.email, "How was your order?", &text, &html)
            .await
    }

    /// Send a welcome email after registration.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    #[instrument(skip(self, to, name, referral_code))]
    pub async fn send_welcome(
        &self,
        to: &str,
        name: &str,
        referral_code: &str,
    ) -> Result<(), EmailError> {
        let referral_url = self.referral_url(referral_code);
        let shop_url = format!("{}/", self.base_url);
        let html = WelcomeHtml {
            name,
            referral_url: &referral_url,
            shop_url: &shop_url,
        }
        .render()?;
        let text = WelcomeText {
            name,
            referral_url: &referral_url,
            shop_url: &shop_url,
        }
        .render()?;

        self.send_multipart_email(to, "Welcome to Printshop", &text, &html)
            .await
    }

    /// Public link that pre-fills a referral code at registration.
    #[must_use]
    pub fn referral_url(&self, code: &str) -> String {
        format!("{}/register?ref={}", self.base_url, urlencoding::encode(code))
    }

    /// Send a multipart email with both plain text and HTML versions.
    async fn send_multipart_email(
        &self,
        to: &str,
        subject: &str,
        text_body: &str,
        html_body: &str,
    ) -> Result<(), EmailError> {
        let Some(mailer) = &self.mailer else {
            debug!(subject = %subject, "Email disabled, message not sent");
            return Ok(());
        };

        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .parse()
                .map_err(|_| EmailError::InvalidAddress(to.to_string()))?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text_body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body.to_string()),
                    ),
            )?;

        mailer.send(email).await?;

        info!(subject = %subject, "Email sent");
        Ok(())
    }
}

/// Format an amount in the given ISO currency, e.g. `$19.99`.
///
/// Unknown currencies fall back to the code as a suffix.
#[must_use]
pub fn format_amount(amount: Decimal, currency: &str) -> String {
    currency.parse::<CurrencyCode>().map_or_else(
        |_| format!("{:.2} {currency}", amount.round_dp(2)),
        |code| Price::new(amount, code).display(),
    )
}
