//! Order reconciliation and fulfillment.
//!
//! A paid Stripe checkout becomes exactly one order row (the unique key on
//! `orders.stripe_session_id` makes webhook redeliveries no-ops), which is
//! then submitted to Printful. Printful webhooks move the order through the
//! rest of its lifecycle.
//!
//! Errors before the order row exists are returned so the webhook responds
//! non-2xx and Stripe retries. Once the row exists, Printful failures are
//! recorded on it instead and an admin can resubmit. If even that record
//! cannot be written, the order stays `paid` without a Printful id and the
//! next delivery of the same event resumes the submission.

use chrono::{DateTime, TimeDelta, Utc};
use sqlx::PgPool;
use thiserror::Error;
use tracing::{error, info, instrument, warn};

use printshop_core::{OrderId, OrderStatus, UserId};

use crate::config::StorefrontConfig;
use crate::db::{CheckoutSessionRepository, OrderRepository, RepositoryError, UserRepository};
use crate::models::order::{
    NewOrder, NewOrderItem, Order, OrderItem, Shipment, parse_external_id,
};
use crate::services::badges::BadgeService;
use crate::services::email::{EmailService, format_amount};
use crate::services::printful::types::{OrderItem as PrintfulItem, Recipient, RetailCosts};
use crate::services::printful::{
    NewPrintfulOrder, PrintfulClient, WebhookEvent, events, order_status_from_printful,
};
use crate::services::push::{PushClient, PushMessage};
use crate::services::stripe::CheckoutSessionObject;

/// Errors from reconciliation and order state changes.
#[derive(Debug, Error)]
pub enum FulfillmentError {
    /// No local record of the Stripe session; the webhook should be retried.
    #[error("unknown checkout session: {0}")]
    UnknownCheckoutSession(String),

    /// The checkout snapshot holds no purchasable lines.
    #[error("checkout session {0} has an empty cart")]
    EmptyCart(String),

    /// Neither Stripe nor the session row has a customer email.
    #[error("checkout session {0} has no customer email")]
    MissingEmail(String),

    /// Order does not exist.
    #[error("order not found")]
    OrderNotFound,

    /// The requested status change is not allowed.
    #[error("cannot move order from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// Printful rejected a resubmission; the error is recorded on the order.
    #[error("Printful submission failed: {0}")]
    SubmissionFailed(String),

    /// The order exists but no submission outcome is recorded yet. Stripe
    /// redelivers, and the redelivery resumes it.
    #[error("order {0} is awaiting submission")]
    SubmissionPending(OrderId),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Result of handling a paid checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// A new order was created; carries the submission result.
    Created {
        order_id: OrderId,
        submission: Submission,
    },
    /// An order for this session was left unsubmitted and has now been
    /// submitted.
    Resumed {
        order_id: OrderId,
        submission: Submission,
    },
    /// An order for this session already exists and was handled.
    Duplicate,
}

/// Seconds a new order may stay unsubmitted before a redelivered event
/// takes over; younger orders are assumed to be mid-submission.
pub const SUBMISSION_GRACE_SECS: i64 = 120;

/// What a redelivered checkout event does with the existing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Redelivery {
    /// Submission outcome already recorded.
    Handled,
    /// Still `paid` with no Printful order after the grace period.
    Resume,
    /// Still `paid` but recent; ask Stripe to come back later.
    Wait,
}

/// Decide how a redelivered checkout event treats `order`.
#[must_use]
pub fn redelivery_action(order: &Order, now: DateTime<Utc>) -> Redelivery {
    if order.status != OrderStatus::Paid || order.printful_order_id.is_some() {
        Redelivery::Handled
    } else if now.signed_duration_since(order.created_at)
        < TimeDelta::seconds(SUBMISSION_GRACE_SECS)
    {
        Redelivery::Wait
    } else {
        Redelivery::Resume
    }
}

/// Result of sending an order to Printful.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    Submitted { printful_order_id: i64 },
    Failed { error: String },
}

/// Result of applying a Printful webhook event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    Applied { order_id: OrderId, status: OrderStatus },
    Ignored(&'static str),
}

/// Reconciles payments into orders and drives fulfillment.
pub struct FulfillmentService<'a> {
    pool: &'a PgPool,
    config: &'a StorefrontConfig,
    printful: &'a PrintfulClient,
    email: &'a EmailService,
    push: &'a PushClient,
}

impl<'a> FulfillmentService<'a> {
    #[must_use]
    pub const fn new(
        pool: &'a PgPool,
        config: &'a StorefrontConfig,
        printful: &'a PrintfulClient,
        email: &'a EmailService,
        push: &'a PushClient,
    ) -> Self {
        Self {
            pool,
            config,
            printful,
            email,
            push,
        }
    }

    // =========================================================================
    // Stripe checkout -> order
    // =========================================================================

    /// Turn a paid Checkout Session into an order and submit it to Printful.
    ///
    /// A redelivered event for an order that never got a recorded
    /// submission resumes it; otherwise redeliveries do nothing.
    ///
    /// # Errors
    ///
    /// Returns an error when no order row could be written, or
    /// `SubmissionPending` when the row exists but its Printful outcome could
    /// not be recorded. Either way the caller should answer non-2xx so Stripe
    /// redelivers.
    #[instrument(skip(self, session), fields(session_id = %session.id))]
    pub async fn reconcile_checkout(
        &self,
        session: &CheckoutSessionObject,
    ) -> Result<ReconcileOutcome, FulfillmentError> {
        let checkout = CheckoutSessionRepository::new(self.pool)
            .get(&session.id)
            .await?
            .ok_or_else(|| FulfillmentError::UnknownCheckoutSession(session.id.clone()))?;

        let user_id = checkout.user_id.or_else(|| {
            session
                .metadata
                .get("user_id")
                .and_then(|id| id.parse::<i32>().ok())
                .map(UserId::new)
        });
        let email = session
            .email()
            .map(str::to_string)
            .or(checkout.email)
            .ok_or_else(|| FulfillmentError::MissingEmail(session.id.clone()))?;

        let new_order = new_order_from_checkout(session, checkout.cart.0, user_id, email)?;

        let Some(order) = OrderRepository::new(self.pool)
            .create_from_checkout(&new_order)
            .await?
        else {
            return self.redelivered(&session.id).await;
        };
        info!(order_id = %order.id, total = %order.total, "Order created");

        let submission = self.fulfill(&order).await?;
        Ok(ReconcileOutcome::Created {
            order_id: order.id,
            submission,
        })
    }

    /// Handle a checkout event whose order row already exists.
    async fn redelivered(&self, session_id: &str) -> Result<ReconcileOutcome, FulfillmentError> {
        let Some(order) = OrderRepository::new(self.pool)
            .get_by_stripe_session(session_id)
            .await?
        else {
            return Ok(ReconcileOutcome::Duplicate);
        };

        match redelivery_action(&order, Utc::now()) {
            Redelivery::Handled => {
                info!(order_id = %order.id, "Order already exists for checkout session, skipping");
                Ok(ReconcileOutcome::Duplicate)
            }
            Redelivery::Wait => {
                info!(order_id = %order.id, "Order is still being submitted, deferring redelivery");
                Err(FulfillmentError::SubmissionPending(order.id))
            }
            Redelivery::Resume => {
                warn!(order_id = %order.id, "Resuming submission of an unsubmitted order");
                let submission = self.fulfill(&order).await?;
                Ok(ReconcileOutcome::Resumed {
                    order_id: order.id,
                    submission,
                })
            }
        }
    }

    /// Submit a stored `paid` order, then send the confirmation, pushes and
    /// badges.
    ///
    /// Side effects only run once the submission outcome is on the row, so
    /// a resumed order never gets a second confirmation.
    async fn fulfill(&self, order: &Order) -> Result<Submission, FulfillmentError> {
        let items = match OrderRepository::new(self.pool).items(order.id).await {
            Ok(items) => items,
            Err(e) => {
                error!(order_id = %order.id, error = %e, "Failed to load order items");
                return Err(FulfillmentError::SubmissionPending(order.id));
            }
        };

        let submission = match self.submit(order, &items).await {
            Ok(submission) => submission,
            Err(e) => {
                error!(order_id = %order.id, error = %e, "Failed to record Printful submission");
                return Err(FulfillmentError::SubmissionPending(order.id));
            }
        };

        self.after_order_created(order, &items).await;
        Ok(submission)
    }

    /// Send an order to Printful and record the result on the row.
    async fn submit(&self, order: &Order, items: &[OrderItem]) -> Result<Submission, RepositoryError> {
        let orders = OrderRepository::new(self.pool);

        let result = match build_printful_order(order, items) {
            Ok(request) => self
                .printful
                .create_order(&request, self.config.printful.auto_confirm)
                .await
                .map_err(|e| e.to_string()),
            Err(e) => Err(e),
        };

        match result {
            Ok(created) => {
                orders.set_submitted(order.id, order.status, created.id).await?;
                info!(order_id = %order.id, printful_order_id = created.id, "Order submitted to Printful");
                Ok(Submission::Submitted {
                    printful_order_id: created.id,
                })
            }
            Err(error) => {
                orders
                    .set_fulfillment_failed(order.id, order.status, &error)
                    .await?;
                warn!(order_id = %order.id, error = %error, "Printful submission failed");
                self.push
                    .notify_admins(
                        self.pool,
                        &PushMessage::new(
                            format!("Order #{} needs attention", order.id),
                            format!("Printful submission failed: {error}"),
                        ),
                    )
                    .await;
                Ok(Submission::Failed { error })
            }
        }
    }

    /// Confirmation email, admin push and badges. Failures are logged only.
    async fn after_order_created(&self, order: &Order, items: &[OrderItem]) {
        if let Err(e) = self.email.send_order_confirmation(order, items).await {
            warn!(order_id = %order.id, error = %e, "Failed to send order confirmation");
        }

        let message = PushMessage::new(
            format!("New order #{}", order.id),
            format!(
                "{} item(s), {}",
                items.iter().map(|i| i64::from(i.quantity)).sum::<i64>(),
                format_amount(order.total, &order.currency)
            ),
        )
        .with_url(self.config.url_for(&format!("/admin/orders/{}", order.id)));
        self.push.notify_admins(self.pool, &message).await;

        let Some(user_id) = order.user_id else {
            return;
        };
        let badges = BadgeService::new(self.pool, self.push);
        badges.refresh(user_id).await;

        match UserRepository::new(self.pool).get_by_id(user_id).await {
            Ok(Some(user)) => {
                if let Some(referrer) = user.referred_by {
                    badges.refresh(referrer).await;
                }
            }
            Ok(None) => {}
            Err(e) => warn!(user_id = %user_id, error = %e, "Failed to load buyer for referral badge"),
        }
    }

    // =========================================================================
    // Admin actions
    // =========================================================================

    /// Resubmit an order whose Printful submission failed.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` unless the order is in
    /// `fulfillment_failed`, and `SubmissionFailed` if Printful rejects it
    /// again.
    #[instrument(skip(self))]
    pub async fn resubmit(&self, id: OrderId) -> Result<Order, FulfillmentError> {
        let orders = OrderRepository::new(self.pool);
        let order = orders.get(id).await?.ok_or(FulfillmentError::OrderNotFound)?;
        if order.status != OrderStatus::FulfillmentFailed {
            return Err(FulfillmentError::InvalidTransition {
                from: order.status,
                to: OrderStatus::Submitted,
            });
        }

        let items = orders.items(id).await?;
        let submission = self.submit(&order, &items).await?;
        if let Submission::Failed { error } = submission {
            return Err(FulfillmentError::SubmissionFailed(error));
        }

        orders.get(id).await?.ok_or(FulfillmentError::OrderNotFound)
    }

    /// Manual status change from the admin panel.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` for edges the lifecycle does not allow,
    /// including a concurrent change that got there first.
    #[instrument(skip(self))]
    pub async fn set_status(&self, id: OrderId, to: OrderStatus) -> Result<Order, FulfillmentError> {
        let orders = OrderRepository::new(self.pool);
        let order = orders.get(id).await?.ok_or(FulfillmentError::OrderNotFound)?;
        let from = order.status;
        if !from.can_transition_to(to) || !orders.transition(id, from, to).await? {
            return Err(FulfillmentError::InvalidTransition { from, to });
        }
        info!(order_id = %id, from = %from, to = %to, "Order status changed by admin");
        orders.get(id).await?.ok_or(FulfillmentError::OrderNotFound)
    }

    // =========================================================================
    // Printful webhooks
    // =========================================================================

    /// Apply a Printful webhook event to the order it refers to.
    ///
    /// Unknown orders and disallowed transitions are ignored, not errors, so
    /// Printful stops redelivering them.
    ///
    /// # Errors
    ///
    /// Returns `Repository` if a query fails.
    #[instrument(skip(self, event), fields(kind = %event.kind))]
    pub async fn apply_printful_event(
        &self,
        event: &WebhookEvent,
    ) -> Result<EventOutcome, FulfillmentError> {
        let Some(target) = target_status(event) else {
            return Ok(EventOutcome::Ignored("event type not handled"));
        };
        let Some(id) = event.external_id().and_then(parse_external_id) else {
            return Ok(EventOutcome::Ignored("no order reference"));
        };

        let orders = OrderRepository::new(self.pool);
        let Some(order) = orders.get(id).await? else {
            warn!(order_id = %id, "Printful event for unknown order");
            return Ok(EventOutcome::Ignored("unknown order"));
        };

        if order.status == target {
            return Ok(EventOutcome::Ignored("already in status"));
        }
        if !order.status.can_transition_to(target) {
            warn!(order_id = %id, from = %order.status, to = %target, "Ignoring disallowed transition");
            return Ok(EventOutcome::Ignored("transition not allowed"));
        }

        let updated = match target {
            OrderStatus::Shipped => {
                let shipment = event
                    .data
                    .shipment
                    .as_ref()
                    .map(|s| Shipment {
                        tracking_number: s.tracking_number(),
                        tracking_url: s.tracking_url.clone(),
                        carrier: s.carrier.clone(),
                    })
                    .unwrap_or_default();
                orders.set_shipped(id, order.status, &shipment).await?
            }
            OrderStatus::FulfillmentFailed => {
                let reason = event
                    .data
                    .reason
                    .as_deref()
                    .unwrap_or("Printful reported the order as failed");
                orders.set_fulfillment_failed(id, order.status, reason).await?
            }
            _ => orders.transition(id, order.status, target).await?,
        };

        if !updated {
            return Ok(EventOutcome::Ignored("order changed concurrently"));
        }
        info!(order_id = %id, from = %order.status, to = %target, "Order status updated from Printful");

        if target == OrderStatus::Shipped {
            self.notify_shipped(id).await;
        }

        Ok(EventOutcome::Applied {
            order_id: id,
            status: target,
        })
    }

    async fn notify_shipped(&self, id: OrderId) {
        let order = match OrderRepository::new(self.pool).get(id).await {
            Ok(Some(order)) => order,
            Ok(None) => return,
            Err(e) => {
                warn!(order_id = %id, error = %e, "Failed to reload shipped order");
                return;
            }
        };

        if let Err(e) = self.email.send_shipping_update(&order).await {
            warn!(order_id = %id, error = %e, "Failed to send shipping email");
        }

        if let Some(user_id) = order.user_id {
            let mut message = PushMessage::new(
                format!("Order #{id} has shipped"),
                "Your order is on its way.",
            );
            if let Some(url) = &order.tracking_url {
                message = message.with_url(url.clone());
            }
            self.push.notify_user(self.pool, user_id, &message).await;
        }
    }
}

/// Order row data from a paid session and its cart snapshot.
fn new_order_from_checkout(
    session: &CheckoutSessionObject,
    cart: crate::models::cart::PricedCart,
    user_id: Option<UserId>,
    email: String,
) -> Result<NewOrder, FulfillmentError> {
    if cart.is_empty() {
        return Err(FulfillmentError::EmptyCart(session.id.clone()));
    }

    let (shipping_name, shipping_address) = session.shipping_address();
    let discount_code = cart
        .discount_code
        .filter(|_| cart.discount_error.is_none() && !cart.totals.discount_total.is_zero());

    let items = cart
        .lines
        .into_iter()
        .map(|l| NewOrderItem {
            product_id: l.product_id,
            variant_id: l.variant_id,
            product_name: l.product_name,
            variant_name: l.variant_name,
            quantity: i32::try_from(l.quantity).unwrap_or(i32::MAX),
            unit_price: l.unit_price,
            printful_variant_id: l.printful_variant_id,
        })
        .collect();

    Ok(NewOrder {
        stripe_session_id: session.id.clone(),
        stripe_payment_intent: session.payment_intent.clone(),
        user_id,
        email,
        currency: cart.currency,
        subtotal: cart.totals.subtotal,
        discount_total: cart.totals.discount_total,
        shipping_total: cart.totals.shipping_total,
        total: cart.totals.total,
        discount_code,
        shipping_name,
        shipping_address,
        items,
    })
}

/// Printful order request for an order and its lines.
///
/// # Errors
///
/// Returns a message when a line has no Printful variant or the address is
/// incomplete.
pub fn build_printful_order(
    order: &Order,
    items: &[OrderItem],
) -> Result<NewPrintfulOrder, String> {
    let address = &order.shipping_address.0;
    if address.line1.is_empty() || address.country.is_empty() {
        return Err("shipping address is incomplete".to_string());
    }
    if items.is_empty() {
        return Err("order has no lines".to_string());
    }

    let items = items
        .iter()
        .map(|item| {
            let sync_variant_id = item.printful_variant_id.ok_or_else(|| {
                format!(
                    "{} ({}) is not linked to a Printful variant",
                    item.product_name, item.variant_name
                )
            })?;
            Ok(PrintfulItem {
                sync_variant_id,
                quantity: item.quantity,
                retail_price: item.unit_price,
                name: format!("{} - {}", item.product_name, item.variant_name),
            })
        })
        .collect::<Result<Vec<_>, String>>()?;

    Ok(NewPrintfulOrder {
        external_id: order.external_id(),
        recipient: Recipient {
            name: order.shipping_name.clone(),
            address1: address.line1.clone(),
            address2: address.line2.clone(),
            city: address.city.clone(),
            state_code: address.state.clone(),
            country_code: address.country.clone(),
            zip: address.postal_code.clone(),
            phone: address.phone.clone(),
            email: order.email.clone(),
        },
        items,
        retail_costs: RetailCosts {
            currency: order.currency.clone(),
            subtotal: order.subtotal,
            discount: order.discount_total,
            shipping: order.shipping_total,
            total: order.total,
        },
    })
}

/// The status a Printful event moves an order to, if any.
#[must_use]
pub fn target_status(event: &WebhookEvent) -> Option<OrderStatus> {
    match event.kind.as_str() {
        events::PACKAGE_SHIPPED => Some(OrderStatus::Shipped),
        events::PACKAGE_RETURNED => Some(OrderStatus::Returned),
        events::ORDER_FAILED => Some(OrderStatus::FulfillmentFailed),
        events::ORDER_CANCELED => Some(OrderStatus::Canceled),
        events::ORDER_PUT_HOLD => Some(OrderStatus::OnHold),
        events::ORDER_REMOVE_HOLD => Some(OrderStatus::InProduction),
        events::ORDER_UPDATED => event
            .data
            .order
            .as_ref()
            .and_then(|o| o.status.as_deref())
            .and_then(order_status_from_printful),
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{TimeDelta, Utc};
    use rust_decimal::Decimal;
    use sqlx::types::Json;

    use printshop_core::{OrderItemId, ProductId, VariantId};

    use super::*;
    use crate::models::cart::{CartTotals, PricedCart, PricedLine};
    use crate::models::order::ShippingAddress;

    fn order() -> Order {
        Order {
            id: OrderId::new(12),
            stripe_session_id: "cs_test_1".to_string(),
            stripe_payment_intent: Some("pi_1".to_string()),
            user_id: None,
            email: "ana@example.com".to_string(),
            status: OrderStatus::Paid,
            currency: "USD".to_string(),
            subtotal: Decimal::new(5000, 2),
            discount_total: Decimal::new(500, 2),
            shipping_total: Decimal::new(500, 2),
            total: Decimal::new(5000, 2),
            discount_code: Some("SAVE".to_string()),
            shipping_name: "Ana Lima".to_string(),
            shipping_address: Json(ShippingAddress {
                line1: "1 Main St".to_string(),
                line2: None,
                city: "Austin".to_string(),
                state: Some("TX".to_string()),
                postal_code: "78701".to_string(),
                country: "US".to_string(),
                phone: None,
            }),
            printful_order_id: None,
            tracking_number: None,
            tracking_url: None,
            carrier: None,
            fulfillment_error: None,
            shipped_at: None,
            review_request_sent_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn item(printful_variant_id: Option<i64>) -> OrderItem {
        OrderItem {
            id: OrderItemId::new(1),
            order_id: OrderId::new(12),
            product_id: Some(ProductId::new(3)),
            variant_id: Some(VariantId::new(4)),
            product_name: "Logo Tee".to_string(),
            variant_name: "Black / M".to_string(),
            quantity: 2,
            unit_price: Decimal::new(2500, 2),
            printful_variant_id,
        }
    }

    fn session(json: serde_json::Value) -> CheckoutSessionObject {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_build_printful_order() {
        let request = build_printful_order(&order(), &[item(Some(4001))]).unwrap();
        assert_eq!(request.external_id, "order-12");
        assert_eq!(request.recipient.zip, "78701");
        assert_eq!(request.items[0].sync_variant_id, 4001);
        assert_eq!(request.items[0].quantity, 2);
        assert_eq!(request.retail_costs.discount, Decimal::new(500, 2));
    }

    #[test]
    fn test_build_printful_order_requires_linked_variants() {
        let err = build_printful_order(&order(), &[item(None)]).unwrap_err();
        assert!(err.contains("Logo Tee"));
    }

    #[test]
    fn test_build_printful_order_requires_address() {
        let mut o = order();
        o.shipping_address.0.line1.clear();
        assert!(build_printful_order(&o, &[item(Some(1))]).is_err());
    }

    #[test]
    fn test_build_printful_order_requires_lines() {
        assert_eq!(
            build_printful_order(&order(), &[]).unwrap_err(),
            "order has no lines"
        );
    }

    #[test]
    fn test_new_order_from_checkout() {
        let session = session(serde_json::json!({
            "id": "cs_test_9",
            "payment_status": "paid",
            "payment_intent": "pi_9",
            "shipping_details": {"name": "Bo", "address": {"line1": "2 Side Rd", "city": "Leeds",
                                                          "postal_code": "LS1", "country": "GB"}}
        }));
        let cart = PricedCart {
            lines: vec![PricedLine {
                variant_id: VariantId::new(4),
                product_id: ProductId::new(3),
                product_slug: "logo-tee".to_string(),
                product_name: "Logo Tee".to_string(),
                variant_name: "Black / M".to_string(),
                image_url: None,
                quantity: 2,
                unit_price: Decimal::new(2500, 2),
                line_total: Decimal::new(5000, 2),
                printful_variant_id: Some(4001),
            }],
            discount_code: Some("EXPIRED".to_string()),
            discount_error: Some("discount code has expired".to_string()),
            totals: CartTotals {
                subtotal: Decimal::new(5000, 2),
                discount_total: Decimal::ZERO,
                shipping_total: Decimal::ZERO,
                total: Decimal::new(5000, 2),
            },
            currency: "USD".to_string(),
        };

        let new = new_order_from_checkout(&session, cart, None, "bo@example.com".to_string())
            .unwrap();
        assert_eq!(new.stripe_payment_intent.as_deref(), Some("pi_9"));
        assert_eq!(new.shipping_name, "Bo");
        assert_eq!(new.items.len(), 1);
        // A rejected code is not recorded or counted
        assert!(new.discount_code.is_none());
    }

    #[test]
    fn test_empty_cart_is_an_error() {
        let session = session(serde_json::json!({"id": "cs_empty", "payment_status": "paid"}));
        let cart = PricedCart {
            lines: vec![],
            discount_code: None,
            discount_error: None,
            totals: CartTotals::default(),
            currency: "USD".to_string(),
        };
        assert!(matches!(
            new_order_from_checkout(&session, cart, None, String::new()),
            Err(FulfillmentError::EmptyCart(_))
        ));
    }

    #[test]
    fn test_target_status() {
        let event = |json: serde_json::Value| -> WebhookEvent { serde_json::from_value(json).unwrap() };

        let shipped = event(serde_json::json!({"type": "package_shipped", "store": 1}));
        assert_eq!(target_status(&shipped), Some(OrderStatus::Shipped));

        let hold_removed = event(serde_json::json!({"type": "order_remove_hold", "store": 1}));
        assert_eq!(target_status(&hold_removed), Some(OrderStatus::InProduction));

        let updated = event(serde_json::json!({
            "type": "order_updated", "store": 1,
            "data": {"order": {"id": 5, "external_id": "order-1", "status": "inprocess"}}
        }));
        assert_eq!(target_status(&updated), Some(OrderStatus::InProduction));

        let other = event(serde_json::json!({"type": "product_synced", "store": 1}));
        assert_eq!(target_status(&other), None);
    }

    #[test]
    fn test_redelivery_leaves_recorded_orders_alone() {
        let now = Utc::now();

        let mut submitted = order();
        submitted.status = OrderStatus::Submitted;
        submitted.printful_order_id = Some(9001);
        assert_eq!(redelivery_action(&submitted, now), Redelivery::Handled);

        let mut failed = order();
        failed.status = OrderStatus::FulfillmentFailed;
        failed.created_at = now - TimeDelta::hours(1);
        assert_eq!(redelivery_action(&failed, now), Redelivery::Handled);

        // Printful accepted it but the status write was lost.
        let mut linked = order();
        linked.printful_order_id = Some(9002);
        linked.created_at = now - TimeDelta::hours(1);
        assert_eq!(redelivery_action(&linked, now), Redelivery::Handled);
    }

    #[test]
    fn test_redelivery_resumes_stalled_paid_order() {
        let now = Utc::now();

        let mut stalled = order();
        stalled.created_at = now - TimeDelta::seconds(SUBMISSION_GRACE_SECS);
        assert_eq!(redelivery_action(&stalled, now), Redelivery::Resume);

        stalled.created_at = now - TimeDelta::days(3);
        assert_eq!(redelivery_action(&stalled, now), Redelivery::Resume);
    }

    #[test]
    fn test_redelivery_waits_for_fresh_order() {
        let now = Utc::now();

        let mut fresh = order();
        fresh.created_at = now - TimeDelta::seconds(SUBMISSION_GRACE_SECS - 1);
        assert_eq!(redelivery_action(&fresh, now), Redelivery::Wait);
    }
}
