//! Scheduled customer reminders, driven by the cron endpoints.
//!
//! Each job works through one bounded batch per call. Rows are only marked
//! as handled after their email went out, so a failed send is retried on
//! the next run. Every failure is counted on the row and rows that reach
//! [`MAX_SEND_ATTEMPTS`] are left out of later batches.

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tracing::{info, instrument, warn};

use crate::config::StorefrontConfig;
use crate::db::{CheckoutSessionRepository, OrderRepository, ProductRepository, RepositoryError};
use crate::services::email::{EmailService, ReviewLink};

/// Checkout sessions older than this can never complete.
pub const CHECKOUT_MAX_AGE_HOURS: i64 = 48;

/// Failed sends after which a row is no longer picked up.
pub const MAX_SEND_ATTEMPTS: i32 = 3;

const BATCH_SIZE: i64 = 100;

/// Counts returned by a reminder job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct JobReport {
    pub processed: u32,
    pub sent: u32,
    pub failed: u32,
}

impl JobReport {
    fn record(&mut self, sent: bool) {
        self.processed += 1;
        if sent {
            self.sent += 1;
        } else {
            self.failed += 1;
        }
    }
}

/// Creation-time window `(older_than, newer_than)` for abandoned checkouts.
#[must_use]
pub fn abandoned_window(now: DateTime<Utc>, delay_minutes: i64) -> (DateTime<Utc>, DateTime<Utc>) {
    (
        now - TimeDelta::minutes(delay_minutes),
        now - TimeDelta::hours(CHECKOUT_MAX_AGE_HOURS),
    )
}

/// Runs the reminder jobs.
pub struct ReminderService<'a> {
    pool: &'a PgPool,
    config: &'a StorefrontConfig,
    email: &'a EmailService,
}

impl<'a> ReminderService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, config: &'a StorefrontConfig, email: &'a EmailService) -> Self {
        Self {
            pool,
            config,
            email,
        }
    }

    /// Email customers who left an open checkout behind.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the candidate query fails.
    #[instrument(skip(self))]
    pub async fn abandoned_checkouts(&self, now: DateTime<Utc>) -> Result<JobReport, RepositoryError> {
        let mut report = JobReport::default();
        if !self.email.is_enabled() {
            info!("Email disabled, skipping abandoned checkout reminders");
            return Ok(report);
        }

        let repo = CheckoutSessionRepository::new(self.pool);
        let (older_than, newer_than) =
            abandoned_window(now, self.config.reminders.abandoned_checkout_delay_minutes);
        let sessions = repo
            .abandoned(older_than, newer_than, MAX_SEND_ATTEMPTS, BATCH_SIZE)
            .await?;

        for session in sessions {
            let Some(email) = session.email.as_deref() else {
                continue;
            };
            let sent = match self.email.send_abandoned_checkout(email, &session.cart).await {
                Ok(()) => match repo.mark_reminder_sent(&session.stripe_session_id).await {
                    Ok(()) => true,
                    Err(e) => {
                        warn!(session = %session.stripe_session_id, error = %e, "Failed to record reminder");
                        false
                    }
                },
                Err(e) => {
                    warn!(session = %session.stripe_session_id, error = %e, "Abandoned checkout email failed");
                    false
                }
            };
            if !sent
                && let Err(e) = repo.record_reminder_failure(&session.stripe_session_id).await
            {
                warn!(session = %session.stripe_session_id, error = %e, "Failed to count reminder failure");
            }
            report.record(sent);
        }

        info!(?report, "Abandoned checkout reminders done");
        Ok(report)
    }

    /// Ask for reviews on delivered orders, or orders shipped long enough ago.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the candidate query fails.
    #[instrument(skip(self))]
    pub async fn review_requests(&self, now: DateTime<Utc>) -> Result<JobReport, RepositoryError> {
        let mut report = JobReport::default();
        if !self.email.is_enabled() {
            info!("Email disabled, skipping review requests");
            return Ok(report);
        }

        let orders = OrderRepository::new(self.pool);
        let shipped_before = now - TimeDelta::days(self.config.reminders.review_request_delay_days);
        let candidates = orders
            .review_request_candidates(shipped_before, MAX_SEND_ATTEMPTS, BATCH_SIZE)
            .await?;

        for candidate in candidates {
            let sent = match self.send_review_request(&orders, candidate.id).await {
                Ok(()) => true,
                Err(e) => {
                    warn!(order_id = %candidate.id, error = %e, "Review request failed");
                    if let Err(e) = orders.record_review_request_failure(candidate.id).await {
                        warn!(order_id = %candidate.id, error = %e, "Failed to count review request failure");
                    }
                    false
                }
            };
            report.record(sent);
        }

        info!(?report, "Review requests done");
        Ok(report)
    }

    async fn send_review_request(
        &self,
        orders: &OrderRepository<'_>,
        order_id: printshop_core::OrderId,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let order = orders
            .get_with_items(order_id)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        let products = ProductRepository::new(self.pool);
        let mut links: Vec<ReviewLink> = Vec::new();
        for item in &order.items {
            let Some(product_id) = item.product_id else {
                continue;
            };
            if links.iter().any(|l| l.name == item.product_name) {
                continue;
            }
            if let Some(product) = products.get_by_id(product_id).await? {
                links.push(ReviewLink {
                    name: item.product_name.clone(),
                    url: self.config.url_for(&format!("/products/{}#reviews", product.slug)),
                });
            }
        }

        // Nothing left to review: mark it so the order is not picked again
        if !links.is_empty() {
            self.email.send_review_request(&order.order, &links).await?;
        }
        orders.mark_review_request_sent(order_id).await?;
        Ok(())
    }

    /// Expire open checkout sessions that are too old to complete.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    #[instrument(skip(self))]
    pub async fn expire_checkouts(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let expired = CheckoutSessionRepository::new(self.pool)
            .expire_stale(now - TimeDelta::hours(CHECKOUT_MAX_AGE_HOURS))
            .await?;
        if expired > 0 {
            info!(expired, "Expired stale checkout sessions");
        }
        Ok(expired)
    }
}
