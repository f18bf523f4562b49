//! Order repository.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use sqlx::types::Json;

use printshop_core::{OrderId, OrderStatus, ProductId, UserId};

use super::{RepositoryError, page_offset};
use crate::models::order::{
    DashboardStats, NewOrder, Order, OrderItem, OrderSummary, OrderWithItems,
    ReviewRequestCandidate, Shipment, StatusCount,
};

const ORDER_COLUMNS: &str = "id, stripe_session_id, stripe_payment_intent, user_id, email, status, \
                             currency, subtotal, discount_total, shipping_total, total, \
                             discount_code, shipping_name, shipping_address, printful_order_id, \
                             tracking_number, tracking_url, carrier, fulfillment_error, \
                             shipped_at, review_request_sent_at, created_at, updated_at";

const ITEM_COLUMNS: &str = "id, order_id, product_id, variant_id, product_name, variant_name, \
                            quantity, unit_price, printful_variant_id";

const SUMMARY_SELECT: &str = r"
    SELECT o.id, o.email, o.status, o.currency, o.total,
           COALESCE((SELECT SUM(i.quantity) FROM storefront.order_items i
                     WHERE i.order_id = o.id), 0)::INT8 AS item_count,
           o.created_at
    FROM storefront.orders o
";

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create a paid order from a completed checkout in one transaction.
    ///
    /// Also marks the checkout session completed and counts the discount
    /// use. Returns `None` if an order already exists for the session, so
    /// webhook redeliveries are harmless.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn create_from_checkout(&self, new: &NewOrder) -> Result<Option<Order>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let order = sqlx::query_as::<_, Order>(&format!(
            r"
            INSERT INTO storefront.orders
                (stripe_session_id, stripe_payment_intent, user_id, email, status, currency,
                 subtotal, discount_total, shipping_total, total, discount_code,
                 shipping_name, shipping_address)
            VALUES ($1, $2, $3, $4, 'paid', $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (stripe_session_id) DO NOTHING
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(&new.stripe_session_id)
        .bind(new.stripe_payment_intent.as_deref())
        .bind(new.user_id)
        .bind(&new.email)
        .bind(&new.currency)
        .bind(new.subtotal)
        .bind(new.discount_total)
        .bind(new.shipping_total)
        .bind(new.total)
        .bind(new.discount_code.as_deref())
        .bind(&new.shipping_name)
        .bind(Json(&new.shipping_address))
        .fetch_optional(&mut *tx)
        .await?;

        let Some(order) = order else {
            return Ok(None);
        };

        for item in &new.items {
            sqlx::query(
                r"
                INSERT INTO storefront.order_items
                    (order_id, product_id, variant_id, product_name, variant_name,
                     quantity, unit_price, printful_variant_id)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                ",
            )
            .bind(order.id)
            .bind(item.product_id)
            .bind(item.variant_id)
            .bind(&item.product_name)
            .bind(&item.variant_name)
            .bind(item.quantity)
            .bind(item.unit_price)
            .bind(item.printful_variant_id)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query(
            "UPDATE storefront.checkout_sessions SET status = 'completed' WHERE stripe_session_id = $1",
        )
        .bind(&new.stripe_session_id)
        .execute(&mut *tx)
        .await?;

        if let Some(code) = &new.discount_code {
            sqlx::query(
                "UPDATE storefront.discounts SET times_used = times_used + 1 WHERE code = $1",
            )
            .bind(code)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(Some(order))
    }

    /// Get an order by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM storefront.orders WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(order)
    }

    /// Get the order created from a Stripe checkout session.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_stripe_session(
        &self,
        stripe_session_id: &str,
    ) -> Result<Option<Order>, RepositoryError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM storefront.orders WHERE stripe_session_id = $1"
        ))
        .bind(stripe_session_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(order)
    }

    /// Lines of an order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn items(&self, order_id: OrderId) -> Result<Vec<OrderItem>, RepositoryError> {
        let items = sqlx::query_as::<_, OrderItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM storefront.order_items WHERE order_id = $1 ORDER BY id"
        ))
        .bind(order_id)
        .fetch_all(self.pool)
        .await?;

        Ok(items)
    }

    /// Get an order with its lines.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get_with_items(&self, id: OrderId) -> Result<Option<OrderWithItems>, RepositoryError> {
        let Some(order) = self.get(id).await? else {
            return Ok(None);
        };
        let items = self.items(id).await?;
        Ok(Some(OrderWithItems { order, items }))
    }

    /// Get one of a user's orders with its lines. Other users' orders are
    /// reported as missing.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get_for_user(
        &self,
        id: OrderId,
        user_id: UserId,
    ) -> Result<Option<OrderWithItems>, RepositoryError> {
        match self.get_with_items(id).await? {
            Some(o) if o.order.user_id == Some(user_id) => Ok(Some(o)),
            _ => Ok(None),
        }
    }

    /// A user's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<OrderSummary>, RepositoryError> {
        let orders = sqlx::query_as::<_, OrderSummary>(&format!(
            "{SUMMARY_SELECT} WHERE o.user_id = $1 ORDER BY o.created_at DESC, o.id DESC"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(orders)
    }

    /// All orders, newest first, optionally in one status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        status: Option<OrderStatus>,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<OrderSummary>, RepositoryError> {
        let orders = sqlx::query_as::<_, OrderSummary>(&format!(
            r"
            {SUMMARY_SELECT}
            WHERE ($1::TEXT IS NULL OR o.status = $1)
            ORDER BY o.created_at DESC, o.id DESC
            LIMIT $2 OFFSET $3
            "
        ))
        .bind(status)
        .bind(i64::from(per_page))
        .bind(page_offset(page, per_page))
        .fetch_all(self.pool)
        .await?;

        Ok(orders)
    }

    /// Move an order from `from` to `to`. Returns `false` if the order was
    /// no longer in `from`, which means another writer got there first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn transition(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE storefront.orders SET status = $3, updated_at = NOW()
            WHERE id = $1 AND status = $2
            ",
        )
        .bind(id)
        .bind(from)
        .bind(to)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Record a successful Printful submission.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn set_submitted(
        &self,
        id: OrderId,
        from: OrderStatus,
        printful_order_id: i64,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE storefront.orders
            SET status = 'submitted', printful_order_id = $3, fulfillment_error = NULL,
                updated_at = NOW()
            WHERE id = $1 AND status = $2
            ",
        )
        .bind(id)
        .bind(from)
        .bind(printful_order_id)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Record a failed Printful submission or a failure reported by Printful.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn set_fulfillment_failed(
        &self,
        id: OrderId,
        from: OrderStatus,
        error: &str,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE storefront.orders
            SET status = 'fulfillment_failed', fulfillment_error = $3, updated_at = NOW()
            WHERE id = $1 AND status = $2
            ",
        )
        .bind(id)
        .bind(from)
        .bind(error)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Record a shipment and move the order to shipped.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn set_shipped(
        &self,
        id: OrderId,
        from: OrderStatus,
        shipment: &Shipment,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE storefront.orders
            SET status = 'shipped', tracking_number = $3, tracking_url = $4, carrier = $5,
                shipped_at = NOW(), updated_at = NOW()
            WHERE id = $1 AND status = $2
            ",
        )
        .bind(id)
        .bind(from)
        .bind(shipment.tracking_number.as_deref())
        .bind(shipment.tracking_url.as_deref())
        .bind(shipment.carrier.as_deref())
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Whether a user has a purchased order containing the product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn user_purchased_product(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<bool, RepositoryError> {
        let purchased: bool = sqlx::query_scalar(
            r"
            SELECT EXISTS (
                SELECT 1
                FROM storefront.orders o
                JOIN storefront.order_items i ON i.order_id = o.id
                WHERE o.user_id = $1
                  AND i.product_id = $2
                  AND o.status NOT IN ('pending', 'canceled')
            )
            ",
        )
        .bind(user_id)
        .bind(product_id)
        .fetch_one(self.pool)
        .await?;

        Ok(purchased)
    }

    /// Orders due a review request: delivered, or shipped before
    /// `shipped_before`, not asked yet and with fewer than `max_attempts`
    /// failed sends.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn review_request_candidates(
        &self,
        shipped_before: DateTime<Utc>,
        max_attempts: i32,
        limit: i64,
    ) -> Result<Vec<ReviewRequestCandidate>, RepositoryError> {
        let candidates = sqlx::query_as::<_, ReviewRequestCandidate>(
            r"
            SELECT id, email, user_id
            FROM storefront.orders
            WHERE review_request_sent_at IS NULL
              AND review_request_attempts < $2
              AND (status = 'delivered'
                   OR (status = 'shipped' AND shipped_at < $1))
            ORDER BY id
            LIMIT $3
            ",
        )
        .bind(shipped_before)
        .bind(max_attempts)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(candidates)
    }

    /// Record that the review request went out.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn mark_review_request_sent(&self, id: OrderId) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE storefront.orders SET review_request_sent_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(())
    }

    /// Count a failed review request send.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn record_review_request_failure(&self, id: OrderId) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE storefront.orders SET review_request_attempts = review_request_attempts + 1 WHERE id = $1",
        )
        .bind(id)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Numbers for the admin dashboard.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn dashboard_stats(&self) -> Result<DashboardStats, RepositoryError> {
        let (orders_last_30_days, revenue_last_30_days): (i64, Decimal) = sqlx::query_as(
            r"
            SELECT COUNT(*), COALESCE(SUM(total), 0)
            FROM storefront.orders
            WHERE created_at > NOW() - INTERVAL '30 days'
              AND status NOT IN ('pending', 'canceled')
            ",
        )
        .fetch_one(self.pool)
        .await?;

        let orders_by_status = sqlx::query_as::<_, StatusCount>(
            "SELECT status, COUNT(*) AS count FROM storefront.orders GROUP BY status ORDER BY status",
        )
        .fetch_all(self.pool)
        .await?;

        let pending_reviews: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM storefront.reviews WHERE status = 'pending'")
                .fetch_one(self.pool)
                .await?;

        let failed_fulfillments = orders_by_status
            .iter()
            .find(|s| s.status == OrderStatus::FulfillmentFailed)
            .map_or(0, |s| s.count);

        Ok(DashboardStats {
            orders_last_30_days,
            revenue_last_30_days,
            orders_by_status,
            pending_reviews,
            failed_fulfillments,
        })
    }
}
