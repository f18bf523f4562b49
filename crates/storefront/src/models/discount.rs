//! Discount codes.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use printshop_core::{DiscountId, DiscountKind};

/// Why a discount code cannot be applied right now.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiscountRejection {
    #[error("discount code is not valid")]
    Unknown,
    #[error("discount code is no longer active")]
    Inactive,
    #[error("discount code is not active yet")]
    NotStarted,
    #[error("discount code has expired")]
    Expired,
    #[error("discount code has reached its usage limit")]
    UsageExhausted,
    #[error("order subtotal must be at least {0} to use this code")]
    BelowMinimum(Decimal),
}

/// A discount code row.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Discount {
    pub id: DiscountId,
    pub code: String,
    pub kind: DiscountKind,
    pub value: Decimal,
    pub min_subtotal: Option<Decimal>,
    pub max_uses: Option<i32>,
    pub times_used: i32,
    pub starts_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Effect of a discount on an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscountEffect {
    /// Amount taken off the merchandise subtotal.
    pub discount_total: Decimal,
    /// Shipping after the discount.
    pub shipping_total: Decimal,
}

impl Discount {
    /// Check whether the code may be used for `subtotal` at `now`.
    ///
    /// # Errors
    ///
    /// Returns the first reason the code does not apply.
    pub fn check(&self, subtotal: Decimal, now: DateTime<Utc>) -> Result<(), DiscountRejection> {
        if !self.is_active {
            return Err(DiscountRejection::Inactive);
        }
        if self.starts_at.is_some_and(|s| now < s) {
            return Err(DiscountRejection::NotStarted);
        }
        if self.expires_at.is_some_and(|e| now >= e) {
            return Err(DiscountRejection::Expired);
        }
        if self.max_uses.is_some_and(|max| self.times_used >= max) {
            return Err(DiscountRejection::UsageExhausted);
        }
        if let Some(min) = self.min_subtotal
            && subtotal < min
        {
            return Err(DiscountRejection::BelowMinimum(min));
        }
        Ok(())
    }

    /// Amounts after applying the discount. The discount never exceeds the
    /// subtotal.
    #[must_use]
    pub fn apply(&self, subtotal: Decimal, shipping: Decimal) -> DiscountEffect {
        match self.kind {
            DiscountKind::Percentage => {
                let pct = self.value.clamp(Decimal::ZERO, Decimal::ONE_HUNDRED);
                let off = (subtotal * pct / Decimal::ONE_HUNDRED)
                    .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
                DiscountEffect {
                    discount_total: off.min(subtotal),
                    shipping_total: shipping,
                }
            }
            DiscountKind::FixedAmount => DiscountEffect {
                discount_total: self.value.max(Decimal::ZERO).min(subtotal),
                shipping_total: shipping,
            },
            DiscountKind::FreeShipping => DiscountEffect {
                discount_total: Decimal::ZERO,
                shipping_total: Decimal::ZERO,
            },
        }
    }
}

/// Canonical form of a discount code: trimmed and upper-cased.
#[must_use]
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Admin input for creating or updating a discount.
#[derive(Debug, Clone, Deserialize)]
pub struct DiscountInput {
    pub code: String,
    pub kind: DiscountKind,
    #[serde(default)]
    pub value: Decimal,
    pub min_subtotal: Option<Decimal>,
    pub max_uses: Option<i32>,
    pub starts_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

const fn default_true() -> bool {
    true
}

impl DiscountInput {
    /// Validate and normalize the input.
    ///
    /// # Errors
    ///
    /// Returns a client-facing message describing the first problem found.
    pub fn validate(mut self) -> Result<Self, String> {
        self.code = normalize_code(&self.code);
        if !(3..=32).contains(&self.code.len())
            || !self
                .code
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(
                "code must be 3-32 characters of letters, digits, '-' or '_'".to_string(),
            );
        }

        match self.kind {
            DiscountKind::Percentage => {
                if self.value < Decimal::ONE || self.value > Decimal::ONE_HUNDRED {
                    return Err("percentage must be between 1 and 100".to_string());
                }
            }
            DiscountKind::FixedAmount => {
                if self.value <= Decimal::ZERO {
                    return Err("amount must be positive".to_string());
                }
            }
            DiscountKind::FreeShipping => self.value = Decimal::ZERO,
        }

        if self.min_subtotal.is_some_and(|m| m < Decimal::ZERO) {
            return Err("minimum subtotal must not be negative".to_string());
        }
        if self.max_uses.is_some_and(|m| m <= 0) {
            return Err("max uses must be positive".to_string());
        }
        if let (Some(start), Some(end)) = (self.starts_at, self.expires_at)
            && end <= start
        {
            return Err("expiry must be after start".to_string());
        }

        Ok(self)
    }
}
