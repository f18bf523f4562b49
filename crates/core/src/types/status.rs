//! Status and role enums for storefront entities.
//!
//! Each enum maps to a `TEXT` column with a `CHECK` constraint and shares one
//! snake_case spelling across JSON, SQL and CLI arguments. The `string_enum!`
//! macro keeps those spellings in one place.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Generates `as_str`, `Display`, `FromStr` and (with `postgres`) the sqlx
/// `TEXT` codec for a snake_case string enum.
macro_rules! string_enum {
    ($name:ident, $label:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            /// The canonical snake_case spelling.
            #[must_use]
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    _ => Err(format!(concat!("invalid ", $label, ": {}"), s)),
                }
            }
        }

        #[cfg(feature = "postgres")]
        impl ::sqlx::Type<::sqlx::Postgres> for $name {
            fn type_info() -> ::sqlx::postgres::PgTypeInfo {
                <String as ::sqlx::Type<::sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &::sqlx::postgres::PgTypeInfo) -> bool {
                <String as ::sqlx::Type<::sqlx::Postgres>>::compatible(ty)
            }
        }

        #[cfg(feature = "postgres")]
        impl ::sqlx::Encode<'_, ::sqlx::Postgres> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut ::sqlx::postgres::PgArgumentBuffer,
            ) -> Result<::sqlx::encode::IsNull, ::sqlx::error::BoxDynError> {
                <&str as ::sqlx::Encode<::sqlx::Postgres>>::encode(self.as_str(), buf)
            }
        }

        #[cfg(feature = "postgres")]
        impl<'r> ::sqlx::Decode<'r, ::sqlx::Postgres> for $name {
            fn decode(
                value: ::sqlx::postgres::PgValueRef<'r>,
            ) -> Result<Self, ::sqlx::error::BoxDynError> {
                let s = <&str as ::sqlx::Decode<::sqlx::Postgres>>::decode(value)?;
                s.parse().map_err(Into::into)
            }
        }
    };
}

/// Lifecycle of a storefront order.
///
/// ```text
/// pending -> paid -> submitted -> in_production -> shipped -> delivered
///                 \-> fulfillment_failed -> submitted
/// paid | submitted | in_production -> on_hold -> submitted | in_production
/// paid | submitted | in_production | on_hold -> canceled
/// shipped -> returned
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Paid,
    Submitted,
    InProduction,
    Shipped,
    Delivered,
    FulfillmentFailed,
    OnHold,
    Canceled,
    Returned,
}

string_enum!(OrderStatus, "order status", {
    Pending => "pending",
    Paid => "paid",
    Submitted => "submitted",
    InProduction => "in_production",
    Shipped => "shipped",
    Delivered => "delivered",
    FulfillmentFailed => "fulfillment_failed",
    OnHold => "on_hold",
    Canceled => "canceled",
    Returned => "returned",
});

impl OrderStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [Self; 10] = [
        Self::Pending,
        Self::Paid,
        Self::Submitted,
        Self::InProduction,
        Self::Shipped,
        Self::Delivered,
        Self::FulfillmentFailed,
        Self::OnHold,
        Self::Canceled,
        Self::Returned,
    ];

    /// Whether moving from `self` to `next` is a permitted transition.
    ///
    /// Besides the main line, Printful may ship a `submitted` order directly,
    /// any live order can fail fulfillment and a failed order can be canceled.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        use OrderStatus::{
            Canceled, Delivered, FulfillmentFailed, InProduction, OnHold, Paid, Pending,
            Returned, Shipped, Submitted,
        };

        matches!(
            (self, next),
            (Pending, Paid)
                | (Paid, Submitted | FulfillmentFailed)
                | (FulfillmentFailed, Submitted | Canceled)
                | (Submitted, InProduction | Shipped | FulfillmentFailed)
                | (InProduction, Shipped | FulfillmentFailed)
                | (Shipped, Delivered | Returned)
                | (Paid | Submitted | InProduction, OnHold | Canceled)
                | (OnHold, Submitted | InProduction | Canceled)
        )
    }

    /// Whether no further transitions are possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Canceled | Self::Returned)
    }

    /// Whether the order counts as a purchase (for badges, verified reviews).
    #[must_use]
    pub const fn counts_as_purchase(self) -> bool {
        !matches!(self, Self::Pending | Self::Canceled)
    }
}

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Regular shopper.
    #[default]
    Customer,
    /// Full access to the admin API.
    Admin,
}

string_enum!(UserRole, "user role", {
    Customer => "customer",
    Admin => "admin",
});

/// How a discount code reduces the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountKind {
    /// `value` percent off the subtotal (1-100).
    Percentage,
    /// `value` off the subtotal, capped at the subtotal.
    FixedAmount,
    /// Shipping is free; `value` is ignored.
    FreeShipping,
}

string_enum!(DiscountKind, "discount kind", {
    Percentage => "percentage",
    FixedAmount => "fixed_amount",
    FreeShipping => "free_shipping",
});

/// Moderation state of a product review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    #[default]
    Pending,
    Approved,
    Hidden,
}

string_enum!(ReviewStatus, "review status", {
    Pending => "pending",
    Approved => "approved",
    Hidden => "hidden",
});

/// State of a Stripe checkout session as tracked locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutStatus {
    #[default]
    Open,
    Completed,
    Expired,
}

string_enum!(CheckoutStatus, "checkout status", {
    Open => "open",
    Completed => "completed",
    Expired => "expired",
});
