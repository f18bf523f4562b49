//! Cart pricing and Checkout Session assembly.
//!
//! Prices always come from the database at the moment of pricing. The
//! discount is applied to the order as a whole and then spread back over
//! the Stripe line items, since Stripe coupons are not used.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use printshop_core::{CurrencyCode, Price, PriceError, VariantId};

use crate::config::StorefrontConfig;
use crate::db::{DiscountRepository, ProductRepository, RepositoryError};
use crate::models::cart::{Cart, CartTotals, CartVariant, PricedCart, PricedLine};
use crate::models::discount::{Discount, DiscountRejection};
use crate::models::session::CurrentUser;
use crate::services::stripe::{CheckoutSessionParams, LineItem};

/// Price a session cart against current variant rows.
///
/// Lines whose variant is missing from `variants` are dropped. When the cart
/// carries a discount code, `discount` is the looked-up row (or `None` if the
/// code does not exist); a code that does not apply is reported in
/// `discount_error` and ignored in the totals.
#[must_use]
pub fn price_cart(
    cart: &Cart,
    variants: &[CartVariant],
    discount: Option<&Discount>,
    flat_shipping: Decimal,
    currency: CurrencyCode,
    now: DateTime<Utc>,
) -> PricedCart {
    let by_id: HashMap<VariantId, &CartVariant> =
        variants.iter().map(|v| (v.variant_id, v)).collect();

    let lines: Vec<PricedLine> = cart
        .lines
        .iter()
        .filter_map(|line| {
            let v = by_id.get(&line.variant_id)?;
            Some(PricedLine {
                variant_id: v.variant_id,
                product_id: v.product_id,
                product_slug: v.product_slug.clone(),
                product_name: v.product_name.clone(),
                variant_name: v.variant_name.clone(),
                image_url: v.image_url.clone(),
                quantity: line.quantity,
                unit_price: v.price,
                line_total: v.price * Decimal::from(line.quantity),
                printful_variant_id: v.printful_variant_id,
            })
        })
        .collect();

    let subtotal: Decimal = lines.iter().map(|l| l.line_total).sum();
    let shipping = if lines.is_empty() {
        Decimal::ZERO
    } else {
        flat_shipping
    };

    let mut discount_total = Decimal::ZERO;
    let mut shipping_total = shipping;
    let mut discount_error = None;

    if cart.discount_code.is_some() {
        match discount.ok_or(DiscountRejection::Unknown).and_then(|d| {
            d.check(subtotal, now)?;
            Ok(d)
        }) {
            Ok(d) => {
                let effect = d.apply(subtotal, shipping);
                discount_total = effect.discount_total;
                shipping_total = effect.shipping_total;
            }
            Err(rejection) => discount_error = Some(rejection.to_string()),
        }
    }

    PricedCart {
        lines,
        discount_code: cart.discount_code.clone(),
        discount_error,
        totals: CartTotals {
            subtotal,
            discount_total,
            shipping_total,
            total: subtotal - discount_total + shipping_total,
        },
        currency: currency.code().to_string(),
    }
}

/// Spread `discount` over `amounts` proportionally.
///
/// Shares are rounded down; the remainder goes to the last line, spilling
/// backwards if a line would go below zero. No line ever receives more than
/// its own amount, and the shares add up to `min(discount, sum(amounts))`.
#[must_use]
pub fn allocate_discount(amounts: &[i64], discount: i64) -> Vec<i64> {
    let total: i64 = amounts.iter().sum();
    if total <= 0 || discount <= 0 {
        return vec![0; amounts.len()];
    }
    let discount = discount.min(total);

    let mut shares: Vec<i64> = amounts
        .iter()
        .map(|&a| {
            let share = i128::from(a) * i128::from(discount) / i128::from(total);
            i64::try_from(share).unwrap_or(a)
        })
        .collect();

    let mut remainder = discount - shares.iter().sum::<i64>();
    for (share, &amount) in shares.iter_mut().zip(amounts).rev() {
        if remainder == 0 {
            break;
        }
        let room = amount - *share;
        let take = room.min(remainder);
        *share += take;
        remainder -= take;
    }

    shares
}

/// Stripe line items for a priced cart, with the discount folded into the
/// line amounts.
///
/// A discounted line that no longer divides evenly by its quantity is sent
/// as a single item named with the quantity, so the charged total is exact.
///
/// # Errors
///
/// Returns `PriceError::OutOfRange` for amounts that don't fit in minor units.
pub fn stripe_line_items(
    cart: &PricedCart,
    currency: CurrencyCode,
) -> Result<Vec<LineItem>, PriceError> {
    let line_amounts = cart
        .lines
        .iter()
        .map(|l| Price::new(l.line_total, currency).to_minor_units())
        .collect::<Result<Vec<_>, _>>()?;
    let discount = Price::new(cart.totals.discount_total, currency).to_minor_units()?;
    let shares = allocate_discount(&line_amounts, discount);

    let items = cart
        .lines
        .iter()
        .zip(line_amounts.iter().zip(shares))
        .map(|(line, (&amount, share))| {
            let charged = amount - share;
            let name = format!("{} - {}", line.product_name, line.variant_name);
            let quantity = i64::from(line.quantity.max(1));
            if charged % quantity == 0 {
                LineItem {
                    name,
                    image_url: line.image_url.clone(),
                    unit_amount: charged / quantity,
                    quantity: line.quantity.max(1),
                }
            } else {
                LineItem {
                    name: format!("{name} x{}", line.quantity),
                    image_url: line.image_url.clone(),
                    unit_amount: charged,
                    quantity: 1,
                }
            }
        })
        .collect();

    Ok(items)
}

/// Cart pricing backed by the database.
pub struct CheckoutService<'a> {
    pool: &'a PgPool,
    config: &'a StorefrontConfig,
}

impl<'a> CheckoutService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, config: &'a StorefrontConfig) -> Self {
        Self { pool, config }
    }

    /// Price `cart` with current prices and its discount code.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn price(&self, cart: &Cart) -> Result<PricedCart, RepositoryError> {
        let variants = ProductRepository::new(self.pool)
            .cart_variants(&cart.variant_ids())
            .await?;

        let discount = match &cart.discount_code {
            Some(code) => DiscountRepository::new(self.pool).get_by_code(code).await?,
            None => None,
        };

        Ok(price_cart(
            cart,
            &variants,
            discount.as_ref(),
            self.config.flat_shipping,
            self.config.currency,
            Utc::now(),
        ))
    }

    /// Build the Checkout Session request for a priced cart.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::OutOfRange` for amounts that don't fit in minor units.
    pub fn session_params(
        &self,
        cart: &PricedCart,
        user: Option<&CurrentUser>,
    ) -> Result<CheckoutSessionParams, PriceError> {
        let currency = self.config.currency;
        let line_items = stripe_line_items(cart, currency)?;
        let shipping_amount = Price::new(cart.totals.shipping_total, currency).to_minor_units()?;

        let mut metadata = Vec::new();
        if let Some(user) = user {
            metadata.push(("user_id".to_string(), user.id.to_string()));
        }
        if cart.discount_error.is_none()
            && let Some(code) = &cart.discount_code
        {
            metadata.push(("discount_code".to_string(), code.clone()));
        }

        Ok(CheckoutSessionParams {
            line_items,
            currency: currency.stripe_code(),
            shipping_amount,
            allowed_countries: self.config.stripe.shipping_countries.clone(),
            customer_email: user.map(|u| u.email.to_string()),
            success_url: self
                .config
                .url_for("/checkout/success?session_id={CHECKOUT_SESSION_ID}"),
            cancel_url: self.config.url_for("/cart"),
            metadata,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use printshop_core::{DiscountId, DiscountKind, ProductId};

    use super::*;

    fn variant(id: i32, price: Decimal) -> CartVariant {
        CartVariant {
            variant_id: VariantId::new(id),
            product_id: ProductId::new(1),
            product_slug: "tee".to_string(),
            product_name: "Tee".to_string(),
            variant_name: format!("V{id}"),
            price,
            printful_variant_id: Some(i64::from(id) * 100),
            image_url: None,
        }
    }

    fn discount(kind: DiscountKind, value: Decimal) -> Discount {
        Discount {
            id: DiscountId::new(1),
            code: "SAVE".to_string(),
            kind,
            value,
            min_subtotal: None,
            max_uses: None,
            times_used: 0,
            starts_at: None,
            expires_at: None,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    fn cart(lines: &[(i32, u32)], code: Option<&str>) -> Cart {
        let mut cart = Cart {
            discount_code: code.map(String::from),
            ..Cart::default()
        };
        for &(id, qty) in lines {
            cart.add(VariantId::new(id), qty).unwrap();
        }
        cart
    }

    #[test]
    fn test_price_drops_missing_variants() {
        let c = cart(&[(1, 2), (2, 1)], None);
        let priced = price_cart(
            &c,
            &[variant(1, Decimal::new(1500, 2))],
            None,
            Decimal::new(500, 2),
            CurrencyCode::USD,
            Utc::now(),
        );
        assert_eq!(priced.lines.len(), 1);
        assert_eq!(priced.totals.subtotal, Decimal::new(3000, 2));
        assert_eq!(priced.totals.shipping_total, Decimal::new(500, 2));
        assert_eq!(priced.totals.total, Decimal::new(3500, 2));
        assert_eq!(priced.currency, "USD");
    }

    #[test]
    fn test_empty_cart_has_no_shipping() {
        let priced = price_cart(
            &Cart::default(),
            &[],
            None,
            Decimal::new(500, 2),
            CurrencyCode::USD,
            Utc::now(),
        );
        assert!(priced.is_empty());
        assert_eq!(priced.totals.total, Decimal::ZERO);
    }

    #[test]
    fn test_discount_applied_and_rejected() {
        let c = cart(&[(1, 1)], Some("SAVE"));
        let variants = [variant(1, Decimal::new(4000, 2))];
        let pct = discount(DiscountKind::Percentage, Decimal::TEN);

        let priced = price_cart(
            &c,
            &variants,
            Some(&pct),
            Decimal::ZERO,
            CurrencyCode::USD,
            Utc::now(),
        );
        assert_eq!(priced.totals.discount_total, Decimal::new(400, 2));
        assert_eq!(priced.totals.total, Decimal::new(3600, 2));
        assert!(priced.discount_error.is_none());

        let unknown = price_cart(
            &c,
            &variants,
            None,
            Decimal::ZERO,
            CurrencyCode::USD,
            Utc::now(),
        );
        assert_eq!(unknown.totals.discount_total, Decimal::ZERO);
        assert_eq!(
            unknown.discount_error.as_deref(),
            Some("discount code is not valid")
        );
    }

    #[test]
    fn test_free_shipping_discount() {
        let c = cart(&[(1, 1)], Some("SAVE"));
        let free = discount(DiscountKind::FreeShipping, Decimal::ZERO);
        let priced = price_cart(
            &c,
            &[variant(1, Decimal::new(2000, 2))],
            Some(&free),
            Decimal::new(599, 2),
            CurrencyCode::USD,
            Utc::now(),
        );
        assert_eq!(priced.totals.shipping_total, Decimal::ZERO);
        assert_eq!(priced.totals.total, Decimal::new(2000, 2));
    }

    #[test]
    fn test_allocate_proportional_with_remainder_on_last() {
        assert_eq!(allocate_discount(&[1000, 2000, 3000], 600), vec![100, 200, 300]);
        // 100/3 = 33.3 each; floor then 1 left over for the last line
        assert_eq!(allocate_discount(&[100, 100, 100], 100), vec![33, 33, 34]);
        assert_eq!(allocate_discount(&[500], 9999), vec![500]);
        assert_eq!(allocate_discount(&[500, 500], 0), vec![0, 0]);
        assert!(allocate_discount(&[], 100).is_empty());
    }

    #[test]
    fn test_allocate_spills_backwards() {
        // The last line is too small to absorb the remainder
        let shares = allocate_discount(&[999, 1], 999);
        assert_eq!(shares.iter().sum::<i64>(), 999);
        assert!(shares.iter().zip([999, 1]).all(|(s, a)| *s <= a));
    }

    #[test]
    fn test_line_items_match_charged_total() {
        let c = cart(&[(1, 3), (2, 1)], Some("SAVE"));
        let fixed = discount(DiscountKind::FixedAmount, Decimal::new(500, 2));
        let priced = price_cart(
            &c,
            &[variant(1, Decimal::new(1000, 2)), variant(2, Decimal::new(1999, 2))],
            Some(&fixed),
            Decimal::ZERO,
            CurrencyCode::USD,
            Utc::now(),
        );

        let items = stripe_line_items(&priced, CurrencyCode::USD).unwrap();
        let charged: i64 = items
            .iter()
            .map(|i| i.unit_amount * i64::from(i.quantity))
            .sum();
        let expected = Price::new(priced.totals.subtotal - priced.totals.discount_total, CurrencyCode::USD)
            .to_minor_units()
            .unwrap();
        assert_eq!(charged, expected);
    }

    #[test]
    fn test_undiscounted_lines_keep_quantity() {
        let c = cart(&[(1, 3)], None);
        let priced = price_cart(
            &c,
            &[variant(1, Decimal::new(1250, 2))],
            None,
            Decimal::ZERO,
            CurrencyCode::USD,
            Utc::now(),
        );
        let items = stripe_line_items(&priced, CurrencyCode::USD).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, 3);
        assert_eq!(items[0].unit_amount, 1250);
        assert_eq!(items[0].name, "Tee - V1");
    }
}
