//! Session cart.
//!
//! The cart stored in the session only holds variant ids and quantities.
//! Prices are always re-read from the database when the cart is shown or
//! checked out, so a stale session can never pin an old price.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use printshop_core::{ProductId, VariantId};

/// Maximum quantity of a single variant in the cart.
pub const MAX_LINE_QUANTITY: u32 = 20;

/// Maximum number of distinct lines in the cart.
pub const MAX_LINES: usize = 50;

/// Cart mutation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    #[error("quantity must be between 1 and {MAX_LINE_QUANTITY}")]
    InvalidQuantity,
    #[error("cart cannot hold more than {MAX_LINES} different items")]
    TooManyLines,
    #[error("item is not in the cart")]
    NotInCart,
}

/// Cart as stored in the session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub lines: Vec<CartLine>,
    pub discount_code: Option<String>,
}

/// One cart line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub variant_id: VariantId,
    pub quantity: u32,
}

impl Cart {
    /// Add `quantity` of a variant, merging with an existing line.
    ///
    /// The merged quantity is capped at [`MAX_LINE_QUANTITY`]. Returns the
    /// resulting line quantity.
    ///
    /// # Errors
    ///
    /// Returns `CartError::InvalidQuantity` for a zero or oversized quantity
    /// and `CartError::TooManyLines` when a new line would exceed [`MAX_LINES`].
    pub fn add(&mut self, variant_id: VariantId, quantity: u32) -> Result<u32, CartError> {
        if quantity == 0 || quantity > MAX_LINE_QUANTITY {
            return Err(CartError::InvalidQuantity);
        }

        if let Some(line) = self.lines.iter_mut().find(|l| l.variant_id == variant_id) {
            line.quantity = (line.quantity + quantity).min(MAX_LINE_QUANTITY);
            return Ok(line.quantity);
        }

        if self.lines.len() >= MAX_LINES {
            return Err(CartError::TooManyLines);
        }
        self.lines.push(CartLine {
            variant_id,
            quantity,
        });
        Ok(quantity)
    }

    /// Set the quantity of an existing line. Zero removes the line.
    ///
    /// # Errors
    ///
    /// Returns `CartError::InvalidQuantity` above the cap and
    /// `CartError::NotInCart` if the variant has no line.
    pub fn set_quantity(&mut self, variant_id: VariantId, quantity: u32) -> Result<(), CartError> {
        if quantity > MAX_LINE_QUANTITY {
            return Err(CartError::InvalidQuantity);
        }
        if quantity == 0 {
            return if self.remove(variant_id) {
                Ok(())
            } else {
                Err(CartError::NotInCart)
            };
        }

        let line = self
            .lines
            .iter_mut()
            .find(|l| l.variant_id == variant_id)
            .ok_or(CartError::NotInCart)?;
        line.quantity = quantity;
        Ok(())
    }

    /// Remove a line. Returns whether anything was removed.
    pub fn remove(&mut self, variant_id: VariantId) -> bool {
        let before = self.lines.len();
        self.lines.retain(|l| l.variant_id != variant_id);
        self.lines.len() != before
    }

    /// Drop lines whose variant no longer exists or can't be bought.
    pub fn retain_variants(&mut self, mut keep: impl FnMut(VariantId) -> bool) {
        self.lines.retain(|l| keep(l.variant_id));
    }

    pub fn clear(&mut self) {
        self.lines.clear();
        self.discount_code = None;
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    #[must_use]
    pub fn variant_ids(&self) -> Vec<VariantId> {
        self.lines.iter().map(|l| l.variant_id).collect()
    }

    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }
}

/// Current database view of a variant that is in a cart.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CartVariant {
    pub variant_id: VariantId,
    pub product_id: ProductId,
    pub product_slug: String,
    pub product_name: String,
    pub variant_name: String,
    pub price: Decimal,
    pub printful_variant_id: Option<i64>,
    pub image_url: Option<String>,
}

/// A cart line priced from the database.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PricedLine {
    pub variant_id: VariantId,
    pub product_id: ProductId,
    pub product_slug: String,
    pub product_name: String,
    pub variant_name: String,
    pub image_url: Option<String>,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
    pub printful_variant_id: Option<i64>,
}

/// Order-level amounts.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CartTotals {
    pub subtotal: Decimal,
    pub discount_total: Decimal,
    pub shipping_total: Decimal,
    pub total: Decimal,
}

/// The cart as returned by `GET /api/cart` and snapshotted at checkout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PricedCart {
    pub lines: Vec<PricedLine>,
    pub discount_code: Option<String>,
    /// Why the stored discount code does not currently apply.
    pub discount_error: Option<String>,
    pub totals: CartTotals,
    pub currency: String,
}

impl PricedCart {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const TEE: VariantId = VariantId::new(10);
    const MUG: VariantId = VariantId::new(11);

    #[test]
    fn test_add_merges_and_caps() {
        let mut cart = Cart::default();
        assert_eq!(cart.add(TEE, 2).unwrap(), 2);
        assert_eq!(cart.add(TEE, 3).unwrap(), 5);
        assert_eq!(cart.add(TEE, 19).unwrap(), MAX_LINE_QUANTITY);
        assert_eq!(cart.lines.len(), 1);
        assert_eq!(cart.add(MUG, 1).unwrap(), 1);
        assert_eq!(cart.item_count(), 21);
    }

    #[test]
    fn test_add_rejects_bad_quantities() {
        let mut cart = Cart::default();
        assert_eq!(cart.add(TEE, 0), Err(CartError::InvalidQuantity));
        assert_eq!(cart.add(TEE, 21), Err(CartError::InvalidQuantity));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_line_limit() {
        let mut cart = Cart::default();
        for id in 0..i32::try_from(MAX_LINES).unwrap() {
            cart.add(VariantId::new(id), 1).unwrap();
        }
        assert_eq!(
            cart.add(VariantId::new(9999), 1),
            Err(CartError::TooManyLines)
        );
        // Merging into an existing line is still allowed when full
        assert_eq!(cart.add(VariantId::new(0), 1).unwrap(), 2);
    }

    #[test]
    fn test_set_quantity_and_remove() {
        let mut cart = Cart::default();
        cart.add(TEE, 2).unwrap();
        cart.set_quantity(TEE, 7).unwrap();
        assert_eq!(cart.lines[0].quantity, 7);
        assert_eq!(cart.set_quantity(MUG, 1), Err(CartError::NotInCart));
        assert_eq!(cart.set_quantity(TEE, 21), Err(CartError::InvalidQuantity));
        cart.set_quantity(TEE, 0).unwrap();
        assert!(cart.is_empty());
        assert_eq!(cart.set_quantity(TEE, 0), Err(CartError::NotInCart));
    }

    #[test]
    fn test_clear_drops_discount() {
        let mut cart = Cart {
            discount_code: Some("SPRING10".to_string()),
            ..Cart::default()
        };
        cart.add(TEE, 1).unwrap();
        cart.clear();
        assert!(cart.is_empty());
        assert!(cart.discount_code.is_none());
    }

    #[test]
    fn test_retain_variants() {
        let mut cart = Cart::default();
        cart.add(TEE, 1).unwrap();
        cart.add(MUG, 1).unwrap();
        cart.retain_variants(|id| id == MUG);
        assert_eq!(cart.variant_ids(), vec![MUG]);
    }
}
