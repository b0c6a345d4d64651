//! Session-scoped shopping cart.
//!
//! The cart is a plain value stored in the session: product IDs mapped to
//! quantities. Prices are never stored in the cart; every display and total
//! is computed against the current catalog, so price changes take effect
//! immediately for carts that have not checked out yet.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use modern_shop_core::ProductId;

use super::product::Product;

/// Errors from cart mutations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CartError {
    /// Requested quantity exceeds available stock.
    #[error("{name} has only {available} items in stock")]
    OutOfStock {
        /// Product display name.
        name: String,
        /// Units currently available.
        available: i32,
    },
}

/// A quantity adjustment applied to one cart line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CartAction {
    /// Add one unit.
    Increase,
    /// Remove one unit; the line disappears at zero.
    Decrease,
    /// Drop the line entirely.
    Remove,
}

/// A cart line joined against the current catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLine {
    pub product_id: ProductId,
    pub name: String,
    /// Effective unit price at display time.
    pub unit_price: Decimal,
    pub image: String,
    pub quantity: u32,
    pub line_total: Decimal,
}

/// The session cart: product IDs mapped to quantities.
///
/// Quantities are always at least 1; removing the last unit removes the
/// entry. `BTreeMap` keeps iteration order stable across requests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    entries: BTreeMap<i32, u32>,
}

impl Cart {
    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn count(&self) -> u32 {
        self.entries.values().sum()
    }

    /// Quantity of a single product, zero if absent.
    #[must_use]
    pub fn quantity(&self, product_id: ProductId) -> u32 {
        self.entries
            .get(&product_id.as_i32())
            .copied()
            .unwrap_or(0)
    }

    /// Product IDs currently in the cart.
    pub fn product_ids(&self) -> impl Iterator<Item = ProductId> + '_ {
        self.entries.keys().copied().map(ProductId::new)
    }

    /// Add `requested` units of a product, checking against its stock.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::OutOfStock`] if the resulting quantity would
    /// exceed the product's available stock. The cart is left unchanged.
    pub fn add(&mut self, product: &Product, requested: u32) -> Result<(), CartError> {
        let current = self.quantity(product.id);
        let wanted = current.saturating_add(requested);

        if i64::from(wanted) > i64::from(product.stock) {
            return Err(CartError::OutOfStock {
                name: product.name.clone(),
                available: product.stock,
            });
        }

        if wanted > 0 {
            self.entries.insert(product.id.as_i32(), wanted);
        }
        Ok(())
    }

    /// Apply a single-step adjustment to a line.
    ///
    /// Increase requires the current catalog row to re-check stock;
    /// decrease and remove work without one.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::OutOfStock`] if an increase would exceed stock.
    pub fn apply(
        &mut self,
        product_id: ProductId,
        action: CartAction,
        product: Option<&Product>,
    ) -> Result<(), CartError> {
        match action {
            CartAction::Increase => match product {
                Some(p) => self.add(p, 1),
                // The product vanished from the catalog; treat as sold out.
                None => Err(CartError::OutOfStock {
                    name: format!("Product {product_id}"),
                    available: 0,
                }),
            },
            CartAction::Decrease => {
                let key = product_id.as_i32();
                if let Some(quantity) = self.entries.get_mut(&key) {
                    if *quantity > 1 {
                        *quantity -= 1;
                    } else {
                        self.entries.remove(&key);
                    }
                }
                Ok(())
            }
            CartAction::Remove => {
                self.entries.remove(&product_id.as_i32());
                Ok(())
            }
        }
    }

    /// Empty the cart.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Join the cart against catalog rows, producing display lines.
    ///
    /// Entries whose product no longer exists are silently dropped; they
    /// contribute nothing to totals.
    #[must_use]
    pub fn line_items(&self, products: &[Product]) -> Vec<CartLine> {
        self.entries
            .iter()
            .filter_map(|(&id, &quantity)| {
                let product = products.iter().find(|p| p.id.as_i32() == id)?;
                let unit_price = product.effective_price();
                Some(CartLine {
                    product_id: product.id,
                    name: product.name.clone(),
                    unit_price,
                    image: product.image.clone(),
                    quantity,
                    line_total: unit_price * Decimal::from(quantity),
                })
            })
            .collect()
    }

    /// Cart total: sum of effective unit price times quantity per line.
    #[must_use]
    pub fn total(&self, products: &[Product]) -> Decimal {
        self.line_items(products)
            .iter()
            .map(|line| line.line_total)
            .sum()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::models::product::tests::test_product;

    #[test]
    fn test_empty_cart() {
        let cart = Cart::default();
        assert!(cart.is_empty());
        assert_eq!(cart.count(), 0);
        assert_eq!(cart.total(&[]), Decimal::ZERO);
        assert!(cart.line_items(&[]).is_empty());
    }

    #[test]
    fn test_add_and_total() {
        let a = test_product(1, 100, 10);
        let b = test_product(2, 50, 10);
        let mut cart = Cart::default();

        cart.add(&a, 2).unwrap();
        cart.add(&b, 1).unwrap();

        let products = vec![a, b];
        assert_eq!(cart.count(), 3);
        assert_eq!(cart.total(&products), Decimal::from(250));

        let lines = cart.line_items(&products);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].line_total, Decimal::from(200));
        assert_eq!(lines[1].line_total, Decimal::from(50));
    }

    #[test]
    fn test_add_accumulates_quantity() {
        let product = test_product(1, 100, 10);
        let mut cart = Cart::default();

        cart.add(&product, 1).unwrap();
        cart.add(&product, 2).unwrap();
        assert_eq!(cart.quantity(product.id), 3);
    }

    #[test]
    fn test_add_rejects_beyond_stock() {
        let product = test_product(1, 100, 3);
        let mut cart = Cart::default();

        cart.add(&product, 3).unwrap();
        let err = cart.add(&product, 1).unwrap_err();
        assert_eq!(
            err,
            CartError::OutOfStock {
                name: product.name.clone(),
                available: 3,
            }
        );
        // Failed add leaves the cart unchanged
        assert_eq!(cart.quantity(product.id), 3);
    }

    #[test]
    fn test_total_uses_discount_price() {
        let mut product = test_product(1, 100, 10);
        product.discount_price = Some(Decimal::from(80));
        let mut cart = Cart::default();

        cart.add(&product, 2).unwrap();
        assert_eq!(cart.total(&[product]), Decimal::from(160));
    }

    #[test]
    fn test_increase_respects_stock() {
        let product = test_product(1, 100, 1);
        let mut cart = Cart::default();

        cart.add(&product, 1).unwrap();
        let err = cart
            .apply(product.id, CartAction::Increase, Some(&product))
            .unwrap_err();
        assert!(matches!(err, CartError::OutOfStock { available: 1, .. }));
    }

    #[test]
    fn test_increase_on_vanished_product() {
        let mut cart = Cart::default();
        let err = cart
            .apply(ProductId::new(9), CartAction::Increase, None)
            .unwrap_err();
        assert!(matches!(err, CartError::OutOfStock { available: 0, .. }));
    }

    #[test]
    fn test_decrease_removes_at_one() {
        let product = test_product(1, 100, 10);
        let mut cart = Cart::default();

        cart.add(&product, 2).unwrap();
        cart.apply(product.id, CartAction::Decrease, None).unwrap();
        assert_eq!(cart.quantity(product.id), 1);

        cart.apply(product.id, CartAction::Decrease, None).unwrap();
        assert_eq!(cart.quantity(product.id), 0);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_remove_is_idempotent() {
        let product = test_product(1, 100, 10);
        let mut cart = Cart::default();

        cart.add(&product, 1).unwrap();
        cart.apply(product.id, CartAction::Remove, None).unwrap();
        assert!(cart.is_empty());

        // Removing an absent line is a no-op
        cart.apply(product.id, CartAction::Remove, None).unwrap();
        assert!(cart.is_empty());
    }

    #[test]
    fn test_vanished_product_dropped_from_lines() {
        let a = test_product(1, 100, 10);
        let b = test_product(2, 50, 10);
        let mut cart = Cart::default();

        cart.add(&a, 1).unwrap();
        cart.add(&b, 1).unwrap();

        // Product b was deleted from the catalog
        let products = vec![a];
        let lines = cart.line_items(&products);
        assert_eq!(lines.len(), 1);
        assert_eq!(cart.total(&products), Decimal::from(100));
    }

    #[test]
    fn test_serde_roundtrip() {
        let product = test_product(1, 100, 10);
        let mut cart = Cart::default();
        cart.add(&product, 2).unwrap();

        let json = serde_json::to_string(&cart).unwrap();
        let back: Cart = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cart);
    }
}
