//! Order ledger types.
//!
//! An order snapshots the cart at checkout time: names, images, and prices
//! are copied into the order so later catalog edits never rewrite history.
//! The snapshot is stored as a versioned JSON document; readers reject any
//! document whose version they do not understand instead of guessing.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use modern_shop_core::{Email, OrderId, OrderNumber, OrderStatus, UserId};

use super::cart::CartLine;

/// Current version of the order items document.
pub const ORDER_ITEMS_VERSION: u32 = 1;

/// One line of an order snapshot.
///
/// `unit_price` is the effective price paid at checkout, not the list price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: i32,
    pub name: String,
    pub unit_price: Decimal,
    pub image: String,
    pub quantity: u32,
    pub line_total: Decimal,
}

impl From<CartLine> for OrderItem {
    fn from(line: CartLine) -> Self {
        Self {
            product_id: line.product_id.as_i32(),
            name: line.name,
            unit_price: line.unit_price,
            image: line.image,
            quantity: line.quantity,
            line_total: line.line_total,
        }
    }
}

/// The versioned order items document stored in the `orders.items` column.
///
/// Deserialization fails on a missing version field; [`Self::validate`]
/// additionally rejects versions this build does not understand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItemsDoc {
    pub version: u32,
    pub items: Vec<OrderItem>,
}

impl OrderItemsDoc {
    /// Wrap items in a document at the current version.
    #[must_use]
    pub const fn new(items: Vec<OrderItem>) -> Self {
        Self {
            version: ORDER_ITEMS_VERSION,
            items,
        }
    }

    /// Reject documents from a version this build does not understand.
    ///
    /// # Errors
    ///
    /// Returns a description of the unsupported version.
    pub fn validate(&self) -> Result<(), String> {
        if self.version == ORDER_ITEMS_VERSION {
            Ok(())
        } else {
            Err(format!(
                "unsupported order items version {} (expected {})",
                self.version, ORDER_ITEMS_VERSION
            ))
        }
    }

    /// Total units across all items.
    #[must_use]
    pub fn unit_count(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }
}

/// A persisted order.
#[derive(Debug, Clone)]
pub struct Order {
    pub id: OrderId,
    /// Human-shareable order number (`ORD` + 10 digits), unique.
    pub order_number: OrderNumber,
    pub user_id: UserId,
    /// Buyer email at checkout time.
    pub user_email: Email,
    /// Versioned snapshot of the cart at checkout.
    pub items: OrderItemsDoc,
    /// Sum of line totals at checkout time.
    pub total: Decimal,
    /// Gateway payment intent reference, set when a payment is started.
    pub payment_ref: Option<String>,
    /// Gateway payment ID, set by the verified payment callback.
    pub payment_id: Option<String>,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

/// Input for inserting a new order.
#[derive(Debug)]
pub struct NewOrder<'a> {
    pub order_number: &'a OrderNumber,
    pub user_id: UserId,
    pub user_email: &'a Email,
    pub items: &'a OrderItemsDoc,
    pub total: Decimal,
    pub status: OrderStatus,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use modern_shop_core::ProductId;

    fn sample_item() -> OrderItem {
        OrderItem {
            product_id: 1,
            name: "Wireless Mouse".to_string(),
            unit_price: Decimal::from(799),
            image: "/static/img/mouse.png".to_string(),
            quantity: 2,
            line_total: Decimal::from(1598),
        }
    }

    #[test]
    fn test_doc_carries_current_version() {
        let doc = OrderItemsDoc::new(vec![sample_item()]);
        assert_eq!(doc.version, ORDER_ITEMS_VERSION);
        assert!(doc.validate().is_ok());
        assert_eq!(doc.unit_count(), 2);
    }

    #[test]
    fn test_doc_rejects_future_version() {
        let doc = OrderItemsDoc {
            version: ORDER_ITEMS_VERSION + 1,
            items: vec![sample_item()],
        };
        let err = doc.validate().unwrap_err();
        assert!(err.contains("unsupported order items version"));
    }

    #[test]
    fn test_doc_missing_version_fails_deserialization() {
        // A pre-versioning bare array must not silently parse
        let legacy = r#"[{"product_id":1,"name":"x","unit_price":"1","image":"","quantity":1,"line_total":"1"}]"#;
        assert!(serde_json::from_str::<OrderItemsDoc>(legacy).is_err());

        let unversioned = r#"{"items":[]}"#;
        assert!(serde_json::from_str::<OrderItemsDoc>(unversioned).is_err());
    }

    #[test]
    fn test_doc_serde_roundtrip() {
        let doc = OrderItemsDoc::new(vec![sample_item()]);
        let json = serde_json::to_string(&doc).unwrap();
        let back: OrderItemsDoc = serde_json::from_str(&json).unwrap();
        assert_eq!(back, doc);
    }

    #[test]
    fn test_order_item_from_cart_line() {
        let line = CartLine {
            product_id: ProductId::new(7),
            name: "Desk Lamp".to_string(),
            unit_price: Decimal::from(450),
            image: "/static/img/lamp.png".to_string(),
            quantity: 3,
            line_total: Decimal::from(1350),
        };

        let item = OrderItem::from(line);
        assert_eq!(item.product_id, 7);
        assert_eq!(item.quantity, 3);
        assert_eq!(item.line_total, Decimal::from(1350));
    }
}
