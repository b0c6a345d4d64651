//! Product catalog types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use thiserror::Error;

use modern_shop_core::ProductId;

/// The fixed set of catalog categories.
pub const CATEGORIES: &[&str] = &[
    "Electronics",
    "Fashion",
    "Home",
    "Books",
    "Sports",
    "Beauty",
];

/// A product in the catalog.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    /// List price.
    pub price: Decimal,
    /// Optional discounted price; must be below `price` when present.
    pub discount_price: Option<Decimal>,
    pub category: String,
    /// Image URL (absolute or under `/static`).
    pub image: String,
    /// Units available. Never negative (enforced by a database CHECK).
    pub stock: i32,
    /// Display rating, 0.0 to 5.0.
    pub rating: f64,
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// The price a buyer actually pays: the discount price when present,
    /// otherwise the list price.
    #[must_use]
    pub fn effective_price(&self) -> Decimal {
        self.discount_price.unwrap_or(self.price)
    }

    /// Whether the product currently has a discount applied.
    #[must_use]
    pub const fn is_discounted(&self) -> bool {
        self.discount_price.is_some()
    }

    /// Percentage off the list price, rounded to the nearest whole number.
    ///
    /// Returns `None` when there is no discount or the list price is zero.
    #[must_use]
    pub fn discount_percent(&self) -> Option<u32> {
        let discount = self.discount_price?;
        if self.price <= Decimal::ZERO {
            return None;
        }
        let percent = (self.price - discount) / self.price * Decimal::ONE_HUNDRED;
        percent.round().to_u32()
    }

    /// Whether at least one unit can be added to a cart.
    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.stock > 0
    }
}

/// Validation errors for product create/update input.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProductValidationError {
    #[error("product name is required")]
    EmptyName,
    #[error("price must be greater than zero")]
    NonPositivePrice,
    #[error("discount price must be below the list price")]
    DiscountNotBelowPrice,
    #[error("unknown category: {0}")]
    UnknownCategory(String),
    #[error("stock cannot be negative")]
    NegativeStock,
}

/// Input for creating or updating a product.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub discount_price: Option<Decimal>,
    pub category: String,
    pub image: String,
    pub stock: i32,
}

impl NewProduct {
    /// Validate the input against catalog constraints.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint.
    pub fn validate(&self) -> Result<(), ProductValidationError> {
        if self.name.trim().is_empty() {
            return Err(ProductValidationError::EmptyName);
        }
        if self.price <= Decimal::ZERO {
            return Err(ProductValidationError::NonPositivePrice);
        }
        if let Some(discount) = self.discount_price
            && discount >= self.price
        {
            return Err(ProductValidationError::DiscountNotBelowPrice);
        }
        if !CATEGORIES.contains(&self.category.as_str()) {
            return Err(ProductValidationError::UnknownCategory(
                self.category.clone(),
            ));
        }
        if self.stock < 0 {
            return Err(ProductValidationError::NegativeStock);
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;

    /// Build a test product with sensible defaults.
    pub(crate) fn test_product(id: i32, price: i64, stock: i32) -> Product {
        Product {
            id: ProductId::new(id),
            name: format!("Product {id}"),
            description: "A test product".to_string(),
            price: Decimal::from(price),
            discount_price: None,
            category: "Electronics".to_string(),
            image: "/static/img/placeholder.png".to_string(),
            stock,
            rating: 4.2,
            created_at: Utc::now(),
        }
    }

    fn valid_input() -> NewProduct {
        NewProduct {
            name: "Wireless Mouse".to_string(),
            description: "A mouse".to_string(),
            price: Decimal::from(799),
            discount_price: None,
            category: "Electronics".to_string(),
            image: String::new(),
            stock: 10,
        }
    }

    #[test]
    fn test_effective_price_without_discount() {
        let product = test_product(1, 100, 5);
        assert_eq!(product.effective_price(), Decimal::from(100));
        assert!(!product.is_discounted());
        assert_eq!(product.discount_percent(), None);
    }

    #[test]
    fn test_effective_price_with_discount() {
        let mut product = test_product(1, 100, 5);
        product.discount_price = Some(Decimal::from(75));
        assert_eq!(product.effective_price(), Decimal::from(75));
        assert!(product.is_discounted());
        assert_eq!(product.discount_percent(), Some(25));
    }

    #[test]
    fn test_discount_percent_rounds() {
        let mut product = test_product(1, 3, 5);
        product.discount_price = Some(Decimal::from(2));
        // 1/3 off = 33.33..%, rounds to 33
        assert_eq!(product.discount_percent(), Some(33));
    }

    #[test]
    fn test_in_stock() {
        assert!(test_product(1, 100, 1).in_stock());
        assert!(!test_product(1, 100, 0).in_stock());
    }

    #[test]
    fn test_validate_ok() {
        assert!(valid_input().validate().is_ok());
    }

    #[test]
    fn test_validate_empty_name() {
        let mut input = valid_input();
        input.name = "   ".to_string();
        assert_eq!(input.validate(), Err(ProductValidationError::EmptyName));
    }

    #[test]
    fn test_validate_non_positive_price() {
        let mut input = valid_input();
        input.price = Decimal::ZERO;
        assert_eq!(
            input.validate(),
            Err(ProductValidationError::NonPositivePrice)
        );
    }

    #[test]
    fn test_validate_discount_must_be_below_price() {
        let mut input = valid_input();
        input.discount_price = Some(input.price);
        assert_eq!(
            input.validate(),
            Err(ProductValidationError::DiscountNotBelowPrice)
        );
    }

    #[test]
    fn test_validate_unknown_category() {
        let mut input = valid_input();
        input.category = "Gadgets".to_string();
        assert!(matches!(
            input.validate(),
            Err(ProductValidationError::UnknownCategory(_))
        ));
    }

    #[test]
    fn test_validate_negative_stock() {
        let mut input = valid_input();
        input.stock = -1;
        assert_eq!(input.validate(), Err(ProductValidationError::NegativeStock));
    }
}
