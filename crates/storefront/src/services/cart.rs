//! Cart session persistence and catalog joins.
//!
//! The cart itself is a pure value type ([`Cart`]); this module handles
//! loading and storing it in the session and joining it against the
//! catalog for display.

use rust_decimal::Decimal;
use sqlx::PgPool;
use tower_sessions::Session;

use crate::db::RepositoryError;
use crate::db::products::ProductRepository;
use crate::models::cart::{Cart, CartLine};
use crate::models::session_keys;

/// A cart joined against the current catalog.
#[derive(Debug, Clone)]
pub struct CartSummary {
    pub lines: Vec<CartLine>,
    pub total: Decimal,
    pub count: u32,
}

/// Load the cart from the session, defaulting to empty.
///
/// # Errors
///
/// Returns an error if the session store is unreachable.
pub async fn load(session: &Session) -> Result<Cart, tower_sessions::session::Error> {
    let cart = session
        .get::<Cart>(session_keys::CART)
        .await?
        .unwrap_or_default();
    Ok(cart)
}

/// Persist the cart back to the session.
///
/// # Errors
///
/// Returns an error if the session store is unreachable.
pub async fn store(session: &Session, cart: &Cart) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::CART, cart).await
}

/// Drop the cart from the session (after a completed checkout).
///
/// # Errors
///
/// Returns an error if the session store is unreachable.
pub async fn clear(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.remove::<Cart>(session_keys::CART).await?;
    Ok(())
}

/// Join a cart against the catalog, producing lines, total, and count.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the catalog lookup fails.
pub async fn summarize(pool: &PgPool, cart: &Cart) -> Result<CartSummary, RepositoryError> {
    let ids: Vec<_> = cart.product_ids().collect();
    let products = ProductRepository::new(pool).get_many(&ids).await?;

    let lines = cart.line_items(&products);
    let total = lines.iter().map(|line| line.line_total).sum();

    Ok(CartSummary {
        lines,
        total,
        count: cart.count(),
    })
}
