//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                        - Home page
//! GET  /health                  - Health check
//!
//! # Products
//! GET  /products                - Catalog listing (?category=, ?search=)
//! GET  /products/{id}           - Product detail with related products
//!
//! # Cart
//! GET  /cart                    - Cart page
//! POST /cart/add                - Add to cart (form, redirects back)
//! POST /api/cart/update         - Adjust a line (JSON, requires login)
//! GET  /api/cart/count          - Cart badge count (JSON)
//! POST /api/cart/clear          - Empty the cart (JSON)
//!
//! # Checkout
//! GET  /checkout                - Checkout review page (requires login)
//! POST /api/checkout/order      - Place order + create payment intent (JSON)
//! POST /checkout/payment-success - Verified payment callback (form)
//! GET  /checkout/payment-failed - Buyer aborted or gateway declined
//!
//! # Auth
//! GET  /auth/login              - Login page
//! POST /auth/login              - Login action
//! GET  /auth/register           - Register page
//! POST /auth/register           - Register action
//! POST /auth/logout             - Logout action
//! GET  /account                 - Profile with order history (requires login)
//!
//! # Orders
//! GET  /orders                  - Order history (requires login)
//! GET  /orders/{number}         - Order detail (owner or admin)
//!
//! # Admin (all behind the require_admin guard)
//! GET  /admin                   - Dashboard
//! GET  /admin/products          - Product table
//! GET  /admin/products/new      - New product form
//! POST /admin/products          - Create product
//! GET  /admin/products/{id}/edit - Edit product form
//! POST /admin/products/{id}     - Update product
//! POST /admin/products/{id}/delete - Delete product
//! GET  /admin/orders            - Order table
//! POST /admin/api/orders/{number}/status - Set order status (JSON)
//! ```

pub mod admin;
pub mod auth;
pub mod cart;
pub mod checkout;
pub mod home;
pub mod orders;
pub mod products;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Router,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tower_sessions::Session;

use crate::filters;
use crate::middleware::require_admin;
use crate::models::cart::CartLine;
use crate::models::order::{Order, OrderItem};
use crate::models::product::Product;
use crate::models::session::{CurrentUser, FlashNotice};
use crate::services;
use crate::state::AppState;

// =============================================================================
// Shared View Types
// =============================================================================

/// Query parameters for notice display after a redirect.
#[derive(Debug, Default, Deserialize)]
pub struct MessageQuery {
    pub error: Option<String>,
    pub success: Option<String>,
}

/// Translate a redirect notice slug into the text shown to the shopper.
///
/// Redirects carry fixed slugs (`?error=out_of_stock`) rather than free
/// text; this is the one place they become sentences. Unknown slugs pass
/// through unchanged so a stale link still shows something.
fn notice_message(slug: &str) -> String {
    match slug {
        // Errors
        "empty_cart" => "Your cart is empty.",
        "out_of_stock" => "Some items in your cart are out of stock.",
        "invalid_credentials" => "Invalid email or password.",
        "email_taken" => "An account with this email already exists.",
        "missing_fields" => "Please fill in all required fields.",
        "invalid_email" => "Please enter a valid email address.",
        "weak_password" => "Password must be at least 8 characters.",
        "access_denied" => "Access denied.",
        "payment_failed" => "Payment was not completed. You can retry from checkout.",
        "verification_failed" => "Payment verification failed. Contact support if you were charged.",
        "product_not_found" => "That product is no longer available.",
        // Successes
        "added" => "Added to cart.",
        "welcome" => "Welcome! Your account is ready.",
        "payment_confirmed" => "Payment confirmed. Thank you for your order!",
        "created" => "Product created.",
        "updated" => "Product updated.",
        "deleted" => "Product deleted.",
        other => other,
    }
    .to_owned()
}

/// Store a one-shot error notice for the next page load.
///
/// Used where the message needs detail a fixed slug cannot carry, like
/// which product ran out of stock and how many units remain.
pub(crate) async fn flash_error(
    session: &Session,
    message: String,
) -> Result<(), tower_sessions::session::Error> {
    session
        .insert(
            crate::models::session_keys::FLASH,
            FlashNotice {
                error: Some(message),
                success: None,
            },
        )
        .await
}

/// Context shared by every page: the logged-in user, the cart badge, and
/// any one-shot notice carried in the query string.
#[derive(Debug, Default)]
pub struct PageContext {
    pub user: Option<CurrentUser>,
    pub cart_count: u32,
    pub error: Option<String>,
    pub success: Option<String>,
}

impl PageContext {
    /// Build the context from the session; store failures degrade to an
    /// anonymous, empty-cart view rather than a failed page.
    ///
    /// Consumes any pending flash notice, so it shows exactly once.
    pub async fn load(session: &Session) -> Self {
        let user = session
            .get::<CurrentUser>(crate::models::session_keys::CURRENT_USER)
            .await
            .ok()
            .flatten();
        let cart_count = services::cart::load(session)
            .await
            .map(|cart| cart.count())
            .unwrap_or(0);
        let flash = session
            .remove::<FlashNotice>(crate::models::session_keys::FLASH)
            .await
            .ok()
            .flatten()
            .unwrap_or_default();

        Self {
            user,
            cart_count,
            error: flash.error,
            success: flash.success,
        }
    }

    /// Attach redirect notices from the query string, translated into
    /// human-readable text. Query notices take precedence over a flash.
    #[must_use]
    pub fn with_messages(mut self, query: MessageQuery) -> Self {
        if let Some(slug) = query.error {
            self.error = Some(notice_message(&slug));
        }
        if let Some(slug) = query.success {
            self.success = Some(notice_message(&slug));
        }
        self
    }
}

/// Format a decimal amount for display, e.g. `₹1,299` becomes `₹1299.00`.
pub(crate) fn format_price(amount: Decimal) -> String {
    format!("\u{20b9}{amount:.2}")
}

/// A product prepared for template rendering.
#[derive(Debug, Clone)]
pub struct ProductCard {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub category: String,
    pub image: String,
    pub price: String,
    pub discount_price: Option<String>,
    pub effective_price: String,
    pub percent_off: Option<u32>,
    pub rating: f64,
    pub stock: i32,
    pub in_stock: bool,
}

impl From<&Product> for ProductCard {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id.as_i32(),
            name: product.name.clone(),
            description: product.description.clone(),
            category: product.category.clone(),
            image: product.image.clone(),
            price: format_price(product.price),
            discount_price: product.discount_price.map(format_price),
            effective_price: format_price(product.effective_price()),
            percent_off: product.discount_percent(),
            rating: product.rating,
            stock: product.stock,
            in_stock: product.in_stock(),
        }
    }
}

/// A cart line prepared for template rendering.
#[derive(Debug, Clone)]
pub struct CartLineView {
    pub product_id: i32,
    pub name: String,
    pub image: String,
    pub quantity: u32,
    pub unit_price: String,
    pub line_total: String,
}

impl From<&CartLine> for CartLineView {
    fn from(line: &CartLine) -> Self {
        Self {
            product_id: line.product_id.as_i32(),
            name: line.name.clone(),
            image: line.image.clone(),
            quantity: line.quantity,
            unit_price: format_price(line.unit_price),
            line_total: format_price(line.line_total),
        }
    }
}

/// An order row prepared for template rendering.
#[derive(Debug, Clone)]
pub struct OrderView {
    pub number: String,
    pub email: String,
    pub status: String,
    pub total: String,
    pub unit_count: u32,
    pub payment_id: Option<String>,
    pub placed_at: String,
}

impl From<&Order> for OrderView {
    fn from(order: &Order) -> Self {
        Self {
            number: order.order_number.to_string(),
            email: order.user_email.to_string(),
            status: order.status.to_string(),
            total: format_price(order.total),
            unit_count: order.items.unit_count(),
            payment_id: order.payment_id.clone(),
            placed_at: order.created_at.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

/// An order snapshot line prepared for template rendering.
#[derive(Debug, Clone)]
pub struct OrderItemView {
    pub name: String,
    pub image: String,
    pub quantity: u32,
    pub unit_price: String,
    pub line_total: String,
}

impl From<&OrderItem> for OrderItemView {
    fn from(item: &OrderItem) -> Self {
        Self {
            name: item.name.clone(),
            image: item.image.clone(),
            quantity: item.quantity,
            unit_price: format_price(item.unit_price),
            line_total: format_price(item.line_total),
        }
    }
}

// =============================================================================
// Routers
// =============================================================================

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/logout", post(auth::logout))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{id}", get(products::show))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::index))
        .route("/{number}", get(orders::show))
}

/// Create the JSON API router.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/cart/update", post(cart::api_update))
        .route("/cart/count", get(cart::api_count))
        .route("/cart/clear", post(cart::api_clear))
        .route("/checkout/order", post(checkout::api_create_order))
}

/// Create the admin router, fully behind the admin guard.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(admin::dashboard))
        .route("/products", get(admin::products).post(admin::create_product))
        .route("/products/new", get(admin::new_product))
        .route("/products/{id}", post(admin::update_product))
        .route("/products/{id}/edit", get(admin::edit_product))
        .route("/products/{id}/delete", post(admin::delete_product))
        .route("/orders", get(admin::orders))
        .route("/api/orders/{number}/status", post(admin::set_order_status))
        // Single guard for the whole subtree; handlers never re-check
        .route_layer(axum::middleware::from_fn(require_admin))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        // Home page
        .route("/", get(home::home))
        // Product routes
        .nest("/products", product_routes())
        // Cart page routes
        .route("/cart", get(cart::show))
        .route("/cart/add", post(cart::add))
        // Checkout
        .route("/checkout", get(checkout::page))
        .route("/checkout/payment-success", post(checkout::payment_success))
        .route("/checkout/payment-failed", get(checkout::payment_failed))
        // Orders
        .nest("/orders", order_routes())
        // Account
        .route("/account", get(auth::account))
        // Auth routes
        .nest("/auth", auth_routes())
        // JSON API
        .nest("/api", api_routes())
        // Back office
        .nest("/admin", admin_routes())
}

// =============================================================================
// 404
// =============================================================================

/// Not-found page template.
#[derive(Template, WebTemplate)]
#[template(path = "404.html")]
pub struct NotFoundTemplate {
    pub ctx: PageContext,
}

/// Fallback handler for unmatched routes.
pub async fn not_found(session: Session) -> impl IntoResponse {
    let ctx = PageContext::load(&session).await;
    (StatusCode::NOT_FOUND, NotFoundTemplate { ctx })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use tower_sessions::{MemoryStore, Session};

    use super::*;

    #[test]
    fn test_notice_slugs_become_sentences() {
        assert_eq!(
            notice_message("out_of_stock"),
            "Some items in your cart are out of stock."
        );
        assert_eq!(notice_message("empty_cart"), "Your cart is empty.");
        assert_eq!(
            notice_message("payment_confirmed"),
            "Payment confirmed. Thank you for your order!"
        );
    }

    #[test]
    fn test_unknown_slug_passes_through() {
        assert_eq!(notice_message("something_else"), "something_else");
    }

    #[test]
    fn test_with_messages_translates_slugs() {
        let ctx = PageContext::default().with_messages(MessageQuery {
            error: Some("out_of_stock".to_owned()),
            success: None,
        });

        assert_eq!(
            ctx.error.as_deref(),
            Some("Some items in your cart are out of stock.")
        );
        assert!(ctx.success.is_none());
    }

    #[tokio::test]
    async fn test_flash_notice_shows_exactly_once() {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);

        flash_error(&session, "Mouse has only 1 items in stock".to_owned())
            .await
            .unwrap();

        let ctx = PageContext::load(&session).await;
        assert_eq!(ctx.error.as_deref(), Some("Mouse has only 1 items in stock"));

        // Consumed by the first load
        let ctx = PageContext::load(&session).await;
        assert!(ctx.error.is_none());
    }

    #[tokio::test]
    async fn test_query_notice_overrides_flash() {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        flash_error(&session, "stale detail".to_owned()).await.unwrap();

        let ctx = PageContext::load(&session).await.with_messages(MessageQuery {
            error: Some("empty_cart".to_owned()),
            success: None,
        });

        assert_eq!(ctx.error.as_deref(), Some("Your cart is empty."));
    }
}
