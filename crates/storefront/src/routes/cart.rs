//! Cart page and JSON cart API.
//!
//! The cart page and add-to-cart form work for anonymous shoppers; the
//! JSON adjustment endpoints require a login, matching the checkout flow
//! they feed into.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form, Json,
    extract::{Query, State},
    response::Redirect,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use modern_shop_core::ProductId;

use crate::db::products::ProductRepository;
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::RequireAuth;
use crate::models::cart::{CartAction, CartError};
use crate::routes::{CartLineView, MessageQuery, PageContext};
use crate::services::cart::{self, CartSummary};
use crate::state::AppState;

// =============================================================================
// Form and JSON Types
// =============================================================================

/// Add-to-cart form data.
#[derive(Debug, Deserialize)]
pub struct AddForm {
    pub product_id: i32,
    pub quantity: Option<u32>,
}

/// Cart adjustment form data.
#[derive(Debug, Deserialize)]
pub struct UpdateForm {
    pub product_id: i32,
    pub action: CartAction,
}

/// One line in the cart JSON payload.
#[derive(Debug, Serialize)]
pub struct CartItemJson {
    pub id: i32,
    pub name: String,
    pub price: Decimal,
    pub image: String,
    pub quantity: u32,
    pub total: Decimal,
}

/// Cart state JSON payload returned by every cart mutation.
#[derive(Debug, Serialize)]
pub struct CartJson {
    pub success: bool,
    pub cart_count: u32,
    pub cart_total: Decimal,
    pub items: Vec<CartItemJson>,
}

impl CartJson {
    fn from_summary(summary: &CartSummary) -> Self {
        Self {
            success: true,
            cart_count: summary.count,
            cart_total: summary.total,
            items: summary
                .lines
                .iter()
                .map(|line| CartItemJson {
                    id: line.product_id.as_i32(),
                    name: line.name.clone(),
                    price: line.unit_price,
                    image: line.image.clone(),
                    quantity: line.quantity,
                    total: line.line_total,
                })
                .collect(),
        }
    }
}

/// Cart badge count JSON payload.
#[derive(Debug, Serialize)]
pub struct CartCountJson {
    pub count: u32,
}

// =============================================================================
// Templates
// =============================================================================

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart.html")]
pub struct CartTemplate {
    pub ctx: PageContext,
    pub lines: Vec<CartLineView>,
    pub total: String,
    pub is_empty: bool,
}

// =============================================================================
// Handlers
// =============================================================================

/// Cart page.
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<MessageQuery>,
) -> Result<CartTemplate> {
    let cart = cart::load(&session).await?;
    let summary = cart::summarize(state.pool(), &cart).await?;

    let ctx = PageContext::load(&session).await.with_messages(query);

    Ok(CartTemplate {
        ctx,
        lines: summary.lines.iter().map(CartLineView::from).collect(),
        total: super::format_price(summary.total),
        is_empty: summary.lines.is_empty(),
    })
}

/// Add a product to the cart and bounce back to the cart page.
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<AddForm>,
) -> Result<Redirect> {
    let product = ProductRepository::new(state.pool())
        .get(ProductId::new(form.product_id))
        .await?;

    let Some(product) = product else {
        return Ok(Redirect::to("/products?error=product_not_found"));
    };

    let mut cart = cart::load(&session).await?;
    let quantity = form.quantity.unwrap_or(1).max(1);

    if let Err(CartError::OutOfStock { name, available }) = cart.add(&product, quantity) {
        super::flash_error(&session, format!("{name} has only {available} items in stock"))
            .await?;
        return Ok(Redirect::to("/cart"));
    }
    cart::store(&session, &cart).await?;

    Ok(Redirect::to("/cart?success=added"))
}

/// Adjust one cart line and return the updated cart as JSON.
pub async fn api_update(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(_user): RequireAuth,
    Form(form): Form<UpdateForm>,
) -> Result<Json<CartJson>> {
    let product_id = ProductId::new(form.product_id);
    let mut cart = cart::load(&session).await?;

    // Increase needs the current catalog row to re-check stock
    let product = match form.action {
        CartAction::Increase => ProductRepository::new(state.pool()).get(product_id).await?,
        CartAction::Decrease | CartAction::Remove => None,
    };

    cart.apply(product_id, form.action, product.as_ref())
        .map_err(AppError::from)?;
    cart::store(&session, &cart).await?;

    let summary = cart::summarize(state.pool(), &cart).await?;
    Ok(Json(CartJson::from_summary(&summary)))
}

/// Cart badge count.
pub async fn api_count(session: Session) -> Result<Json<CartCountJson>> {
    let cart = cart::load(&session).await?;
    Ok(Json(CartCountJson { count: cart.count() }))
}

/// Empty the cart.
pub async fn api_clear(State(state): State<AppState>, session: Session) -> Result<Json<CartJson>> {
    cart::clear(&session).await?;

    let summary = cart::summarize(state.pool(), &crate::models::Cart::default()).await?;
    Ok(Json(CartJson::from_summary(&summary)))
}
