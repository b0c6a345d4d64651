//! Checkout pages and the payment flow endpoints.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form, Json,
    extract::State,
    response::Redirect,
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use modern_shop_core::OrderNumber;

use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::RequireAuth;
use crate::routes::{CartLineView, PageContext};
use crate::services::auth::AuthService;
use crate::services::cart;
use crate::services::checkout::{BuyerContact, CheckoutError, CheckoutService};
use crate::services::payments::GatewayError;
use crate::state::AppState;

// =============================================================================
// JSON and Form Types
// =============================================================================

/// JSON payload the browser uses to open the gateway's payment widget.
#[derive(Debug, Serialize)]
pub struct CheckoutOrderJson {
    pub success: bool,
    /// Gateway payment intent reference.
    pub order_id: String,
    /// Amount in minor currency units.
    pub amount: i64,
    pub currency: String,
    /// Public gateway key ID.
    pub key: String,
    /// Store display name for the payment sheet.
    pub name: String,
    pub description: String,
    /// Our order number.
    pub receipt: OrderNumber,
    pub user: BuyerContact,
}

/// Fields posted by the gateway widget after a successful payment.
#[derive(Debug, Deserialize)]
pub struct PaymentCallbackForm {
    pub gateway_payment_id: String,
    pub gateway_order_id: String,
    pub gateway_signature: String,
}

// =============================================================================
// Templates
// =============================================================================

/// Checkout review page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout.html")]
pub struct CheckoutTemplate {
    pub ctx: PageContext,
    pub lines: Vec<CartLineView>,
    pub total: String,
}

// =============================================================================
// Handlers
// =============================================================================

/// Checkout review page. Re-validates the cart against current stock and
/// bounces back to the cart page when something no longer fits.
pub async fn page(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(_user): RequireAuth,
) -> Result<axum::response::Response> {
    use axum::response::IntoResponse;

    let cart = cart::load(&session).await?;
    let service = CheckoutService::new(state.pool(), state.gateway(), &state.config().store_name);

    let lines = match service.validate_cart(&cart).await {
        Ok(lines) => lines,
        Err(CheckoutError::EmptyCart) => {
            return Ok(Redirect::to("/cart?error=empty_cart").into_response());
        }
        Err(CheckoutError::OutOfStock { name, available }) => {
            // Carry the detail the slug cannot: which product and how many
            super::flash_error(&session, format!("{name} has only {available} items in stock"))
                .await?;
            return Ok(Redirect::to("/cart").into_response());
        }
        Err(other) => return Err(other.into()),
    };

    let total = lines.iter().map(|line| line.line_total).sum();
    let ctx = PageContext::load(&session).await;

    Ok(CheckoutTemplate {
        ctx,
        lines: lines.iter().map(CartLineView::from).collect(),
        total: super::format_price(total),
    }
    .into_response())
}

/// Place the order and create a payment intent.
///
/// Runs checkout phases 1-3: validate, atomically place, start payment.
/// The response carries everything the gateway widget needs. If the
/// gateway is down the order is already placed and stays `Created`; the
/// error surfaces as a 502 and no cart state is lost.
pub async fn api_create_order(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(current): RequireAuth,
) -> Result<Json<CheckoutOrderJson>> {
    // The payment sheet wants the buyer's phone, which the session copy
    // does not carry
    let buyer = AuthService::new(state.pool()).get_user(current.id).await?;

    let cart = cart::load(&session).await?;
    let service = CheckoutService::new(state.pool(), state.gateway(), &state.config().store_name);

    let order = service.place_order(&buyer, &cart).await.map_err(AppError::from)?;
    let payload = service
        .start_payment(&order, &buyer)
        .await
        .map_err(AppError::from)?;

    Ok(Json(CheckoutOrderJson {
        success: true,
        order_id: payload.external_ref,
        amount: payload.amount,
        currency: payload.currency,
        key: payload.key,
        name: payload.store_name,
        description: payload.description,
        receipt: payload.receipt,
        user: payload.buyer,
    }))
}

/// Verified payment callback posted by the gateway widget.
///
/// Phase 4 of checkout: the signature is verified before anything else;
/// a bad signature leaves the order and the cart untouched. On success
/// (even for an unknown reference) the session cart is cleared.
pub async fn payment_success(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<PaymentCallbackForm>,
) -> Result<Redirect> {
    let service = CheckoutService::new(state.pool(), state.gateway(), &state.config().store_name);

    match service
        .confirm_payment(
            &form.gateway_order_id,
            &form.gateway_payment_id,
            &form.gateway_signature,
        )
        .await
    {
        Ok(_) => {
            cart::clear(&session).await?;
            Ok(Redirect::to("/orders?success=payment_confirmed"))
        }
        Err(CheckoutError::Gateway(GatewayError::InvalidSignature)) => {
            tracing::warn!("payment callback failed signature verification");
            Ok(Redirect::to("/orders?error=verification_failed"))
        }
        Err(other) => Err(other.into()),
    }
}

/// The buyer aborted payment or the gateway declined it.
///
/// The order stays `Created` with stock debited; nothing to roll back
/// here.
pub async fn payment_failed() -> Redirect {
    Redirect::to("/checkout?error=payment_failed")
}
