//! Buyer-facing order history and order detail pages.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use modern_shop_core::OrderNumber;

use crate::db::orders::OrderRepository;
use crate::error::Result;
use crate::filters;
use crate::middleware::RequireAuth;
use crate::routes::{MessageQuery, NotFoundTemplate, OrderItemView, OrderView, PageContext};
use crate::state::AppState;

/// Order history template.
#[derive(Template, WebTemplate)]
#[template(path = "orders/index.html")]
pub struct OrderIndexTemplate {
    pub ctx: PageContext,
    pub orders: Vec<OrderView>,
}

/// Order detail template.
#[derive(Template, WebTemplate)]
#[template(path = "orders/show.html")]
pub struct OrderShowTemplate {
    pub ctx: PageContext,
    pub order: OrderView,
    pub items: Vec<OrderItemView>,
}

/// Order history for the logged-in buyer, newest first.
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Query(query): Query<MessageQuery>,
) -> Result<OrderIndexTemplate> {
    let orders = OrderRepository::new(state.pool())
        .list_for_email(&user.email)
        .await?;

    let ctx = PageContext::load(&session).await.with_messages(query);

    Ok(OrderIndexTemplate {
        ctx,
        orders: orders.iter().map(OrderView::from).collect(),
    })
}

/// Order detail, visible to its owner and to administrators.
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Path(number): Path<String>,
) -> Result<Response> {
    let ctx = PageContext::load(&session).await;

    // A malformed number can't match any order
    let Ok(number) = OrderNumber::parse(&number) else {
        return Ok((StatusCode::NOT_FOUND, NotFoundTemplate { ctx }).into_response());
    };

    let Some(order) = OrderRepository::new(state.pool())
        .find_by_number(&number)
        .await?
    else {
        return Ok((StatusCode::NOT_FOUND, NotFoundTemplate { ctx }).into_response());
    };

    // Owners see their own orders; admins see everything
    if order.user_email != user.email && !user.is_admin {
        return Ok(Redirect::to("/orders?error=access_denied").into_response());
    }

    Ok(OrderShowTemplate {
        ctx,
        order: OrderView::from(&order),
        items: order.items.items.iter().map(OrderItemView::from).collect(),
    }
    .into_response())
}
