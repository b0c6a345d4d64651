//! Back-office routes.
//!
//! Everything here is nested under `/admin` behind the single
//! `require_admin` guard; no handler re-checks the admin flag.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form, Json,
    extract::{Path, Query, State},
    response::Redirect,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use modern_shop_core::{OrderNumber, OrderStatus, ProductId};

use crate::db::orders::OrderRepository;
use crate::db::products::ProductRepository;
use crate::db::users::UserRepository;
use crate::error::{AppError, Result};
use crate::filters;
use crate::models::product::{NewProduct, Product};
use crate::routes::{MessageQuery, OrderView, PageContext, ProductCard};
use crate::state::AppState;

/// Recent orders shown on the dashboard.
const RECENT_ORDERS_LIMIT: i64 = 5;

// =============================================================================
// Form and JSON Types
// =============================================================================

/// Product create/update form data. Numeric fields arrive as strings and
/// are parsed and validated before they touch the repository.
#[derive(Debug, Deserialize)]
pub struct ProductForm {
    pub name: String,
    pub description: String,
    pub price: String,
    pub discount_price: Option<String>,
    pub category: String,
    pub image: Option<String>,
    pub stock: String,
}

impl ProductForm {
    /// Parse and validate the form into catalog input.
    fn into_new_product(self) -> Result<NewProduct> {
        let price = self
            .price
            .trim()
            .parse::<Decimal>()
            .map_err(|_| AppError::Validation("Price must be a number".to_owned()))?;

        let discount_price = match self.discount_price.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(raw.parse::<Decimal>().map_err(|_| {
                AppError::Validation("Discount price must be a number".to_owned())
            })?),
        };

        let stock = self
            .stock
            .trim()
            .parse::<i32>()
            .map_err(|_| AppError::Validation("Stock must be a whole number".to_owned()))?;

        let input = NewProduct {
            name: self.name.trim().to_owned(),
            description: self.description.trim().to_owned(),
            price,
            discount_price,
            category: self.category,
            image: self.image.map(|i| i.trim().to_owned()).unwrap_or_default(),
            stock,
        };

        input
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        Ok(input)
    }
}

/// Status update request body.
#[derive(Debug, Deserialize)]
pub struct StatusForm {
    pub status: String,
}

/// Status update response body.
#[derive(Debug, Serialize)]
pub struct StatusJson {
    pub success: bool,
    pub status: String,
}

// =============================================================================
// Templates
// =============================================================================

/// Admin dashboard template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/dashboard.html")]
pub struct DashboardTemplate {
    pub ctx: PageContext,
    pub product_count: i64,
    pub order_count: i64,
    pub user_count: i64,
    pub recent_orders: Vec<OrderView>,
}

/// Admin product table template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/products.html")]
pub struct AdminProductsTemplate {
    pub ctx: PageContext,
    pub products: Vec<ProductCard>,
}

/// Pre-filled values for the shared product form template.
#[derive(Debug, Default)]
pub struct ProductFormView {
    /// `None` for the create form, `Some` when editing.
    pub id: Option<i32>,
    pub name: String,
    pub description: String,
    pub price: String,
    pub discount_price: String,
    pub category: String,
    pub image: String,
    pub stock: String,
}

impl From<&Product> for ProductFormView {
    fn from(product: &Product) -> Self {
        Self {
            id: Some(product.id.as_i32()),
            name: product.name.clone(),
            description: product.description.clone(),
            price: product.price.to_string(),
            discount_price: product
                .discount_price
                .map(|d| d.to_string())
                .unwrap_or_default(),
            category: product.category.clone(),
            image: product.image.clone(),
            stock: product.stock.to_string(),
        }
    }
}

/// Product create/edit form template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/product_form.html")]
pub struct ProductFormTemplate {
    pub ctx: PageContext,
    pub form: ProductFormView,
    pub categories: &'static [&'static str],
}

/// Admin order table template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/orders.html")]
pub struct AdminOrdersTemplate {
    pub ctx: PageContext,
    pub orders: Vec<OrderView>,
    pub statuses: Vec<&'static str>,
}

// =============================================================================
// Handlers
// =============================================================================

/// Dashboard with store-wide counts and the latest orders.
pub async fn dashboard(
    State(state): State<AppState>,
    session: Session,
) -> Result<DashboardTemplate> {
    let product_count = ProductRepository::new(state.pool()).count().await?;
    let order_repo = OrderRepository::new(state.pool());
    let order_count = order_repo.count().await?;
    let user_count = UserRepository::new(state.pool()).count().await?;
    let recent_orders = order_repo.list_recent(RECENT_ORDERS_LIMIT).await?;

    let ctx = PageContext::load(&session).await;

    Ok(DashboardTemplate {
        ctx,
        product_count,
        order_count,
        user_count,
        recent_orders: recent_orders.iter().map(OrderView::from).collect(),
    })
}

/// Product table.
pub async fn products(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<MessageQuery>,
) -> Result<AdminProductsTemplate> {
    let products = ProductRepository::new(state.pool())
        .list(&crate::db::products::ProductFilter::default())
        .await?;

    let ctx = PageContext::load(&session).await.with_messages(query);

    Ok(AdminProductsTemplate {
        ctx,
        products: products.iter().map(ProductCard::from).collect(),
    })
}

/// Blank product form.
pub async fn new_product(session: Session) -> ProductFormTemplate {
    let ctx = PageContext::load(&session).await;

    ProductFormTemplate {
        ctx,
        form: ProductFormView::default(),
        categories: crate::models::product::CATEGORIES,
    }
}

/// Create a product from the form.
pub async fn create_product(
    State(state): State<AppState>,
    Form(form): Form<ProductForm>,
) -> Result<Redirect> {
    let input = form.into_new_product()?;
    let product = ProductRepository::new(state.pool()).create(&input).await?;

    tracing::info!(product_id = %product.id, "product created");
    Ok(Redirect::to("/admin/products?success=created"))
}

/// Pre-filled edit form.
pub async fn edit_product(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
) -> Result<ProductFormTemplate> {
    let product = ProductRepository::new(state.pool())
        .get(ProductId::new(id))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;

    let ctx = PageContext::load(&session).await;

    Ok(ProductFormTemplate {
        ctx,
        form: ProductFormView::from(&product),
        categories: crate::models::product::CATEGORIES,
    })
}

/// Update a product from the form.
pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Form(form): Form<ProductForm>,
) -> Result<Redirect> {
    let input = form.into_new_product()?;
    let updated = ProductRepository::new(state.pool())
        .update(ProductId::new(id), &input)
        .await?;

    if updated.is_none() {
        return Err(AppError::NotFound(format!("product {id}")));
    }

    Ok(Redirect::to("/admin/products?success=updated"))
}

/// Delete a product.
///
/// Order snapshots keep their own copies of product data, so history
/// survives the delete.
pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Redirect> {
    let deleted = ProductRepository::new(state.pool())
        .delete(ProductId::new(id))
        .await?;

    if !deleted {
        return Err(AppError::NotFound(format!("product {id}")));
    }

    tracing::info!(product_id = id, "product deleted");
    Ok(Redirect::to("/admin/products?success=deleted"))
}

/// Order table with status controls.
pub async fn orders(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<MessageQuery>,
) -> Result<AdminOrdersTemplate> {
    let orders = OrderRepository::new(state.pool()).list_all().await?;

    let ctx = PageContext::load(&session).await.with_messages(query);

    Ok(AdminOrdersTemplate {
        ctx,
        orders: orders.iter().map(OrderView::from).collect(),
        statuses: OrderStatus::ASSIGNABLE
            .iter()
            .map(|s| s.as_str())
            .collect(),
    })
}

/// Set an order's status.
///
/// Only the closed set of known statuses is accepted; anything else is a
/// validation error and the row is untouched.
pub async fn set_order_status(
    State(state): State<AppState>,
    Path(number): Path<String>,
    Json(body): Json<StatusForm>,
) -> Result<Json<StatusJson>> {
    let number = OrderNumber::parse(&number)
        .map_err(|_| AppError::NotFound(format!("order {number}")))?;

    let status = body
        .status
        .parse::<OrderStatus>()
        .map_err(AppError::Validation)?;

    let updated = OrderRepository::new(state.pool())
        .set_status(&number, status)
        .await?;

    if !updated {
        return Err(AppError::NotFound(format!("order {number}")));
    }

    tracing::info!(order_number = %number, status = %status, "order status updated");

    Ok(Json(StatusJson {
        success: true,
        status: status.to_string(),
    }))
}
