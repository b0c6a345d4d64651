//! Catalog listing and product detail pages.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tower_sessions::Session;

use modern_shop_core::ProductId;

use crate::db::products::{ProductFilter, ProductRepository};
use crate::error::Result;
use crate::filters;
use crate::routes::{MessageQuery, NotFoundTemplate, PageContext, ProductCard};
use crate::state::AppState;

/// Related products shown under the detail page.
const RELATED_LIMIT: i64 = 4;

/// Query parameters for catalog filtering.
#[derive(Debug, Default, Deserialize)]
pub struct CatalogQuery {
    pub category: Option<String>,
    pub search: Option<String>,
    pub error: Option<String>,
    pub success: Option<String>,
}

/// Catalog listing template.
#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct ProductIndexTemplate {
    pub ctx: PageContext,
    pub products: Vec<ProductCard>,
    pub categories: &'static [&'static str],
    /// Currently selected category, for nav highlighting.
    pub category: Option<String>,
    /// Current search term, echoed into the search box.
    pub search: Option<String>,
}

/// Product detail template.
#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub ctx: PageContext,
    pub product: ProductCard,
    pub related: Vec<ProductCard>,
}

/// Catalog listing with optional category and name search filters.
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<CatalogQuery>,
) -> Result<ProductIndexTemplate> {
    // Empty filter values mean "no filter"
    let category = query.category.filter(|c| !c.is_empty());
    let search = query
        .search
        .map(|s| s.trim().to_owned())
        .filter(|s| !s.is_empty());

    let filter = ProductFilter {
        category: category.clone(),
        search: search.clone(),
    };
    let products = ProductRepository::new(state.pool()).list(&filter).await?;

    let ctx = PageContext::load(&session).await.with_messages(MessageQuery {
        error: query.error,
        success: query.success,
    });

    Ok(ProductIndexTemplate {
        ctx,
        products: products.iter().map(ProductCard::from).collect(),
        categories: crate::models::product::CATEGORIES,
        category,
        search,
    })
}

/// Product detail page with related products from the same category.
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
) -> Result<Response> {
    let repo = ProductRepository::new(state.pool());
    let ctx = PageContext::load(&session).await;

    let Some(product) = repo.get(ProductId::new(id)).await? else {
        return Ok((StatusCode::NOT_FOUND, NotFoundTemplate { ctx }).into_response());
    };

    let related = repo
        .list_related(&product.category, product.id, RELATED_LIMIT)
        .await?;

    Ok(ProductShowTemplate {
        ctx,
        product: ProductCard::from(&product),
        related: related.iter().map(ProductCard::from).collect(),
    }
    .into_response())
}
