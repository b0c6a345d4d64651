//! Home page.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Query, State};
use tower_sessions::Session;

use crate::db::products::ProductRepository;
use crate::error::Result;
use crate::filters;
use crate::routes::{MessageQuery, PageContext, ProductCard};
use crate::state::AppState;

/// Products shown in the "latest arrivals" grid.
const LATEST_LIMIT: i64 = 8;

/// Products shown in the "deals" strip.
const FEATURED_LIMIT: i64 = 4;

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub ctx: PageContext,
    pub featured: Vec<ProductCard>,
    pub latest: Vec<ProductCard>,
    pub categories: &'static [&'static str],
}

/// Render the home page: a featured strip of discounted products above
/// the latest arrivals.
pub async fn home(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<MessageQuery>,
) -> Result<HomeTemplate> {
    let repo = ProductRepository::new(state.pool());
    let featured = repo.list_featured(FEATURED_LIMIT).await?;
    let latest = repo.list_latest(LATEST_LIMIT).await?;

    let ctx = PageContext::load(&session).await.with_messages(query);

    Ok(HomeTemplate {
        ctx,
        featured: featured.iter().map(ProductCard::from).collect(),
        latest: latest.iter().map(ProductCard::from).collect(),
        categories: crate::models::product::CATEGORIES,
    })
}
