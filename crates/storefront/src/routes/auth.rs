//! Authentication route handlers: login, registration, logout, account.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;

use crate::db::orders::OrderRepository;
use crate::error::Result;
use crate::filters;
use crate::middleware::{RequireAuth, clear_current_user, set_current_user};
use crate::models::CurrentUser;
use crate::routes::{MessageQuery, OrderView, PageContext};
use crate::services::auth::{AuthError, AuthService, Registration};
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Registration form data.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub ctx: PageContext,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub ctx: PageContext,
}

/// Account page template: profile plus order history.
#[derive(Template, WebTemplate)]
#[template(path = "auth/account.html")]
pub struct AccountTemplate {
    pub ctx: PageContext,
    pub name: String,
    pub email: String,
    pub orders: Vec<OrderView>,
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the login page.
pub async fn login_page(session: Session, Query(query): Query<MessageQuery>) -> LoginTemplate {
    let ctx = PageContext::load(&session).await.with_messages(query);
    LoginTemplate { ctx }
}

/// Handle login form submission.
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    let service = AuthService::new(state.pool());

    match service.login(&form.email, &form.password).await {
        Ok(user) => {
            // Rotate the session ID on privilege change
            session.cycle_id().await?;
            set_current_user(&session, &CurrentUser::from(&user)).await?;

            tracing::info!(user_id = %user.id, "user logged in");
            Ok(Redirect::to("/").into_response())
        }
        Err(AuthError::InvalidCredentials | AuthError::InvalidEmail(_)) => {
            Ok(Redirect::to("/auth/login?error=invalid_credentials").into_response())
        }
        Err(other) => Err(other.into()),
    }
}

/// Display the registration page.
pub async fn register_page(
    session: Session,
    Query(query): Query<MessageQuery>,
) -> RegisterTemplate {
    let ctx = PageContext::load(&session).await.with_messages(query);
    RegisterTemplate { ctx }
}

/// Handle registration form submission.
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> Result<Response> {
    let service = AuthService::new(state.pool());

    let registration = Registration {
        name: &form.name,
        email: &form.email,
        password: &form.password,
        phone: form.phone.as_deref(),
    };

    match service.register(registration).await {
        Ok(user) => {
            session.cycle_id().await?;
            set_current_user(&session, &CurrentUser::from(&user)).await?;

            tracing::info!(user_id = %user.id, "user registered");
            Ok(Redirect::to("/?success=welcome").into_response())
        }
        Err(AuthError::UserAlreadyExists) => {
            Ok(Redirect::to("/auth/register?error=email_taken").into_response())
        }
        Err(AuthError::MissingField(_)) => {
            Ok(Redirect::to("/auth/register?error=missing_fields").into_response())
        }
        Err(AuthError::InvalidEmail(_)) => {
            Ok(Redirect::to("/auth/register?error=invalid_email").into_response())
        }
        Err(AuthError::WeakPassword(_)) => {
            Ok(Redirect::to("/auth/register?error=weak_password").into_response())
        }
        Err(other) => Err(other.into()),
    }
}

/// Handle logout.
///
/// Clears the user but keeps the cart, so an interrupted shopper does not
/// lose their picks by logging out.
pub async fn logout(session: Session) -> Result<Redirect> {
    clear_current_user(&session).await?;
    Ok(Redirect::to("/"))
}

/// Account page: profile details and order history.
pub async fn account(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
) -> Result<AccountTemplate> {
    let orders = OrderRepository::new(state.pool())
        .list_for_email(&user.email)
        .await?;

    let ctx = PageContext::load(&session).await;

    Ok(AccountTemplate {
        ctx,
        name: user.name,
        email: user.email.to_string(),
        orders: orders.iter().map(OrderView::from).collect(),
    })
}
