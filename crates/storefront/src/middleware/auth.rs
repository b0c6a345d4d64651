//! Authentication middleware and extractors.
//!
//! Provides extractors for requiring a logged-in user in route handlers,
//! and the single `require_admin` guard that fronts every `/admin` route.

use axum::{
    Json,
    extract::{FromRequestParts, Request},
    http::{StatusCode, request::Parts},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::error::ApiFailure;
use crate::models::{CurrentUser, session_keys};

/// Whether a path belongs to the JSON API surface.
///
/// API requests get status-coded JSON rejections; browser requests get
/// redirects.
fn is_api_path(path: &str) -> bool {
    path.starts_with("/api/") || path.starts_with("/admin/api/")
}

/// Extractor that requires a logged-in user.
///
/// If nobody is logged in, browser requests are redirected to the login
/// page and API requests get `401 Unauthorized`.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(user): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", user.name)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

/// Error returned when authentication is required but nobody is logged in.
pub enum AuthRejection {
    /// Redirect to login page (for HTML requests).
    RedirectToLogin,
    /// Unauthorized response (for API requests).
    Unauthorized,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to("/auth/login").into_response(),
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                Json(ApiFailure::new("Please login first")),
            )
                .into_response(),
        }
    }
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Get the session from extensions (set by SessionManagerLayer)
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or(AuthRejection::Unauthorized)?;

        let user: CurrentUser = session
            .get(session_keys::CURRENT_USER)
            .await
            .ok()
            .flatten()
            .ok_or_else(|| {
                if is_api_path(parts.uri.path()) {
                    AuthRejection::Unauthorized
                } else {
                    AuthRejection::RedirectToLogin
                }
            })?;

        Ok(Self(user))
    }
}

/// Extractor that optionally gets the current user.
///
/// Unlike `RequireAuth`, this does not reject the request if nobody is
/// logged in.
pub struct OptionalAuth(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = match parts.extensions.get::<Session>() {
            Some(session) => session
                .get::<CurrentUser>(session_keys::CURRENT_USER)
                .await
                .ok()
                .flatten(),
            None => None,
        };

        Ok(Self(user))
    }
}

/// Guard for the `/admin` subtree.
///
/// This is the only place admin access is decided: the whole admin router
/// sits behind it via `route_layer`, so no individual handler re-checks
/// the flag. Non-admins get a redirect home (pages) or `403` (API).
pub async fn require_admin(session: Session, request: Request, next: Next) -> Response {
    let user: Option<CurrentUser> = session
        .get(session_keys::CURRENT_USER)
        .await
        .ok()
        .flatten();

    match user {
        Some(user) if user.is_admin => next.run(request).await,
        _ => {
            if is_api_path(request.uri().path()) {
                (
                    StatusCode::FORBIDDEN,
                    Json(ApiFailure::new("Access denied")),
                )
                    .into_response()
            } else {
                Redirect::to("/?error=access_denied").into_response()
            }
        }
    }
}

/// Helper to set the current user in the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Helper to clear the current user from the session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session
        .remove::<CurrentUser>(session_keys::CURRENT_USER)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_path_detection() {
        assert!(is_api_path("/api/cart/count"));
        assert!(is_api_path("/admin/api/orders/ORD0000000001/status"));
        assert!(!is_api_path("/cart"));
        assert!(!is_api_path("/admin/products"));
        assert!(!is_api_path("/"));
    }
}
