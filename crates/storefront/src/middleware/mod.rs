//! Request middleware: sessions, auth extractors, and the admin guard.

pub mod auth;
pub mod session;

pub use auth::{OptionalAuth, RequireAuth, clear_current_user, require_admin, set_current_user};
pub use session::create_session_layer;
