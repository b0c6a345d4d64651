//! User account types.

use chrono::{DateTime, Utc};

use modern_shop_core::{Email, UserId};

/// A registered account.
///
/// The password hash is never part of this struct; it is fetched separately
/// by the auth service and dropped as soon as verification completes.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: Email,
    pub phone: Option<String>,
    /// Grants access to the `/admin` back office.
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}
