//! CLI command implementations.

pub mod admin;
pub mod migrate;
pub mod seed;

/// Resolve the database URL the same way the storefront does.
pub(crate) fn database_url() -> Option<String> {
    std::env::var("STORE_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()
}
