//! Modern Shop Core - Shared types library.
//!
//! This crate provides common types used across all Modern Shop components:
//! - `storefront` - Server-rendered e-commerce site (catalog, cart, checkout, admin)
//! - `cli` - Command-line tools for migrations and management
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access, no HTTP
//! clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, emails, order numbers,
//!   order statuses, and money conversions

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
