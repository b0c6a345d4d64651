//! Shared type definitions.
//!
//! Newtype wrappers and closed enums used across the storefront and CLI.

pub mod email;
pub mod id;
pub mod money;
pub mod order_number;
pub mod status;

pub use email::{Email, EmailError};
pub use id::{OrderId, ProductId, UserId};
pub use money::to_minor_units;
pub use order_number::{OrderNumber, OrderNumberError};
pub use status::OrderStatus;
