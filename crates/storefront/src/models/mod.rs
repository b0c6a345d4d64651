//! Domain models for the storefront.

pub mod cart;
pub mod order;
pub mod product;
pub mod session;
pub mod user;

pub use cart::{Cart, CartAction, CartError, CartLine};
pub use order::{NewOrder, Order, OrderItem, OrderItemsDoc};
pub use product::{NewProduct, Product};
pub use session::{CurrentUser, FlashNotice, session_keys};
pub use user::User;
