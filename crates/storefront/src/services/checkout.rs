//! Checkout orchestrator.
//!
//! Checkout runs in four phases:
//!
//! 1. **Validate** - join the cart against the catalog and check stock.
//! 2. **Place** - inside one transaction, conditionally debit stock for
//!    every line and insert the order with a versioned item snapshot. A
//!    failed debit rolls the whole transaction back; an order number
//!    collision is retried once with a fresh number.
//! 3. **Start payment** - create a payment intent at the gateway and
//!    attach its reference to the order. The order stays `Created` if the
//!    gateway is down; no stock is returned.
//! 4. **Confirm** - verify the callback signature, then mark the matching
//!    order paid. An unknown reference is a ledger no-op.

use rust_decimal::Decimal;
use sqlx::{Acquire, PgPool};
use tracing::instrument;

use modern_shop_core::{Email, OrderNumber, OrderStatus, to_minor_units};

use crate::db::RepositoryError;
use crate::db::orders::OrderRepository;
use crate::db::products::ProductRepository;
use crate::models::cart::{Cart, CartLine};
use crate::models::order::{NewOrder, Order, OrderItem, OrderItemsDoc};
use crate::models::user::User;
use crate::services::payments::{GatewayClient, GatewayError};

/// Errors from the checkout flow.
#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    /// The cart has no purchasable lines.
    #[error("cart is empty")]
    EmptyCart,

    /// A line wants more units than the catalog has.
    #[error("{name} has only {available} items in stock")]
    OutOfStock {
        /// Product display name.
        name: String,
        /// Units currently available.
        available: i32,
    },

    /// Two fresh order numbers collided in a row; give up.
    #[error("could not allocate an order number")]
    OrderNumberCollision,

    /// The order total does not fit the gateway's integer minor units.
    #[error("order total exceeds the supported range")]
    AmountOverflow,

    /// Database failure.
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// Payment gateway failure.
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// Buyer contact details forwarded to the payment sheet.
#[derive(Debug, Clone, serde::Serialize)]
pub struct BuyerContact {
    pub name: String,
    pub email: Email,
    pub phone: String,
}

/// Everything the browser needs to open the gateway's payment widget.
#[derive(Debug, Clone)]
pub struct CheckoutPayload {
    /// Gateway payment intent reference.
    pub external_ref: String,
    /// Amount in minor currency units.
    pub amount: i64,
    pub currency: String,
    /// Public gateway key ID.
    pub key: String,
    /// Store display name shown on the payment sheet.
    pub store_name: String,
    pub description: String,
    /// Our order number, passed through as the receipt.
    pub receipt: OrderNumber,
    pub buyer: BuyerContact,
}

/// Placeholder shown on the payment sheet when the buyer has no phone.
const PHONE_PLACEHOLDER: &str = "9999999999";

/// The checkout orchestrator.
pub struct CheckoutService<'a> {
    pool: &'a PgPool,
    gateway: &'a GatewayClient,
    store_name: &'a str,
}

impl<'a> CheckoutService<'a> {
    /// Create a new checkout service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, gateway: &'a GatewayClient, store_name: &'a str) -> Self {
        Self {
            pool,
            gateway,
            store_name,
        }
    }

    /// Phase 1: join the cart against the catalog and check stock.
    ///
    /// Lines whose product vanished are dropped. This is advisory only;
    /// [`Self::place_order`] re-checks atomically.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::EmptyCart`] if nothing purchasable remains,
    /// or [`CheckoutError::OutOfStock`] naming the first short line.
    pub async fn validate_cart(&self, cart: &Cart) -> Result<Vec<CartLine>, CheckoutError> {
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let ids: Vec<_> = cart.product_ids().collect();
        let products = ProductRepository::new(self.pool).get_many(&ids).await?;

        for product in &products {
            let wanted = cart.quantity(product.id);
            if i64::from(wanted) > i64::from(product.stock) {
                return Err(CheckoutError::OutOfStock {
                    name: product.name.clone(),
                    available: product.stock,
                });
            }
        }

        let lines = cart.line_items(&products);
        if lines.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        Ok(lines)
    }

    /// Phase 2: atomically debit stock and persist the order.
    ///
    /// All stock debits and the order insert share one transaction, so a
    /// concurrent checkout that wins the last unit makes this one roll
    /// back completely. The order number is regenerated once if it
    /// collides with an existing order.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::OutOfStock`] if any debit fails,
    /// [`CheckoutError::OrderNumberCollision`] after two collisions, or a
    /// repository error.
    #[instrument(skip(self, user, cart), fields(user_id = %user.id))]
    pub async fn place_order(&self, user: &User, cart: &Cart) -> Result<Order, CheckoutError> {
        let lines = self.validate_cart(cart).await?;
        let total: Decimal = lines.iter().map(|line| line.line_total).sum();
        let items = OrderItemsDoc::new(lines.iter().cloned().map(OrderItem::from).collect());

        let mut tx = self.pool.begin().await.map_err(RepositoryError::from)?;

        for line in &lines {
            let quantity = i32::try_from(line.quantity).unwrap_or(i32::MAX);
            let debited = ProductRepository::debit_stock(&mut tx, line.product_id, quantity).await?;
            if !debited {
                // Rolls back every debit made so far
                drop(tx);
                let available = ProductRepository::new(self.pool)
                    .get(line.product_id)
                    .await?
                    .map_or(0, |p| p.stock);
                return Err(CheckoutError::OutOfStock {
                    name: line.name.clone(),
                    available,
                });
            }
        }

        let mut number = OrderNumber::generate();
        let mut retried = false;
        let order = loop {
            let new_order = NewOrder {
                order_number: &number,
                user_id: user.id,
                user_email: &user.email,
                items: &items,
                total,
                status: OrderStatus::Created,
            };

            // A unique violation puts the surrounding Postgres transaction
            // into an aborted state, so the insert runs inside a savepoint
            // that can be rolled back without losing the stock debits.
            let mut savepoint = tx.begin().await.map_err(RepositoryError::from)?;
            match OrderRepository::insert_in(&mut savepoint, &new_order).await {
                Ok(order) => {
                    savepoint.commit().await.map_err(RepositoryError::from)?;
                    break order;
                }
                // Regenerate once on a collision, then give up
                Err(RepositoryError::Conflict(_)) => {
                    savepoint.rollback().await.map_err(RepositoryError::from)?;
                    if retried {
                        return Err(CheckoutError::OrderNumberCollision);
                    }
                    retried = true;
                    number = OrderNumber::generate();
                }
                Err(other) => return Err(other.into()),
            }
        };

        tx.commit().await.map_err(RepositoryError::from)?;

        tracing::info!(
            order_number = %order.order_number,
            total = %order.total,
            "order placed"
        );

        Ok(order)
    }

    /// Phase 3: create a payment intent and attach it to the order.
    ///
    /// If the gateway call fails the order stays `Created` with stock
    /// debited; the failure surfaces to the buyer.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::AmountOverflow`] if the total does not
    /// convert to minor units, or a gateway/repository error.
    #[instrument(skip(self, order, buyer), fields(order_number = %order.order_number))]
    pub async fn start_payment(
        &self,
        order: &Order,
        buyer: &User,
    ) -> Result<CheckoutPayload, CheckoutError> {
        let amount = to_minor_units(order.total).ok_or(CheckoutError::AmountOverflow)?;

        let intent = self.gateway.create_intent(amount, &order.order_number).await?;

        OrderRepository::new(self.pool)
            .set_payment_ref(order.id, &intent.id)
            .await?;

        let phone = buyer
            .phone
            .clone()
            .unwrap_or_else(|| PHONE_PLACEHOLDER.to_owned());

        Ok(CheckoutPayload {
            external_ref: intent.id,
            amount,
            currency: self.gateway.currency().to_owned(),
            key: self.gateway.key_id().to_owned(),
            store_name: self.store_name.to_owned(),
            description: format!("Payment for {}", order.order_number),
            receipt: order.order_number.clone(),
            buyer: BuyerContact {
                name: buyer.name.clone(),
                email: buyer.email.clone(),
                phone,
            },
        })
    }

    /// Phase 4: verify the callback signature and mark the order paid.
    ///
    /// Signature verification happens before any database access; a bad
    /// signature changes nothing. A valid signature whose reference
    /// matches no order returns `Ok(None)` - the ledger is untouched but
    /// the caller may still clean up its session.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidSignature`] (wrapped) if the
    /// signature does not verify, or a repository error.
    #[instrument(skip(self, signature))]
    pub async fn confirm_payment(
        &self,
        external_ref: &str,
        payment_id: &str,
        signature: &str,
    ) -> Result<Option<Order>, CheckoutError> {
        self.gateway
            .verify_signature(external_ref, payment_id, signature)?;

        let orders = OrderRepository::new(self.pool);
        let Some(order) = orders.find_by_payment_ref(external_ref).await? else {
            tracing::warn!(external_ref, "verified callback matched no order");
            return Ok(None);
        };

        orders.record_payment(order.id, payment_id).await?;

        tracing::info!(order_number = %order.order_number, "payment confirmed");

        Ok(Some(order))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use hmac::{Hmac, Mac};
    use secrecy::SecretString;
    use sha2::Sha256;
    use sqlx::PgPool;

    use super::*;
    use crate::config::PaymentGatewayConfig;
    use crate::models::product::{NewProduct, Product};

    const TEST_SECRET: &str = "k9Qw7zR2mX4vB8nC";

    #[test]
    fn test_phone_placeholder_shape() {
        assert_eq!(PHONE_PLACEHOLDER.len(), 10);
        assert!(PHONE_PLACEHOLDER.bytes().all(|b| b.is_ascii_digit()));
    }

    fn test_gateway() -> GatewayClient {
        GatewayClient::new(&PaymentGatewayConfig {
            api_url: "https://api.razorpay.com".to_string(),
            currency: "INR".to_string(),
            key_id: "rzp_test_abc".to_string(),
            key_secret: SecretString::from(TEST_SECRET.to_owned()),
            timeout_secs: 10,
        })
    }

    fn sign(external_ref: &str, payment_id: &str) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(TEST_SECRET.as_bytes()).unwrap();
        mac.update(format!("{external_ref}|{payment_id}").as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    async fn seed_user(pool: &PgPool) -> User {
        sqlx::query_as::<_, User>(
            "INSERT INTO users (name, email, password_hash) VALUES ($1, $2, $3) \
             RETURNING id, name, email, phone, is_admin, created_at",
        )
        .bind("Asha Rao")
        .bind("asha@example.com")
        .bind("not-a-real-hash")
        .fetch_one(pool)
        .await
        .unwrap()
    }

    async fn seed_product(pool: &PgPool, name: &str, price: i64, stock: i32) -> Product {
        ProductRepository::new(pool)
            .create(&NewProduct {
                name: name.to_owned(),
                description: String::new(),
                price: Decimal::from(price),
                discount_price: None,
                category: "Electronics".to_owned(),
                image: String::new(),
                stock,
            })
            .await
            .unwrap()
    }

    async fn stock_of(pool: &PgPool, product: &Product) -> i32 {
        ProductRepository::new(pool)
            .get(product.id)
            .await
            .unwrap()
            .unwrap()
            .stock
    }

    #[sqlx::test]
    #[ignore = "Requires a live Postgres (DATABASE_URL)"]
    async fn test_place_order_debits_stock_and_snapshots_cart(pool: PgPool) {
        let gateway = test_gateway();
        let service = CheckoutService::new(&pool, &gateway, "Test Store");
        let user = seed_user(&pool).await;
        let mouse = seed_product(&pool, "Wireless Mouse", 100, 5).await;
        let lamp = seed_product(&pool, "Desk Lamp", 50, 3).await;

        let mut cart = Cart::default();
        cart.add(&mouse, 2).unwrap();
        cart.add(&lamp, 3).unwrap();

        let order = service.place_order(&user, &cart).await.unwrap();

        assert_eq!(order.status, OrderStatus::Created);
        assert_eq!(order.total, Decimal::from(350));
        assert_eq!(order.user_email, user.email);
        assert_eq!(order.items.items.len(), 2);
        assert_eq!(order.items.unit_count(), 5);

        // Stock went down by exactly the purchased quantities
        assert_eq!(stock_of(&pool, &mouse).await, 3);
        assert_eq!(stock_of(&pool, &lamp).await, 0);

        assert_eq!(OrderRepository::new(&pool).count().await.unwrap(), 1);
    }

    #[sqlx::test]
    #[ignore = "Requires a live Postgres (DATABASE_URL)"]
    async fn test_place_order_rejects_stale_cart_without_side_effects(pool: PgPool) {
        let gateway = test_gateway();
        let service = CheckoutService::new(&pool, &gateway, "Test Store");
        let user = seed_user(&pool).await;
        let lamp = seed_product(&pool, "Desk Lamp", 50, 2).await;

        let mut cart = Cart::default();
        cart.add(&lamp, 2).unwrap();

        // Someone else bought a unit after the cart was filled
        sqlx::query("UPDATE products SET stock = 1 WHERE id = $1")
            .bind(lamp.id)
            .execute(&pool)
            .await
            .unwrap();

        let err = service.place_order(&user, &cart).await.unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::OutOfStock { available: 1, .. }
        ));

        // Nothing was debited and no order was written
        assert_eq!(stock_of(&pool, &lamp).await, 1);
        assert_eq!(OrderRepository::new(&pool).count().await.unwrap(), 0);
    }

    #[sqlx::test]
    #[ignore = "Requires a live Postgres (DATABASE_URL)"]
    async fn test_failed_debit_rolls_back_earlier_debits(pool: PgPool) {
        let mouse = seed_product(&pool, "Wireless Mouse", 100, 5).await;
        let lamp = seed_product(&pool, "Desk Lamp", 50, 1).await;

        let mut tx = pool.begin().await.unwrap();
        assert!(
            ProductRepository::debit_stock(&mut tx, mouse.id, 2)
                .await
                .unwrap()
        );
        assert!(
            !ProductRepository::debit_stock(&mut tx, lamp.id, 2)
                .await
                .unwrap()
        );
        // Checkout abandons the transaction when a debit fails
        drop(tx);

        assert_eq!(stock_of(&pool, &mouse).await, 5);
        assert_eq!(stock_of(&pool, &lamp).await, 1);
    }

    #[sqlx::test]
    #[ignore = "Requires a live Postgres (DATABASE_URL)"]
    async fn test_confirm_payment_marks_order_paid(pool: PgPool) {
        let gateway = test_gateway();
        let service = CheckoutService::new(&pool, &gateway, "Test Store");
        let user = seed_user(&pool).await;
        let mouse = seed_product(&pool, "Wireless Mouse", 100, 5).await;

        let mut cart = Cart::default();
        cart.add(&mouse, 1).unwrap();
        let order = service.place_order(&user, &cart).await.unwrap();

        let orders = OrderRepository::new(&pool);
        orders.set_payment_ref(order.id, "order_live_42").await.unwrap();

        let signature = sign("order_live_42", "pay_77");
        let confirmed = service
            .confirm_payment("order_live_42", "pay_77", &signature)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(confirmed.order_number, order.order_number);

        let stored = orders
            .find_by_number(&order.order_number)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, OrderStatus::Paid);
        assert_eq!(stored.payment_id.as_deref(), Some("pay_77"));
    }

    #[sqlx::test]
    #[ignore = "Requires a live Postgres (DATABASE_URL)"]
    async fn test_confirm_payment_unknown_reference_touches_nothing(pool: PgPool) {
        let gateway = test_gateway();
        let service = CheckoutService::new(&pool, &gateway, "Test Store");
        let user = seed_user(&pool).await;
        let mouse = seed_product(&pool, "Wireless Mouse", 100, 5).await;

        let mut cart = Cart::default();
        cart.add(&mouse, 1).unwrap();
        let order = service.place_order(&user, &cart).await.unwrap();

        let orders = OrderRepository::new(&pool);
        orders.set_payment_ref(order.id, "order_live_42").await.unwrap();

        // Validly signed callback for a reference we never issued
        let signature = sign("order_ghost", "pay_77");
        let confirmed = service
            .confirm_payment("order_ghost", "pay_77", &signature)
            .await
            .unwrap();
        assert!(confirmed.is_none());

        let stored = orders
            .find_by_number(&order.order_number)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, OrderStatus::Created);
        assert!(stored.payment_id.is_none());
    }

    #[sqlx::test]
    #[ignore = "Requires a live Postgres (DATABASE_URL)"]
    async fn test_confirm_payment_bad_signature_changes_nothing(pool: PgPool) {
        let gateway = test_gateway();
        let service = CheckoutService::new(&pool, &gateway, "Test Store");
        let user = seed_user(&pool).await;
        let mouse = seed_product(&pool, "Wireless Mouse", 100, 5).await;

        let mut cart = Cart::default();
        cart.add(&mouse, 1).unwrap();
        let order = service.place_order(&user, &cart).await.unwrap();

        let orders = OrderRepository::new(&pool);
        orders.set_payment_ref(order.id, "order_live_42").await.unwrap();

        // Signature computed over a different payment ID
        let signature = sign("order_live_42", "pay_other");
        let result = service
            .confirm_payment("order_live_42", "pay_77", &signature)
            .await;
        assert!(matches!(
            result,
            Err(CheckoutError::Gateway(GatewayError::InvalidSignature))
        ));

        let stored = orders
            .find_by_number(&order.order_number)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, OrderStatus::Created);
        assert!(stored.payment_id.is_none());
    }
}
