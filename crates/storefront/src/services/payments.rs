//! Payment gateway client.
//!
//! Talks to the gateway's REST API to create payment intents, and verifies
//! the HMAC signature the gateway sends with its payment callback. The key
//! secret both authenticates API calls and keys the callback HMAC.

use hmac::{Hmac, Mac};
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha2::Sha256;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::instrument;

use modern_shop_core::OrderNumber;

use crate::config::PaymentGatewayConfig;

type HmacSha256 = Hmac<Sha256>;

/// Errors from payment gateway operations.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The HTTP request itself failed (after one retry for transient faults).
    #[error("gateway request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The gateway answered with a non-success status.
    #[error("gateway returned {status}: {message}")]
    Api {
        /// HTTP status code from the gateway.
        status: StatusCode,
        /// Response body, for the logs only.
        message: String,
    },

    /// The order total does not fit the gateway's integer minor units.
    #[error("amount exceeds the supported range")]
    AmountOverflow,

    /// The callback signature did not verify.
    #[error("invalid callback signature")]
    InvalidSignature,
}

/// A payment intent created at the gateway.
///
/// The `id` is the external reference the browser hands to the gateway
/// widget and the callback echoes back.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    /// Amount in minor currency units, echoed back by the gateway.
    pub amount: i64,
    pub currency: String,
}

/// Client for the payment gateway REST API.
///
/// Cheap to clone; the HTTP connection pool and credentials are shared.
#[derive(Clone)]
pub struct GatewayClient {
    inner: Arc<GatewayClientInner>,
}

struct GatewayClientInner {
    client: reqwest::Client,
    api_url: String,
    currency: String,
    key_id: String,
    key_secret: SecretString,
}

impl GatewayClient {
    /// Create a new gateway client from configuration.
    #[must_use]
    pub fn new(config: &PaymentGatewayConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();

        Self {
            inner: Arc::new(GatewayClientInner {
                client,
                api_url: config.api_url.trim_end_matches('/').to_owned(),
                currency: config.currency.clone(),
                key_id: config.key_id.clone(),
                key_secret: config.key_secret.clone(),
            }),
        }
    }

    /// The public key ID, embedded in the checkout page.
    #[must_use]
    pub fn key_id(&self) -> &str {
        &self.inner.key_id
    }

    /// The ISO currency code used for intents.
    #[must_use]
    pub fn currency(&self) -> &str {
        &self.inner.currency
    }

    /// Create a payment intent for `amount` minor units.
    ///
    /// Transient failures (timeout, connect) are retried once; anything
    /// else surfaces immediately.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Http`] if the request fails twice, or
    /// [`GatewayError::Api`] if the gateway rejects the intent.
    #[instrument(skip(self), fields(receipt = %receipt))]
    pub async fn create_intent(
        &self,
        amount: i64,
        receipt: &OrderNumber,
    ) -> Result<PaymentIntent, GatewayError> {
        let body = serde_json::json!({
            "amount": amount,
            "currency": self.inner.currency,
            "receipt": receipt.as_str(),
            "payment_capture": 1,
        });

        let mut response = self.send_create(&body).await;
        if let Err(e) = &response
            && is_transient(e)
        {
            tracing::warn!(error = %e, "gateway intent request failed, retrying once");
            response = self.send_create(&body).await;
        }
        let response = response?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GatewayError::Api { status, message });
        }

        let intent = response.json::<PaymentIntent>().await?;
        Ok(intent)
    }

    async fn send_create(
        &self,
        body: &serde_json::Value,
    ) -> Result<reqwest::Response, reqwest::Error> {
        self.inner
            .client
            .post(format!("{}/v1/orders", self.inner.api_url))
            .basic_auth(
                &self.inner.key_id,
                Some(self.inner.key_secret.expose_secret()),
            )
            .json(body)
            .send()
            .await
    }

    /// Verify a payment callback signature.
    ///
    /// The gateway signs `"{external_ref}|{payment_id}"` with HMAC-SHA256
    /// keyed by the key secret and sends the hex digest. Verification uses
    /// a constant-time comparison.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidSignature`] if the signature is not
    /// valid hex or does not match.
    pub fn verify_signature(
        &self,
        external_ref: &str,
        payment_id: &str,
        signature: &str,
    ) -> Result<(), GatewayError> {
        let mut mac =
            HmacSha256::new_from_slice(self.inner.key_secret.expose_secret().as_bytes())
                .map_err(|_| GatewayError::InvalidSignature)?;
        mac.update(format!("{external_ref}|{payment_id}").as_bytes());

        let provided = hex::decode(signature).map_err(|_| GatewayError::InvalidSignature)?;
        mac.verify_slice(&provided)
            .map_err(|_| GatewayError::InvalidSignature)
    }
}

/// Whether a request error is worth a single retry.
fn is_transient(error: &reqwest::Error) -> bool {
    error.is_timeout() || error.is_connect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn test_client(secret: &str) -> GatewayClient {
        GatewayClient::new(&PaymentGatewayConfig {
            api_url: "https://api.razorpay.com/".to_string(),
            currency: "INR".to_string(),
            key_id: "rzp_test_abc".to_string(),
            key_secret: SecretString::from(secret.to_owned()),
            timeout_secs: 10,
        })
    }

    fn sign(secret: &str, external_ref: &str, payment_id: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(format!("{external_ref}|{payment_id}").as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn test_valid_signature_accepted() {
        let client = test_client("k9Qw7zR2mX4vB8nC");
        let signature = sign("k9Qw7zR2mX4vB8nC", "order_abc123", "pay_xyz789");

        assert!(
            client
                .verify_signature("order_abc123", "pay_xyz789", &signature)
                .is_ok()
        );
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let client = test_client("k9Qw7zR2mX4vB8nC");
        let signature = sign("k9Qw7zR2mX4vB8nC", "order_abc123", "pay_xyz789");

        // Signature was computed over a different payment ID
        let result = client.verify_signature("order_abc123", "pay_other", &signature);
        assert!(matches!(result, Err(GatewayError::InvalidSignature)));
    }

    #[test]
    fn test_wrong_key_rejected() {
        let client = test_client("k9Qw7zR2mX4vB8nC");
        let signature = sign("different-key-entirely", "order_abc123", "pay_xyz789");

        let result = client.verify_signature("order_abc123", "pay_xyz789", &signature);
        assert!(matches!(result, Err(GatewayError::InvalidSignature)));
    }

    #[test]
    fn test_non_hex_signature_rejected() {
        let client = test_client("k9Qw7zR2mX4vB8nC");

        let result = client.verify_signature("order_abc123", "pay_xyz789", "not-hex!!");
        assert!(matches!(result, Err(GatewayError::InvalidSignature)));
    }

    #[test]
    fn test_api_url_trailing_slash_trimmed() {
        let client = test_client("k9Qw7zR2mX4vB8nC");
        assert_eq!(client.inner.api_url, "https://api.razorpay.com");
    }
}
