//! Payment gateway client
//!
//! The marketplace talks to Razorpay's REST API for order creation and
//! refunds. Checkout results are verified locally with the HMAC signature the
//! gateway hands to the client.

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::collections::BTreeMap;
use std::env;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};

type HmacSha256 = Hmac<Sha256>;

pub const DEFAULT_BASE_URL: &str = "https://api.razorpay.com";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Gateway configuration error: {0}")]
    Configuration(String),

    #[error("Gateway request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Gateway rejected the request with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Order creation payload
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct OrderRequest {
    /// Minor currency units
    pub amount: i64,
    pub currency: String,
    pub receipt: String,
    pub notes: BTreeMap<String, String>,
}

/// Order as tracked by the gateway
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExternalOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    pub receipt: Option<String>,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GatewayRefund {
    pub id: String,
    pub amount: i64,
    pub status: String,
}

/// Operations the booking flow needs from a payment provider
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_order(&self, request: OrderRequest) -> Result<ExternalOrder, GatewayError>;

    async fn refund(&self, payment_id: &str, amount: i64) -> Result<GatewayRefund, GatewayError>;

    /// Check the checkout signature for `order_id` and `payment_id`
    fn verify_signature(&self, order_id: &str, payment_id: &str, signature: &str) -> bool;
}

fn checkout_mac(secret: &str, order_id: &str, payment_id: &str) -> Option<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(order_id.as_bytes());
    mac.update(b"|");
    mac.update(payment_id.as_bytes());
    Some(mac)
}

/// Hex HMAC-SHA256 of `order_id|payment_id` keyed by the gateway secret
pub fn checkout_signature(secret: &str, order_id: &str, payment_id: &str) -> Option<String> {
    checkout_mac(secret, order_id, payment_id).map(|mac| hex::encode(mac.finalize().into_bytes()))
}

/// Constant-time comparison of a hex checkout signature
pub fn verify_checkout_signature(
    secret: &str,
    order_id: &str,
    payment_id: &str,
    signature: &str,
) -> bool {
    let Ok(expected) = hex::decode(signature.trim()) else {
        return false;
    };
    checkout_mac(secret, order_id, payment_id)
        .is_some_and(|mac| mac.verify_slice(&expected).is_ok())
}

/// Razorpay configuration
#[derive(Debug, Clone)]
pub struct RazorpayConfig {
    pub key_id: String,
    pub key_secret: String,
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout: u64,
}

impl RazorpayConfig {
    /// Create a new RazorpayConfig from environment variables
    ///
    /// # Environment Variables
    /// - `RAZORPAY_KEY_ID`: API key id (required)
    /// - `RAZORPAY_KEY_SECRET`: API key secret (required)
    /// - `RAZORPAY_BASE_URL`: API base URL (default: https://api.razorpay.com)
    /// - `RAZORPAY_TIMEOUT`: Request timeout in seconds (default: 10)
    pub fn from_env() -> Result<Self, GatewayError> {
        let key_id = env::var("RAZORPAY_KEY_ID").map_err(|_| {
            GatewayError::Configuration("RAZORPAY_KEY_ID environment variable not set".to_string())
        })?;
        let key_secret = env::var("RAZORPAY_KEY_SECRET").map_err(|_| {
            GatewayError::Configuration(
                "RAZORPAY_KEY_SECRET environment variable not set".to_string(),
            )
        })?;

        let base_url = env::var("RAZORPAY_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let timeout = env::var("RAZORPAY_TIMEOUT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Ok(Self {
            key_id,
            key_secret,
            base_url,
            timeout,
        })
    }
}

/// Razorpay REST client
#[derive(Debug, Clone)]
pub struct RazorpayGateway {
    client: reqwest::Client,
    config: RazorpayConfig,
}

impl RazorpayGateway {
    pub fn new(config: RazorpayConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .build()?;

        Ok(Self { client, config })
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, GatewayError>
    where
        B: Serialize + ?Sized + Sync,
        T: for<'de> Deserialize<'de>,
    {
        let url = format!("{}{}", self.config.base_url, path);

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.config.key_id, Some(&self.config.key_secret))
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(response.json().await?)
        } else {
            let body = response.text().await.unwrap_or_default();
            error!("Gateway call to {} failed with {}: {}", path, status, body);
            Err(GatewayError::Rejected {
                status: status.as_u16(),
                body,
            })
        }
    }
}

#[async_trait]
impl PaymentGateway for RazorpayGateway {
    async fn create_order(&self, request: OrderRequest) -> Result<ExternalOrder, GatewayError> {
        let order: ExternalOrder = self.post("/v1/orders", &request).await?;
        info!(order_id = %order.id, amount = order.amount, "Created gateway order");
        Ok(order)
    }

    async fn refund(&self, payment_id: &str, amount: i64) -> Result<GatewayRefund, GatewayError> {
        let path = format!("/v1/payments/{}/refund", payment_id);
        let body = serde_json::json!({ "amount": amount });
        let refund: GatewayRefund = self.post(&path, &body).await?;
        info!(refund_id = %refund.id, payment_id, amount, "Issued gateway refund");
        Ok(refund)
    }

    fn verify_signature(&self, order_id: &str, payment_id: &str, signature: &str) -> bool {
        verify_checkout_signature(&self.config.key_secret, order_id, payment_id, signature)
    }
}
