//! Payment gateway query client
//!
//! The engine consults the gateway for ground truth about an order
//! before taking over its expired reservation. Transport failures are
//! surfaced as [`GatewayError`], distinct from "not paid": callers on
//! hygiene paths swallow them, the allocator treats them as not-proven-
//! paid and proceeds to steal.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

/// Gateway query errors
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Gateway transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Gateway returned an invalid response: {0}")]
    InvalidResponse(String),
}

/// Result of an order-status query
#[derive(Debug, Clone, Copy)]
pub struct PaymentStatus {
    pub success: bool,
    /// Gateway status code; 1 = paid
    pub status: i32,
}

impl PaymentStatus {
    pub fn is_paid(&self) -> bool {
        self.success && self.status == 1
    }
}

/// Order-status query contract consumed by the allocator, reconciler
/// and reclaimer
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Query the payment status for a correlation id
    async fn query_order_status(&self, correlation_id: &str)
    -> Result<PaymentStatus, GatewayError>;
}

#[derive(Debug, Deserialize)]
struct EpayOrderResponse {
    code: i32,
    #[serde(default)]
    status: i32,
    #[serde(default)]
    msg: Option<String>,
}

/// epay HTTP client (`api.php?act=order`)
pub struct EpayClient {
    http: reqwest::Client,
    api_url: String,
    merchant_id: String,
    merchant_key: String,
}

impl EpayClient {
    pub fn new(api_url: &str, merchant_id: &str, merchant_key: &str) -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            merchant_id: merchant_id.to_string(),
            merchant_key: merchant_key.to_string(),
        }
    }
}

#[async_trait]
impl PaymentGateway for EpayClient {
    async fn query_order_status(
        &self,
        correlation_id: &str,
    ) -> Result<PaymentStatus, GatewayError> {
        let url = format!("{}/api.php", self.api_url);
        let response = self
            .http
            .get(&url)
            .query(&[
                ("act", "order"),
                ("pid", self.merchant_id.as_str()),
                ("key", self.merchant_key.as_str()),
                ("out_trade_no", correlation_id),
            ])
            .send()
            .await?
            .error_for_status()?;

        let body: EpayOrderResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;

        if body.code != 1 {
            // Query executed but the gateway rejected it (unknown trade
            // no is the common case) — that's "not paid", not an error
            tracing::debug!(
                correlation_id,
                code = body.code,
                msg = body.msg.as_deref().unwrap_or(""),
                "gateway order query unsuccessful"
            );
            return Ok(PaymentStatus {
                success: false,
                status: 0,
            });
        }

        Ok(PaymentStatus {
            success: true,
            status: body.status,
        })
    }
}
