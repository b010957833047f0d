//! 支付模块 - epay 协议对接
//!
//! # 内容
//!
//! - [`sign`] - 请求签名与回调验签 (MD5, 固定外部契约)
//! - [`gateway`] - 网关订单状态查询客户端
//! - [`PaymentConfig`] - 商户配置
//! - [`PaymentRequest`] - 发往收银台的签名参数集

pub mod gateway;
pub mod sign;

pub use gateway::{EpayClient, GatewayError, PaymentGateway, PaymentStatus};

use serde::Serialize;
use std::collections::BTreeMap;

/// Merchant-side payment configuration
#[derive(Debug, Clone)]
pub struct PaymentConfig {
    /// Merchant id (`pid`)
    pub merchant_id: String,
    /// Shared secret appended before digesting
    pub merchant_key: String,
    /// Cashier submit endpoint the buyer is redirected to
    pub gateway_url: String,
    /// Gateway API base for order-status queries
    pub gateway_api_url: String,
    /// Public base URL of this shop (callback targets)
    pub app_url: String,
}

/// Signed payment request payload returned to the storefront.
///
/// `params` is ordered (BTreeMap) so the serialized form matches the
/// field order the signature was computed over.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentRequest {
    pub url: String,
    pub params: BTreeMap<String, String>,
}

impl PaymentConfig {
    /// Build a signed payment request for a payment attempt.
    ///
    /// `correlation_id` is the order id for the first attempt, or the
    /// retry-minted id for later ones; the gateway echoes it back in the
    /// confirmation callback.
    pub fn build_payment_request(
        &self,
        correlation_id: &str,
        order_id: &str,
        product_name: &str,
        amount: f64,
    ) -> PaymentRequest {
        let mut params = BTreeMap::new();
        params.insert("pid".to_string(), self.merchant_id.clone());
        params.insert("type".to_string(), "epay".to_string());
        params.insert("out_trade_no".to_string(), correlation_id.to_string());
        params.insert(
            "notify_url".to_string(),
            format!("{}/api/notify", self.app_url),
        );
        params.insert(
            "return_url".to_string(),
            format!("{}/callback/{}", self.app_url, order_id),
        );
        params.insert("name".to_string(), product_name.to_string());
        params.insert("money".to_string(), format!("{amount:.2}"));
        params.insert("sign_type".to_string(), "MD5".to_string());

        let signature = sign::generate_sign(&params, &self.merchant_key);
        params.insert("sign".to_string(), signature);

        PaymentRequest {
            url: self.gateway_url.clone(),
            params,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> PaymentConfig {
        PaymentConfig {
            merchant_id: "1001".into(),
            merchant_key: "secret".into(),
            gateway_url: "https://pay.example.com/submit.php".into(),
            gateway_api_url: "https://pay.example.com".into(),
            app_url: "https://shop.example.com".into(),
        }
    }

    #[test]
    fn payment_request_carries_signed_params() {
        let req = config().build_payment_request("o1", "o1", "Widget", 12.5);

        assert_eq!(req.url, "https://pay.example.com/submit.php");
        assert_eq!(req.params["money"], "12.50");
        assert_eq!(req.params["out_trade_no"], "o1");
        assert_eq!(req.params["notify_url"], "https://shop.example.com/api/notify");
        assert_eq!(req.params["return_url"], "https://shop.example.com/callback/o1");
        // The embedded signature must verify against the same key
        assert!(sign::verify_sign(&req.params, "secret"));
    }

    #[test]
    fn retry_correlation_id_differs_from_return_url_order() {
        let req = config().build_payment_request("o1_retry123", "o1", "Widget", 3.0);
        assert_eq!(req.params["out_trade_no"], "o1_retry123");
        // Buyer still lands on the original order page
        assert_eq!(req.params["return_url"], "https://shop.example.com/callback/o1");
    }
}
