//! 支付回调 Handler
//!
//! epay 异步通知契约：
//! - 参数经 MD5 验签，验签失败一律 "fail"；
//! - 应答纯文本 "success" / "fail"，网关收到非 "success" 会重发；
//! - `out_trade_no` 是支付相关 ID，重试支付时带 `_retry{ts}` 后缀，
//!   处理前必须剥掉还原订单号。

use axum::extract::{Query, State};
use std::collections::BTreeMap;

use crate::core::ServerState;
use crate::payment::sign;

const TRADE_SUCCESS: &str = "TRADE_SUCCESS";

/// Recover the order id from a payment correlation id by stripping the
/// retry suffix, if any.
pub fn order_id_from_correlation(out_trade_no: &str) -> &str {
    match out_trade_no.find("_retry") {
        Some(pos) => &out_trade_no[..pos],
        None => out_trade_no,
    }
}

/// GET /api/notify - 网关异步支付确认
pub async fn notify(
    State(state): State<ServerState>,
    Query(params): Query<BTreeMap<String, String>>,
) -> String {
    if !sign::verify_sign(&params, &state.config.merchant_key) {
        tracing::warn!("notify rejected: bad signature");
        return "fail".to_string();
    }

    let trade_status = params.get("trade_status").map(String::as_str).unwrap_or("");
    if trade_status != TRADE_SUCCESS {
        // Authentic but not a success notification; acknowledge so the
        // gateway stops resending
        tracing::info!(trade_status, "notify ignored: not a success status");
        return "success".to_string();
    }

    let Some(out_trade_no) = params.get("out_trade_no") else {
        return "fail".to_string();
    };
    let Some(money) = params.get("money").and_then(|m| m.parse::<f64>().ok()) else {
        tracing::warn!(out_trade_no, "notify rejected: unparseable money");
        return "fail".to_string();
    };
    let trade_no = params.get("trade_no").map(String::as_str).unwrap_or("");

    let order_id = order_id_from_correlation(out_trade_no);
    match state.checkout.process_payment(order_id, money, trade_no).await {
        Ok(outcome) => {
            tracing::info!(order_id, trade_no, ?outcome, "payment notification processed");
            "success".to_string()
        }
        Err(e) => {
            tracing::error!(order_id, trade_no, error = %e, "payment notification failed");
            "fail".to_string()
        }
    }
}
