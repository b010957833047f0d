//! Checkout API Handlers

use axum::{
    Json,
    extract::{Path, State},
    http::HeaderMap,
};
use serde::Deserialize;

use crate::checkout::{Buyer, CheckoutOutcome};
use crate::core::ServerState;
use crate::payment::PaymentRequest;
use crate::utils::{AppError, AppResponse, AppResult, ok};

/// 单次下单的最大数量，防止一单扫空库存
const MAX_QUANTITY: i64 = 10;

/// 下单请求体
#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub product_id: String,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
    /// 是否用积分抵扣
    #[serde(default)]
    pub use_points: bool,
}

fn default_quantity() -> i64 {
    1
}

/// 从认证层注入的请求头中提取买家身份。
/// 三个头都可缺省 (游客下单)。
fn buyer_from_headers(headers: &HeaderMap) -> Buyer {
    let get = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };
    Buyer {
        user_id: get("x-user-id"),
        username: get("x-user-name"),
        email: get("x-user-email"),
    }
}

/// POST /api/checkout - 创建订单
pub async fn create(
    State(state): State<ServerState>,
    headers: HeaderMap,
    Json(req): Json<CreateOrderRequest>,
) -> AppResult<Json<AppResponse<CheckoutOutcome>>> {
    if req.product_id.trim().is_empty() {
        return Err(AppError::Validation("product_id is required".into()));
    }
    if req.quantity < 1 || req.quantity > MAX_QUANTITY {
        return Err(AppError::Validation(format!(
            "quantity must be between 1 and {MAX_QUANTITY}"
        )));
    }

    let buyer = buyer_from_headers(&headers);
    // Point redemption needs an identified buyer
    if req.use_points && buyer.user_id.is_none() {
        return Err(AppError::Validation(
            "points require an authenticated buyer".into(),
        ));
    }

    let outcome = state
        .checkout
        .create_order(&req.product_id, req.quantity, &buyer, req.use_points)
        .await?;
    Ok(ok(outcome))
}

/// POST /api/checkout/{order_id}/retry - 重新发起支付
pub async fn retry(
    State(state): State<ServerState>,
    Path(order_id): Path<String>,
    headers: HeaderMap,
) -> AppResult<Json<AppResponse<PaymentRequest>>> {
    let buyer = buyer_from_headers(&headers);
    let user_id = buyer
        .user_id
        .ok_or_else(|| AppError::Forbidden("authentication required".into()))?;

    let request = state.checkout.retry_payment(&order_id, &user_id).await?;
    Ok(ok(request))
}
