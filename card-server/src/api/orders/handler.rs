//! Order API Handlers

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Serialize;

use crate::core::ServerState;
use crate::db::repository;
use crate::utils::{AppError, AppResponse, AppResult, ok};
use shared::models::{Order, OrderStatus};

/// 订单查询响应 (对外视图，不含买家联系方式)
#[derive(Debug, Serialize)]
pub struct OrderView {
    pub order_id: String,
    pub product_id: String,
    pub product_name: String,
    pub quantity: i64,
    pub amount: f64,
    pub status: OrderStatus,
    pub points_used: i64,
    /// 发货后的卡密 (换行分隔)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_key: Option<String>,
    pub created_at: i64,
    pub paid_at: Option<i64>,
    pub delivered_at: Option<i64>,
}

impl From<Order> for OrderView {
    fn from(o: Order) -> Self {
        Self {
            order_id: o.order_id,
            product_id: o.product_id,
            product_name: o.product_name,
            quantity: o.quantity,
            amount: o.amount,
            status: o.status,
            points_used: o.points_used,
            card_key: o.card_key,
            created_at: o.created_at,
            paid_at: o.paid_at,
            delivered_at: o.delivered_at,
        }
    }
}

/// GET /api/orders/{order_id} - 订单查询
///
/// pending 订单会顺带向网关求证一次当前支付尝试：买家付完款
/// 回到订单页时，即使异步回调还没到，也能当场完成发货。
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(order_id): Path<String>,
) -> AppResult<Json<AppResponse<OrderView>>> {
    let mut order = repository::order::find_by_id(state.pool(), &order_id)
        .await
        .map_err(|e| AppError::database(e.to_string()))?
        .ok_or(AppError::OrderNotFound)?;

    if order.status == OrderStatus::Pending
        && let Some(payment_id) = order.current_payment_id.clone()
    {
        match state.gateway.query_order_status(&payment_id).await {
            Ok(status) if status.is_paid() => {
                // Fulfill now instead of waiting for the async callback.
                // The gateway confirmed this correlation id, so the order
                // amount is the paid amount.
                state
                    .checkout
                    .process_payment(&order.order_id, order.amount, &payment_id)
                    .await?;
                order = repository::order::find_by_id(state.pool(), &order_id)
                    .await
                    .map_err(|e| AppError::database(e.to_string()))?
                    .ok_or(AppError::OrderNotFound)?;
            }
            Ok(_) => {}
            Err(e) => {
                // Probe is opportunistic; the query endpoint still answers
                tracing::debug!(order_id, error = %e, "payment probe failed on order query");
            }
        }
    }

    Ok(ok(OrderView::from(order)))
}
