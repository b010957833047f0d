//! Checkout API 模块
//!
//! # 路由列表
//!
//! | 路径 | 方法 | 说明 |
//! |------|------|------|
//! | /api/checkout | POST | 创建订单 |
//! | /api/checkout/{order_id}/retry | POST | 为 pending 订单重新发起支付 |

mod handler;

use axum::{Router, routing::post};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/checkout", checkout_routes())
}

fn checkout_routes() -> Router<ServerState> {
    Router::new()
        .route("/", post(handler::create))
        .route("/{order_id}/retry", post(handler::retry))
}
