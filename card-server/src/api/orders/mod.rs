//! Order API 模块
//!
//! # 路由列表
//!
//! | 路径 | 方法 | 说明 |
//! |------|------|------|
//! | /api/orders/{order_id} | GET | 订单查询 (订单号即凭证) |

mod handler;

use axum::{Router, routing::get};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().route("/api/orders/{order_id}", get(handler::get_by_id))
}
