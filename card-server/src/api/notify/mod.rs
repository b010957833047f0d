//! 支付回调 API 模块
//!
//! # 路由列表
//!
//! | 路径 | 方法 | 说明 |
//! |------|------|------|
//! | /api/notify | GET | 网关异步支付确认 (外部契约，纯文本应答) |

mod handler;

pub use handler::order_id_from_correlation;

use axum::{Router, routing::get};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().route("/api/notify", get(handler::notify))
}
