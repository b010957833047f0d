//! API 路由模块
//!
//! # 结构
//!
//! - [`health`] - 健康检查
//! - [`checkout`] - 下单 / 重新支付接口
//! - [`notify`] - 支付网关异步回调
//! - [`orders`] - 订单查询接口

pub mod checkout;
pub mod health;
pub mod notify;
pub mod orders;

use crate::core::ServerState;
use axum::Router;

// Re-export common types for handlers
pub use crate::utils::{AppResponse, AppResult};

/// 组合全部 API 路由
pub fn router() -> Router<ServerState> {
    Router::new()
        .merge(health::router())
        .merge(checkout::router())
        .merge(notify::router())
        .merge(orders::router())
}
