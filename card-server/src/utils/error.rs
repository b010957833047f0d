//! 统一错误处理
//!
//! 提供应用级错误类型和响应结构：
//! - [`AppError`] - 应用错误枚举
//! - [`AppResponse`] - API 响应结构
//!
//! # 错误码规范
//!
//! | 前缀 | 分类 | 示例 |
//! |------|------|------|
//! | E0xxx | 通用错误 | E0003 资源不存在 |
//! | E4xxx | 订单错误 | E4002 非本人订单 |
//! | E5xxx | 支付错误 | E5002 金额不符 |
//! | E6xxx | 商品/库存错误 | E6002 库存不足 |
//! | E9xxx | 系统错误 | E9002 数据库错误 |
//!
//! 所有校验/竞争类失败都映射到稳定错误码，底层存储错误不会
//! 泄漏到调用方。

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;

/// API 统一响应结构，见 [`shared::response::ApiResponse`]
pub use shared::ApiResponse as AppResponse;

/// 应用错误枚举
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // ========== 通用错误 (4xx) ==========
    #[error("Resource not found: {0}")]
    /// 资源不存在 (404)
    NotFound(String),

    #[error("Validation failed: {0}")]
    /// 验证失败 (400)
    Validation(String),

    #[error("Invalid request: {0}")]
    /// 无效请求 (400)
    Invalid(String),

    #[error("Permission denied: {0}")]
    /// 无权限 (403)
    Forbidden(String),

    // ========== 订单错误 ==========
    #[error("Order not found")]
    /// 订单不存在 (404)
    OrderNotFound,

    #[error("Not the order owner")]
    /// 非本人订单 (403)
    NotOwner,

    #[error("Order already finalized")]
    /// 订单已终结，不可重试支付 (409)
    AlreadyFinalized,

    // ========== 支付错误 ==========
    #[error("Paid amount does not match order amount")]
    /// 支付金额与订单金额不符 (422)
    AmountMismatch,

    #[error("Insufficient points")]
    /// 积分不足 (422)
    InsufficientPoints,

    // ========== 商品/库存错误 ==========
    #[error("Product not found")]
    /// 商品不存在或已下架 (404)
    ProductNotFound,

    #[error("Buyer is blocked")]
    /// 买家被封禁 (403)
    BuyerBlocked,

    #[error("Out of stock")]
    /// 库存不足 (409)
    OutOfStock,

    #[error("Purchase limit exceeded")]
    /// 超出限购数量 (422)
    PurchaseLimitExceeded,

    #[error("Stock contention, please retry")]
    /// 库存竞争激烈，领卡重试耗尽 (409)
    StockLocked,

    // ========== 系统错误 (5xx) ==========
    #[error("Database error: {0}")]
    /// 数据库错误 (500)
    Database(String),

    #[error("Internal server error: {0}")]
    /// 内部错误 (500)
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // Generic (4xx)
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "E0003", msg.as_str()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "E0002", msg.as_str()),
            AppError::Invalid(msg) => (StatusCode::BAD_REQUEST, "E0006", msg.as_str()),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, "E2001", msg.as_str()),

            // Orders
            AppError::OrderNotFound => (StatusCode::NOT_FOUND, "E4001", "Order not found"),
            AppError::NotOwner => (StatusCode::FORBIDDEN, "E4002", "Not the order owner"),
            AppError::AlreadyFinalized => {
                (StatusCode::CONFLICT, "E4003", "Order already finalized")
            }

            // Payment
            AppError::AmountMismatch => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "E5002",
                "Paid amount does not match order amount",
            ),
            AppError::InsufficientPoints => {
                (StatusCode::UNPROCESSABLE_ENTITY, "E5003", "Insufficient points")
            }

            // Products / stock
            AppError::ProductNotFound => (StatusCode::NOT_FOUND, "E6001", "Product not found"),
            AppError::BuyerBlocked => (StatusCode::FORBIDDEN, "E6005", "Buyer is blocked"),
            AppError::OutOfStock => (StatusCode::CONFLICT, "E6002", "Out of stock"),
            AppError::PurchaseLimitExceeded => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "E6003",
                "Purchase limit exceeded",
            ),
            AppError::StockLocked => (
                StatusCode::CONFLICT,
                "E6004",
                "Stock contention, please retry",
            ),

            // Database errors (500)
            AppError::Database(msg) => {
                error!(target: "database", error = %msg, "Database error occurred");
                (StatusCode::INTERNAL_SERVER_ERROR, "E9002", "Database error")
            }

            // Internal errors (500)
            AppError::Internal(msg) => {
                error!(target: "internal", error = %msg, "Internal error occurred");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "E9001",
                    "Internal server error",
                )
            }
        };

        let body = Json(AppResponse::<()>::error(code, message));

        (status, body).into_response()
    }
}

// ========== Helper Constructors ==========

impl AppError {
    /// Create a Database error
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database(message.into())
    }

    /// Create an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create a NotFound error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }
}

/// Result type for API handlers
pub type AppResult<T> = Result<T, AppError>;

// ========== Helper functions ==========

/// Create a successful response
pub fn ok<T: Serialize>(data: T) -> Json<AppResponse<T>> {
    Json(AppResponse::ok(data))
}

/// Create a successful response with custom message
pub fn ok_with_message<T: Serialize>(data: T, message: impl Into<String>) -> Json<AppResponse<T>> {
    Json(AppResponse::ok_with_message(data, message))
}
