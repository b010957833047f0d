//! 健康检查路由
//!
//! # 路由列表
//!
//! | 路径 | 方法 | 说明 | 认证 |
//! |------|------|------|------|
//! | /health | GET | 健康检查 | 无 |

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;

use crate::core::ServerState;

/// 健康检查路由 - 公共路由 (无需认证)
pub fn router() -> Router<ServerState> {
    Router::new().route("/health", get(health))
}

/// 健康检查响应
#[derive(Serialize)]
pub struct HealthResponse {
    /// 状态 (ok | error)
    status: &'static str,
    /// 版本号
    version: &'static str,
    /// 数据库可达
    database: bool,
}

/// GET /health
async fn health(State(state): State<ServerState>) -> Json<HealthResponse> {
    let database = sqlx::query("SELECT 1").execute(state.pool()).await.is_ok();
    Json(HealthResponse {
        status: if database { "ok" } else { "error" },
        version: env!("CARGO_PKG_VERSION"),
        database,
    })
}
