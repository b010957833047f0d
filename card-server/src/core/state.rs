use std::sync::Arc;

use crate::checkout::CheckoutService;
use crate::core::Config;
use crate::db::DbService;
use crate::payment::{EpayClient, PaymentGateway};
use crate::utils::AppError;

/// 服务器状态 - 持有所有服务的共享引用
///
/// 使用 Arc 实现浅拷贝，Clone 成本极低。
///
/// # 服务组件
///
/// | 字段 | 类型 | 说明 |
/// |------|------|------|
/// | config | Config | 配置项 (不可变) |
/// | db | DbService | SQLite 连接池 |
/// | gateway | Arc<dyn PaymentGateway> | 支付网关查询客户端 |
/// | checkout | Arc<CheckoutService> | 结账引擎 |
#[derive(Clone)]
pub struct ServerState {
    /// 服务器配置
    pub config: Config,
    /// 数据库服务
    pub db: DbService,
    /// 支付网关查询客户端
    pub gateway: Arc<dyn PaymentGateway>,
    /// 结账引擎
    pub checkout: Arc<CheckoutService>,
}

impl ServerState {
    /// 初始化服务器状态
    ///
    /// 按顺序初始化：
    /// 1. 数据库 (连接池 + 迁移)
    /// 2. 支付网关客户端
    /// 3. 结账引擎
    pub async fn initialize(config: &Config) -> Result<Self, AppError> {
        if let Some(parent) = std::path::Path::new(&config.database_path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .map_err(|e| AppError::internal(format!("Failed to create data dir: {e}")))?;
        }

        let db = DbService::new(&config.database_path).await?;

        let gateway: Arc<dyn PaymentGateway> = Arc::new(EpayClient::new(
            &config.pay_api_url,
            &config.merchant_id,
            &config.merchant_key,
        ));

        let checkout = Arc::new(CheckoutService::new(
            db.pool.clone(),
            gateway.clone(),
            config.payment_config(),
        ));

        Ok(Self {
            config: config.clone(),
            db,
            gateway,
            checkout,
        })
    }

    /// 获取数据库连接池
    pub fn pool(&self) -> &sqlx::SqlitePool {
        &self.db.pool
    }
}
