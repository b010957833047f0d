use crate::payment::PaymentConfig;

/// 服务器配置 - 发卡服务的所有配置项
///
/// # 环境变量
///
/// 所有配置项都可以通过环境变量覆盖：
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | DATABASE_PATH | ./data/card.db | SQLite 数据库文件 |
/// | HTTP_PORT | 3000 | HTTP 服务端口 |
/// | APP_URL | http://localhost:3000 | 对外基础 URL (回调地址) |
/// | MERCHANT_ID | (空) | 支付商户 ID |
/// | MERCHANT_KEY | (空) | 支付商户密钥 |
/// | PAY_URL | (空) | 收银台提交地址 |
/// | PAY_API_URL | (空) | 网关查询 API 地址 |
/// | ENVIRONMENT | development | 运行环境 |
///
/// # 示例
///
/// ```ignore
/// DATABASE_PATH=/data/card.db HTTP_PORT=8080 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite 数据库文件路径
    pub database_path: String,
    /// HTTP API 服务端口
    pub http_port: u16,
    /// 对外基础 URL，用于拼接支付回调地址
    pub app_url: String,
    /// 支付商户 ID (`pid`)
    pub merchant_id: String,
    /// 支付商户密钥 (签名用)
    pub merchant_key: String,
    /// 收银台提交地址
    pub pay_url: String,
    /// 网关查询 API 地址
    pub pay_api_url: String,
    /// 运行环境: development | staging | production
    pub environment: String,
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置，使用默认值
    pub fn from_env() -> Self {
        Self {
            database_path: std::env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "./data/card.db".into()),
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            app_url: std::env::var("APP_URL")
                .unwrap_or_else(|_| "http://localhost:3000".into()),
            merchant_id: std::env::var("MERCHANT_ID").unwrap_or_default(),
            merchant_key: std::env::var("MERCHANT_KEY").unwrap_or_default(),
            pay_url: std::env::var("PAY_URL").unwrap_or_default(),
            pay_api_url: std::env::var("PAY_API_URL").unwrap_or_default(),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
        }
    }

    /// 支付模块消费的商户配置子集
    pub fn payment_config(&self) -> PaymentConfig {
        PaymentConfig {
            merchant_id: self.merchant_id.clone(),
            merchant_key: self.merchant_key.clone(),
            gateway_url: self.pay_url.clone(),
            gateway_api_url: self.pay_api_url.clone(),
            app_url: self.app_url.trim_end_matches('/').to_string(),
        }
    }

    /// 是否生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
