//! Card Server - 虚拟卡密发售与订单履约服务
//!
//! # 架构概述
//!
//! 本模块是发卡服务的主入口，提供以下核心功能：
//!
//! - **结账引擎** (`checkout`): 资格校验、乐观领卡、支付对账、过期回收
//! - **数据库** (`db`): SQLite 连接池与条件写入仓储
//! - **支付** (`payment`): epay 签名协议与网关查询客户端
//! - **HTTP API** (`api`): RESTful API 接口
//!
//! # 模块结构
//!
//! ```text
//! card-server/src/
//! ├── core/          # 配置、状态、服务器生命周期
//! ├── checkout/      # 结账引擎 (资格门/分配器/对账/回收)
//! ├── payment/       # epay 签名与网关客户端
//! ├── api/           # HTTP 路由和处理器
//! ├── db/            # 数据库层
//! └── utils/         # 错误、日志
//! ```
//!
//! # 并发模型
//!
//! 存储只提供单行条件写入，没有事务和行锁。一卡不二卖、积分
//! 不为负等保证全部由 `checkout` 模块的乐观写入协议承担，见
//! [`checkout`] 的模块文档。

pub mod api;
pub mod checkout;
pub mod core;
pub mod db;
pub mod payment;
pub mod utils;

#[cfg(test)]
pub mod test_support;

// Re-export 公共类型
pub use checkout::{CheckoutOutcome, CheckoutService};
pub use core::{Config, Server, ServerState};
pub use utils::{AppError, AppResponse, AppResult};

// Re-export logger functions
pub use utils::logger::init_logger_with_file;

/// 设置运行环境 (dotenv + 日志)
pub fn setup_environment() {
    let _ = dotenv::dotenv();

    let log_level = std::env::var("LOG_LEVEL").ok();
    let log_dir = std::env::var("LOG_DIR").ok();
    init_logger_with_file(log_level.as_deref(), log_dir.as_deref());
}

pub fn print_banner() {
    println!(
        r#"
   ______               __
  / ____/___ __________/ /
 / /   / __ `/ ___/ __  /
/ /___/ /_/ / /  / /_/ /
\____/\__,_/_/   \__,_/
   _____
  / ___/___  ______   _____  _____
  \__ \/ _ \/ ___/ | / / _ \/ ___/
 ___/ /  __/ /   | |/ /  __/ /
/____/\___/_/    |___/\___/_/
    "#
    );
}
