//! 结账引擎 - 库存预定与订单履约
//!
//! 后端存储只提供单行条件写入：没有多语句事务、没有行锁。
//! 正确性（一卡不二卖、无永久滞留、余额不为负）完全依赖
//! "条件更新 + 以自身归属标记回读验证" 的乐观重试协议。
//!
//! # 组件
//!
//! | 模块 | 职责 |
//! |------|------|
//! | [`eligibility`] | 下单资格校验（封禁/库存/限购/积分） |
//! | [`allocator`] | 乐观领卡：claim-verify-retry + 过期预定接管 |
//! | [`fulfillment`] | 支付确认对账（幂等） |
//! | [`reclaim`] | 过期预定回收（尽力而为，失败不上抛） |
//!
//! 控制流：Gate → Allocator → Orchestrator（新订单）；
//! Reconciler 由支付回调独立触发；Reclaimer 在两条路径前机会式运行。

pub mod allocator;
pub mod eligibility;
pub mod fulfillment;
pub mod reclaim;

use crate::db::repository::{self, RepoError, order::OrderInsert};
use crate::payment::{PaymentConfig, PaymentGateway, PaymentRequest};
use crate::utils::AppError;
use serde::Serialize;
use sqlx::SqlitePool;
use std::sync::Arc;

/// Reservation time-to-live: 5 minutes.
///
/// The single TTL constant shared by the gate, allocator, reconciler and
/// reclaimer. Components reading `reserved_at` through different windows
/// would disagree about what counts as expired.
pub const RESERVATION_TTL_MS: i64 = 5 * 60 * 1000;

/// Bounded retries per card claimed. Exhaustion surfaces as
/// `StockLocked`; the caller may re-submit.
pub(crate) const MAX_CLAIM_ATTEMPTS: u32 = 3;

/// Currency tolerance when comparing paid amount to order amount
pub const AMOUNT_EPSILON: f64 = 0.01;

/// Trade reference recorded on orders settled entirely with points
const POINTS_TRADE_NO: &str = "POINTS_REDEMPTION";

/// Buyer identity as provided by the auth layer
#[derive(Debug, Clone, Default)]
pub struct Buyer {
    pub user_id: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
}

/// Checkout engine failures
#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    #[error("Product not found")]
    ProductNotFound,

    #[error("Buyer is blocked")]
    BuyerBlocked,

    #[error("Out of stock")]
    OutOfStock,

    #[error("Purchase limit exceeded")]
    PurchaseLimitExceeded,

    /// Claim retries exhausted under contention
    #[error("Stock contention, claim retries exhausted")]
    StockLocked,

    /// Conditional point decrement affected zero rows
    #[error("Insufficient points")]
    InsufficientPoints,

    #[error("Order not found")]
    OrderNotFound,

    #[error("Not the order owner")]
    NotOwner,

    #[error("Order already finalized")]
    AlreadyFinalized,

    #[error("Paid amount {paid} does not match order amount {expected}")]
    AmountMismatch { expected: f64, paid: f64 },

    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl From<CheckoutError> for AppError {
    fn from(err: CheckoutError) -> Self {
        match err {
            CheckoutError::ProductNotFound => AppError::ProductNotFound,
            CheckoutError::BuyerBlocked => AppError::BuyerBlocked,
            CheckoutError::OutOfStock => AppError::OutOfStock,
            CheckoutError::PurchaseLimitExceeded => AppError::PurchaseLimitExceeded,
            CheckoutError::StockLocked => AppError::StockLocked,
            CheckoutError::InsufficientPoints => AppError::InsufficientPoints,
            CheckoutError::OrderNotFound => AppError::OrderNotFound,
            CheckoutError::NotOwner => AppError::NotOwner,
            CheckoutError::AlreadyFinalized => AppError::AlreadyFinalized,
            CheckoutError::AmountMismatch { .. } => AppError::AmountMismatch,
            // Raw store errors never reach the boundary as-is
            CheckoutError::Repo(e) => AppError::Database(e.to_string()),
        }
    }
}

/// Result of a successful order creation
#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CheckoutOutcome {
    /// Zero-cost fast path: order is already delivered
    Delivered { order_id: String, url: String },
    /// Paid checkout: buyer must be redirected to the gateway
    PaymentRequired {
        order_id: String,
        request: PaymentRequest,
    },
}

/// 结账服务 - Gate 与 Allocator 的编排器
///
/// 每次调用都是独立的请求级工作单元，调用之间不保留任何内存状态，
/// 共享状态只有数据库。
pub struct CheckoutService {
    pool: SqlitePool,
    gateway: Arc<dyn PaymentGateway>,
    payment: PaymentConfig,
}

impl CheckoutService {
    pub fn new(pool: SqlitePool, gateway: Arc<dyn PaymentGateway>, payment: PaymentConfig) -> Self {
        Self {
            pool,
            gateway,
            payment,
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create an order: eligibility gate, card allocation, point
    /// redemption commit, then zero-cost delivery or a signed payment
    /// request.
    pub async fn create_order(
        &self,
        product_id: &str,
        quantity: i64,
        buyer: &Buyer,
        use_points: bool,
    ) -> Result<CheckoutOutcome, CheckoutError> {
        let eligibility = eligibility::check(
            &self.pool,
            self.gateway.as_ref(),
            product_id,
            quantity,
            buyer,
            use_points,
        )
        .await?;

        let order_id = shared::util::order_id();
        tracing::info!(
            order_id,
            product_id,
            quantity,
            amount = eligibility.final_amount,
            points = eligibility.points_to_use,
            "creating order"
        );

        // Claim cards before the order row exists. If anything below
        // fails, the reservations are simply abandoned: they carry this
        // order id and age out through the TTL, no rollback needed.
        let claimed = allocator::reserve_cards(
            &self.pool,
            self.gateway.as_ref(),
            &order_id,
            product_id,
            quantity,
        )
        .await?;
        tracing::debug!(order_id, reserved = claimed.len(), "cards reserved");

        // Point redemption commits via a conditional decrement. Zero
        // rows affected means the balance moved since the gate read it.
        if eligibility.points_to_use > 0 {
            let user_id = buyer.user_id.as_deref().unwrap_or_default();
            let rows = repository::login_user::deduct_points(
                &self.pool,
                user_id,
                eligibility.points_to_use,
            )
            .await?;
            if rows == 0 {
                tracing::warn!(order_id, user_id, "point balance changed under us, aborting");
                return Err(CheckoutError::InsufficientPoints);
            }
        }

        let now = shared::util::now_millis();
        let insert = OrderInsert {
            order_id: &order_id,
            product_id: &eligibility.product.id,
            product_name: &eligibility.product.name,
            quantity,
            amount: eligibility.final_amount,
            email: buyer.email.as_deref(),
            user_id: buyer.user_id.as_deref(),
            username: buyer.username.as_deref(),
            points_used: eligibility.points_to_use,
        };

        if eligibility.final_amount <= 0.0 {
            // Zero-cost fast path: points settled the full price, so the
            // order reconciles immediately through the same path a
            // gateway confirmation takes. Its per-card affected-row
            // checks catch reservations stolen by an expired-takeover
            // between the allocator's verify-read and the consume, and
            // claim a replacement instead of handing out the stolen key.
            repository::order::insert_pending(&self.pool, &insert, now).await?;
            let outcome =
                fulfillment::process_payment(&self.pool, &order_id, 0.0, POINTS_TRADE_NO).await?;
            match outcome {
                fulfillment::FulfillmentOutcome::Delivered => {
                    tracing::info!(order_id, "zero-cost order delivered");
                }
                _ => {
                    tracing::warn!(order_id, "zero-cost order settled short, kept as paid");
                }
            }
            return Ok(CheckoutOutcome::Delivered {
                url: format!("{}/order/{}", self.payment.app_url, order_id),
                order_id,
            });
        }

        repository::order::insert_pending(&self.pool, &insert, now).await?;

        // First payment attempt correlates by the order id itself
        let request = self.payment.build_payment_request(
            &order_id,
            &order_id,
            &eligibility.product.name,
            eligibility.final_amount,
        );
        Ok(CheckoutOutcome::PaymentRequired { order_id, request })
    }

    /// Mint a fresh payment request for a still-pending order.
    ///
    /// Does not touch stock: the original reservations either still hold
    /// or have expired and may be re-contested — fulfillment resolves
    /// that once payment lands.
    pub async fn retry_payment(
        &self,
        order_id: &str,
        user_id: &str,
    ) -> Result<PaymentRequest, CheckoutError> {
        let order = repository::order::find_by_id(&self.pool, order_id)
            .await?
            .ok_or(CheckoutError::OrderNotFound)?;

        if order.user_id.as_deref() != Some(user_id) {
            return Err(CheckoutError::NotOwner);
        }
        if order.status != shared::models::OrderStatus::Pending {
            return Err(CheckoutError::AlreadyFinalized);
        }

        // A new correlation id per attempt; the gateway rejects replays
        // of an already-submitted trade number
        let payment_id = format!("{}_retry{}", order.order_id, shared::util::now_millis());
        repository::order::set_payment_id(&self.pool, order_id, &payment_id).await?;

        tracing::info!(order_id, payment_id, "payment retry issued");
        Ok(self.payment.build_payment_request(
            &payment_id,
            &order.order_id,
            &order.product_name,
            order.amount,
        ))
    }

    /// Reconcile an inbound payment confirmation (see [`fulfillment`])
    pub async fn process_payment(
        &self,
        order_id: &str,
        paid_amount: f64,
        trade_no: &str,
    ) -> Result<fulfillment::FulfillmentOutcome, CheckoutError> {
        fulfillment::process_payment(&self.pool, order_id, paid_amount, trade_no).await
    }
}
