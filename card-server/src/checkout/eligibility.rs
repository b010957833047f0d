//! 下单资格门 - 封禁 / 库存 / 限购 / 积分
//!
//! 在分配器运行前校验一次下单请求。库存口径必须与分配器一致：
//! 未消耗 且（未预定 或 预定已过期，TTL 共用 [`RESERVATION_TTL_MS`]）。

use super::{Buyer, CheckoutError, RESERVATION_TTL_MS, reclaim};
use crate::db::repository;
use crate::payment::PaymentGateway;
use shared::models::Product;
use sqlx::SqlitePool;

/// Gate verdict: the product plus the computed price split
#[derive(Debug)]
pub struct Eligibility {
    pub product: Product,
    /// Payable amount after point redemption
    pub final_amount: f64,
    /// Points the orchestrator must commit at order creation
    pub points_to_use: i64,
}

/// Validate an order attempt and compute `(final_amount, points_to_use)`
pub async fn check(
    pool: &SqlitePool,
    gateway: &dyn PaymentGateway,
    product_id: &str,
    quantity: i64,
    buyer: &Buyer,
    use_points: bool,
) -> Result<Eligibility, CheckoutError> {
    let product = repository::product::find_active_by_id(pool, product_id)
        .await?
        .ok_or(CheckoutError::ProductNotFound)?;

    // Blocklist
    let user = match buyer.user_id.as_deref() {
        Some(user_id) => repository::login_user::find_by_user_id(pool, user_id).await?,
        None => None,
    };
    if user.as_ref().is_some_and(|u| u.is_blocked) {
        return Err(CheckoutError::BuyerBlocked);
    }

    // Opportunistic cleanup before counting stock. Best effort: the
    // gate must not fail merely because the sweep did.
    reclaim::cancel_expired(pool, gateway, product_id).await;

    // Stock, through the same staleness window the allocator uses
    let cutoff = shared::util::now_millis() - RESERVATION_TTL_MS;
    let available = repository::card::count_available(pool, product_id, cutoff).await?;
    if available < quantity {
        return Err(CheckoutError::OutOfStock);
    }

    // Per-buyer purchase cap over paid/delivered orders, matched by
    // user id or email. No cap configured means unlimited.
    if let Some(limit) = product.purchase_limit
        && limit > 0
    {
        let bought = repository::order::purchased_quantity(
            pool,
            product_id,
            buyer.user_id.as_deref(),
            buyer.email.as_deref(),
        )
        .await?;
        if bought + quantity > limit {
            return Err(CheckoutError::PurchaseLimitExceeded);
        }
    }

    // Point redemption: 1 point = 1 currency unit
    let list_amount = product.price * quantity as f64;
    let mut points_to_use = 0i64;
    let mut final_amount = list_amount;
    if use_points
        && let Some(user) = &user
        && user.points > 0
    {
        points_to_use = user.points.min(list_amount.ceil() as i64);
        final_amount = (list_amount - points_to_use as f64).max(0.0);
    }

    Ok(Eligibility {
        product,
        final_amount,
        points_to_use,
    })
}
