//! 库存分配器 - 乐观领卡协议
//!
//! 没有行锁也没有事务，一次领卡 = 条件更新 + 归属回读验证：
//!
//! 1. 选一张空闲卡，带 `reserved_at IS NULL` 守卫条件更新；
//!    再按 `(id, reserved_order_id = 本单)` 回读，读到才算赢。
//! 2. 没有空闲卡时找过期预定（TTL 5 分钟）：先向网关求证原主
//!    是否已付款 —— 已付款则替原主消耗该卡并把原主订单置为
//!    paid（不抢卡）；未付款或查询失败则直接抢占，再回读验证。
//! 3. 每张卡最多 3 次尝试，耗尽返回 `StockLocked`。
//!
//! 失败时已领的卡保持预定在失败订单名下，由 TTL 自然过期回收，
//! 不做显式释放。

use super::{CheckoutError, MAX_CLAIM_ATTEMPTS, RESERVATION_TTL_MS};
use crate::db::repository;
use crate::payment::PaymentGateway;
use sqlx::SqlitePool;

/// A card claimed for an order
#[derive(Debug, Clone)]
pub struct ClaimedCard {
    pub id: i64,
    pub card_key: String,
}

/// Claim exactly `quantity` cards for the order, or fail `StockLocked`
pub async fn reserve_cards(
    pool: &SqlitePool,
    gateway: &dyn PaymentGateway,
    order_id: &str,
    product_id: &str,
    quantity: i64,
) -> Result<Vec<ClaimedCard>, CheckoutError> {
    let mut claimed = Vec::with_capacity(quantity as usize);
    for _ in 0..quantity {
        match claim_one(pool, gateway, order_id, product_id).await? {
            Some(card) => claimed.push(card),
            None => {
                tracing::warn!(
                    order_id,
                    product_id,
                    claimed = claimed.len(),
                    needed = quantity,
                    "claim retries exhausted, reservations left to expire"
                );
                return Err(CheckoutError::StockLocked);
            }
        }
    }
    Ok(claimed)
}

/// One unit-level claim loop, bounded to [`MAX_CLAIM_ATTEMPTS`]
async fn claim_one(
    pool: &SqlitePool,
    gateway: &dyn PaymentGateway,
    order_id: &str,
    product_id: &str,
) -> Result<Option<ClaimedCard>, CheckoutError> {
    for _attempt in 0..MAX_CLAIM_ATTEMPTS {
        // A. Strictly free card
        if let Some(card) = repository::card::find_free(pool, product_id).await? {
            let now = shared::util::now_millis();
            repository::card::try_reserve_free(pool, card.id, order_id, now).await?;

            // The update's row count is not proof of exclusivity; only
            // the verify-read keyed on our own order id is
            if let Some(won) = repository::card::find_reserved_by(pool, card.id, order_id).await? {
                return Ok(Some(ClaimedCard {
                    id: won.id,
                    card_key: won.card_key,
                }));
            }
            // Lost the race for this row, retry
            continue;
        }

        // B. Expired reservation takeover
        let cutoff = shared::util::now_millis() - RESERVATION_TTL_MS;
        let Some(candidate) = repository::card::find_expired(pool, product_id, cutoff).await? else {
            // Neither free nor expired stock exists
            return Ok(None);
        };

        // Ground truth before stealing: is the current owner paid?
        // A transport failure is not proof of payment, steal proceeds.
        let owner_paid = match candidate.reserved_order_id.as_deref() {
            Some(owner) => match gateway.query_order_status(owner).await {
                Ok(status) => status.is_paid(),
                Err(e) => {
                    tracing::debug!(owner, error = %e, "owner payment probe failed");
                    false
                }
            },
            None => false,
        };

        if owner_paid {
            // Late payment: the unit belongs to its owner. Finalize the
            // owner instead of stealing; this consumes one attempt.
            let owner = candidate.reserved_order_id.as_deref().unwrap_or_default();
            let now = shared::util::now_millis();
            repository::card::consume_for_order(pool, candidate.id, owner, now).await?;
            repository::order::mark_paid_if_pending(pool, owner, now).await?;
            tracing::info!(owner, card_id = candidate.id, "stale owner was paid, finalized");
            continue;
        }

        let now = shared::util::now_millis();
        repository::card::steal_reservation(pool, candidate.id, order_id, now).await?;
        if let Some(won) = repository::card::find_reserved_by(pool, candidate.id, order_id).await? {
            return Ok(Some(ClaimedCard {
                id: won.id,
                card_key: won.card_key,
            }));
        }
        // Another claimant re-reserved it first, retry
    }

    Ok(None)
}
