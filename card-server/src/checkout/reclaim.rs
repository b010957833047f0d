//! 过期预定回收
//!
//! 结账与查询路径前机会式运行的卫生工序，处理超过 TTL 仍挂着
//! 预定标记的卡：
//!
//! - 原主已在网关付款：替原主消耗该卡并把原主订单置为 paid；
//! - 原主未付款：把原主的 pending 订单置为 cancelled，卡上的
//!   过期标记保留，留给分配器按接管路径复用；
//! - 网关查询失败：整单跳过，下一轮再试。
//!
//! 全程尽力而为：任何失败都不会让触发它的请求失败。

use super::RESERVATION_TTL_MS;
use crate::db::repository;
use crate::db::repository::RepoError;
use crate::payment::PaymentGateway;
use sqlx::SqlitePool;
use std::collections::HashMap;

/// Batch size per sweep; hygiene must stay cheap on the hot path
const SWEEP_BATCH: i64 = 20;

/// Best-effort sweep wrapper. Errors are logged and swallowed so the
/// calling request never fails because cleanup did.
pub async fn cancel_expired(pool: &SqlitePool, gateway: &dyn PaymentGateway, product_id: &str) {
    if let Err(e) = sweep(pool, gateway, product_id).await {
        tracing::warn!(product_id, error = %e, "expired reservation sweep failed");
    }
}

/// One sweep pass over expired reservations for a product.
///
/// Returns how many stale pending orders were cancelled.
pub async fn sweep(
    pool: &SqlitePool,
    gateway: &dyn PaymentGateway,
    product_id: &str,
) -> Result<usize, RepoError> {
    let cutoff = shared::util::now_millis() - RESERVATION_TTL_MS;
    let expired = repository::card::find_expired_batch(pool, product_id, cutoff, SWEEP_BATCH).await?;
    if expired.is_empty() {
        return Ok(0);
    }

    // One gateway probe per distinct owner, not per card. `None` means
    // the probe failed and the owner is skipped this round.
    let mut verdicts: HashMap<String, Option<bool>> = HashMap::new();
    let mut cancelled = 0;

    for card in expired {
        let Some(owner) = card.reserved_order_id.clone() else {
            continue;
        };

        let verdict = match verdicts.get(&owner) {
            Some(v) => *v,
            None => {
                let v = match gateway.query_order_status(&owner).await {
                    Ok(status) => Some(status.is_paid()),
                    Err(e) => {
                        tracing::debug!(owner, error = %e, "sweep payment probe failed");
                        None
                    }
                };
                verdicts.insert(owner.clone(), v);
                v
            }
        };

        match verdict {
            Some(true) => {
                // Late payment discovered during hygiene: finalize the
                // owner the same way the allocator's takeover does
                let now = shared::util::now_millis();
                repository::card::consume_for_order(pool, card.id, &owner, now).await?;
                repository::order::mark_paid_if_pending(pool, &owner, now).await?;
                tracing::info!(owner, card_id = card.id, "swept card belonged to a paid order");
            }
            Some(false) => {
                // Abandoned checkout. Cancel the order; the stale marker
                // stays on the card and the allocator takes it over.
                let rows = repository::order::mark_cancelled_if_pending(pool, &owner).await?;
                if rows == 1 {
                    cancelled += 1;
                    tracing::info!(owner, "stale pending order cancelled");
                }
            }
            None => {}
        }
    }

    Ok(cancelled)
}
