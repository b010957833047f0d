//! 支付对账与发货
//!
//! 支付确认到达时订单的预定可能仍在、可能已过期、也可能已被抢占。
//! 对账按两轮收卡：
//!
//! 1. 先收仍在本单名下的预定卡（条件消耗，归属守卫）；
//! 2. 不足再从 空闲 / 过期预定 的卡里补（claimable 守卫消耗）。
//!
//! 收满 quantity 张则 delivered；收不满则 paid + 已收的部分卡密
//! 留在订单上等人工跟进，绝不回滚已消耗的卡。
//! 整个流程幂等：已终态订单直接返回 `AlreadyProcessed`。

use super::{AMOUNT_EPSILON, CheckoutError, RESERVATION_TTL_MS};
use crate::db::repository;
use sqlx::SqlitePool;

/// Reconciliation verdict
#[derive(Debug, PartialEq, Eq)]
pub enum FulfillmentOutcome {
    /// Full quantity secured and delivered
    Delivered,
    /// Payment recorded but stock fell short; partial keys retained
    Paid,
    /// Order was already finalized, nothing done
    AlreadyProcessed,
}

/// Reconcile a confirmed payment against an order
pub async fn process_payment(
    pool: &SqlitePool,
    order_id: &str,
    paid_amount: f64,
    trade_no: &str,
) -> Result<FulfillmentOutcome, CheckoutError> {
    let order = repository::order::find_by_id(pool, order_id)
        .await?
        .ok_or(CheckoutError::OrderNotFound)?;

    // Amount guard runs unconditionally, even on replays of an order
    // that already finalized: a confirmation carrying the wrong amount
    // is never acknowledged as processed.
    if (paid_amount - order.amount).abs() > AMOUNT_EPSILON {
        tracing::warn!(
            order_id,
            expected = order.amount,
            paid = paid_amount,
            "paid amount mismatch, refusing to fulfill"
        );
        return Err(CheckoutError::AmountMismatch {
            expected: order.amount,
            paid: paid_amount,
        });
    }

    // Duplicate confirmation (gateway retries its callback): no-op
    if order.status.is_finalized() {
        tracing::info!(order_id, status = ?order.status, "payment already processed");
        return Ok(FulfillmentOutcome::AlreadyProcessed);
    }

    let now = shared::util::now_millis();
    let mut keys: Vec<String> = Vec::with_capacity(order.quantity as usize);

    // Pass 1: cards still reserved under this order
    let held = repository::card::find_reserved_for_order(pool, order_id, order.quantity).await?;
    for card in held {
        let rows = repository::card::consume_for_order(pool, card.id, order_id, now).await?;
        if rows == 1 {
            keys.push(card.card_key);
        }
    }

    // Pass 2: reservations were lost or expired, recover from whatever
    // stock is claimable right now
    if (keys.len() as i64) < order.quantity {
        let cutoff = now - RESERVATION_TTL_MS;
        let missing = order.quantity - keys.len() as i64;
        let candidates =
            repository::card::find_claimable(pool, &order.product_id, cutoff, missing).await?;
        for card in candidates {
            let rows = repository::card::consume_if_claimable(pool, card.id, cutoff, now).await?;
            if rows == 1 {
                keys.push(card.card_key);
            }
        }
    }

    if keys.len() as i64 == order.quantity {
        let joined = keys.join("\n");
        repository::order::finalize_delivered(pool, order_id, &joined, trade_no, now).await?;
        tracing::info!(order_id, trade_no, quantity = order.quantity, "order delivered");
        return Ok(FulfillmentOutcome::Delivered);
    }

    // Shortfall: the buyer has paid, keep what was secured
    let partial = if keys.is_empty() {
        None
    } else {
        Some(keys.join("\n"))
    };
    repository::order::finalize_paid(pool, order_id, partial.as_deref(), trade_no, now).await?;
    tracing::error!(
        order_id,
        trade_no,
        secured = keys.len(),
        needed = order.quantity,
        "paid order could not be fully fulfilled"
    );
    Ok(FulfillmentOutcome::Paid)
}
