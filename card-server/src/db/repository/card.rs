//! Card Repository
//!
//! Conditional-write primitives for the reservation protocol. The store
//! offers no row locks and no multi-statement transactions, so a claim
//! is always: one guarded UPDATE, then an independent verify-read keyed
//! on the claimant's own order id. The UPDATE's row count alone is never
//! treated as proof of exclusivity.

use super::RepoResult;
use shared::models::Card;
use sqlx::SqlitePool;

const CARD_SELECT: &str = "SELECT id, product_id, card_key, is_used, reserved_order_id, reserved_at, used_at, created_at FROM card";

/// Count sellable cards: unused AND (never reserved OR reservation expired).
///
/// `cutoff` is `now - RESERVATION_TTL_MS`; the gate and the allocator must
/// pass the same cutoff or they will disagree about what counts as stock.
pub async fn count_available(pool: &SqlitePool, product_id: &str, cutoff: i64) -> RepoResult<i64> {
    let count: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM card WHERE product_id = ? AND is_used = 0 AND (reserved_at IS NULL OR reserved_at < ?)",
    )
    .bind(product_id)
    .bind(cutoff)
    .fetch_one(pool)
    .await?;
    Ok(count.0)
}

/// Select one strictly free card (unused, never reserved), natural scan order
pub async fn find_free(pool: &SqlitePool, product_id: &str) -> RepoResult<Option<Card>> {
    let sql = format!(
        "{CARD_SELECT} WHERE product_id = ? AND is_used = 0 AND reserved_at IS NULL LIMIT 1"
    );
    let row = sqlx::query_as::<_, Card>(&sql)
        .bind(product_id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Claim a free card: guarded by `reserved_at IS NULL` so two concurrent
/// claimants against the same selected row cannot both win. Success must
/// still be confirmed with [`find_reserved_by`].
pub async fn try_reserve_free(
    pool: &SqlitePool,
    card_id: i64,
    order_id: &str,
    now: i64,
) -> RepoResult<u64> {
    let result = sqlx::query(
        "UPDATE card SET reserved_order_id = ?, reserved_at = ? WHERE id = ? AND is_used = 0 AND reserved_at IS NULL",
    )
    .bind(order_id)
    .bind(now)
    .bind(card_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

/// Verify-read: the card counts as claimed only if this returns a row
pub async fn find_reserved_by(
    pool: &SqlitePool,
    card_id: i64,
    order_id: &str,
) -> RepoResult<Option<Card>> {
    let sql = format!("{CARD_SELECT} WHERE id = ? AND reserved_order_id = ? AND is_used = 0");
    let row = sqlx::query_as::<_, Card>(&sql)
        .bind(card_id)
        .bind(order_id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Select one unused card whose reservation is older than the TTL cutoff
pub async fn find_expired(
    pool: &SqlitePool,
    product_id: &str,
    cutoff: i64,
) -> RepoResult<Option<Card>> {
    let sql =
        format!("{CARD_SELECT} WHERE product_id = ? AND is_used = 0 AND reserved_at < ? LIMIT 1");
    let row = sqlx::query_as::<_, Card>(&sql)
        .bind(product_id)
        .bind(cutoff)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Expired reservations for the reclaim sweep, oldest first
pub async fn find_expired_batch(
    pool: &SqlitePool,
    product_id: &str,
    cutoff: i64,
    limit: i64,
) -> RepoResult<Vec<Card>> {
    let sql = format!(
        "{CARD_SELECT} WHERE product_id = ? AND is_used = 0 AND reserved_at < ? ORDER BY reserved_at ASC LIMIT ?"
    );
    let rows = sqlx::query_as::<_, Card>(&sql)
        .bind(product_id)
        .bind(cutoff)
        .bind(limit)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Take over an expired reservation. Only sanctioned after the current
/// owner has been probed at the gateway and is not proven paid. Guarded
/// by `is_used = 0` only — a genuine steal — so it must also be followed
/// by [`find_reserved_by`].
pub async fn steal_reservation(
    pool: &SqlitePool,
    card_id: i64,
    order_id: &str,
    now: i64,
) -> RepoResult<u64> {
    let result =
        sqlx::query("UPDATE card SET reserved_order_id = ?, reserved_at = ? WHERE id = ? AND is_used = 0")
            .bind(order_id)
            .bind(now)
            .bind(card_id)
            .execute(pool)
            .await?;
    Ok(result.rows_affected())
}

/// Consume a card held by the given order, clearing its reservation
/// markers. A used card never carries an owner marker.
pub async fn consume_for_order(
    pool: &SqlitePool,
    card_id: i64,
    order_id: &str,
    now: i64,
) -> RepoResult<u64> {
    let result = sqlx::query(
        "UPDATE card SET is_used = 1, used_at = ?, reserved_order_id = NULL, reserved_at = NULL WHERE id = ? AND reserved_order_id = ? AND is_used = 0",
    )
    .bind(now)
    .bind(card_id)
    .bind(order_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

/// Consume a card that is free or expired-reserved, bypassing the
/// reservation step. Used by the reconciler once payment is confirmed:
/// consumption is certain, no speculative reserve needed.
pub async fn consume_if_claimable(
    pool: &SqlitePool,
    card_id: i64,
    cutoff: i64,
    now: i64,
) -> RepoResult<u64> {
    let result = sqlx::query(
        "UPDATE card SET is_used = 1, used_at = ?, reserved_order_id = NULL, reserved_at = NULL WHERE id = ? AND is_used = 0 AND (reserved_at IS NULL OR reserved_at < ?)",
    )
    .bind(now)
    .bind(card_id)
    .bind(cutoff)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

/// Cards currently reserved for an order (fulfillment pass 1)
pub async fn find_reserved_for_order(
    pool: &SqlitePool,
    order_id: &str,
    limit: i64,
) -> RepoResult<Vec<Card>> {
    let sql = format!("{CARD_SELECT} WHERE reserved_order_id = ? AND is_used = 0 LIMIT ?");
    let rows = sqlx::query_as::<_, Card>(&sql)
        .bind(order_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Free or expired-reserved cards for a product (fulfillment pass 2)
pub async fn find_claimable(
    pool: &SqlitePool,
    product_id: &str,
    cutoff: i64,
    limit: i64,
) -> RepoResult<Vec<Card>> {
    let sql = format!(
        "{CARD_SELECT} WHERE product_id = ? AND is_used = 0 AND (reserved_at IS NULL OR reserved_at < ?) LIMIT ?"
    );
    let rows = sqlx::query_as::<_, Card>(&sql)
        .bind(product_id)
        .bind(cutoff)
        .bind(limit)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Card>> {
    let sql = format!("{CARD_SELECT} WHERE id = ?");
    let row = sqlx::query_as::<_, Card>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}
