//! Order Repository

use super::RepoResult;
use shared::models::Order;
use sqlx::SqlitePool;

const ORDER_SELECT: &str = "SELECT order_id, product_id, product_name, quantity, amount, email, user_id, username, status, points_used, current_payment_id, card_key, trade_no, paid_at, delivered_at, created_at FROM orders";

/// Fields shared by every order insert
#[derive(Debug)]
pub struct OrderInsert<'a> {
    pub order_id: &'a str,
    pub product_id: &'a str,
    pub product_name: &'a str,
    pub quantity: i64,
    pub amount: f64,
    pub email: Option<&'a str>,
    pub user_id: Option<&'a str>,
    pub username: Option<&'a str>,
    pub points_used: i64,
}

/// Insert a pending order awaiting payment. The order id doubles as the
/// initial payment correlation id.
pub async fn insert_pending(pool: &SqlitePool, o: &OrderInsert<'_>, now: i64) -> RepoResult<()> {
    sqlx::query(
        "INSERT INTO orders (order_id, product_id, product_name, quantity, amount, email, user_id, username, status, points_used, current_payment_id, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, 'pending', ?, ?, ?)",
    )
    .bind(o.order_id)
    .bind(o.product_id)
    .bind(o.product_name)
    .bind(o.quantity)
    .bind(o.amount)
    .bind(o.email)
    .bind(o.user_id)
    .bind(o.username)
    .bind(o.points_used)
    .bind(o.order_id)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn find_by_id(pool: &SqlitePool, order_id: &str) -> RepoResult<Option<Order>> {
    let sql = format!("{ORDER_SELECT} WHERE order_id = ?");
    let row = sqlx::query_as::<_, Order>(&sql)
        .bind(order_id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Units already bought for this product by a buyer, matched by user id
/// OR email, over paid/delivered orders. Feeds the purchase-limit check.
pub async fn purchased_quantity(
    pool: &SqlitePool,
    product_id: &str,
    user_id: Option<&str>,
    email: Option<&str>,
) -> RepoResult<i64> {
    let (sql, binds): (&str, Vec<&str>) = match (user_id, email) {
        (Some(u), Some(e)) => (
            "SELECT COALESCE(SUM(quantity), 0) FROM orders WHERE product_id = ? AND (user_id = ? OR email = ?) AND status IN ('paid', 'delivered')",
            vec![product_id, u, e],
        ),
        (Some(u), None) => (
            "SELECT COALESCE(SUM(quantity), 0) FROM orders WHERE product_id = ? AND user_id = ? AND status IN ('paid', 'delivered')",
            vec![product_id, u],
        ),
        (None, Some(e)) => (
            "SELECT COALESCE(SUM(quantity), 0) FROM orders WHERE product_id = ? AND email = ? AND status IN ('paid', 'delivered')",
            vec![product_id, e],
        ),
        // Anonymous buyer without email: nothing to match against
        (None, None) => return Ok(0),
    };

    let mut query = sqlx::query_as::<_, (i64,)>(sql);
    for b in binds {
        query = query.bind(b);
    }
    let count = query.fetch_one(pool).await?;
    Ok(count.0)
}

/// Flip a pending order to paid (used when a takeover probe finds the
/// reservation owner already paid). Conditional on `status = 'pending'`.
pub async fn mark_paid_if_pending(pool: &SqlitePool, order_id: &str, now: i64) -> RepoResult<u64> {
    let result =
        sqlx::query("UPDATE orders SET status = 'paid', paid_at = ? WHERE order_id = ? AND status = 'pending'")
            .bind(now)
            .bind(order_id)
            .execute(pool)
            .await?;
    Ok(result.rows_affected())
}

/// Finalize a fulfilled order as delivered with its joined card keys
pub async fn finalize_delivered(
    pool: &SqlitePool,
    order_id: &str,
    card_key: &str,
    trade_no: &str,
    now: i64,
) -> RepoResult<u64> {
    let result = sqlx::query(
        "UPDATE orders SET status = 'delivered', card_key = ?, trade_no = ?, paid_at = ?, delivered_at = ? WHERE order_id = ?",
    )
    .bind(card_key)
    .bind(trade_no)
    .bind(now)
    .bind(now)
    .bind(order_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

/// Finalize a paid-but-not-fully-fulfilled order. Any partially claimed
/// keys are kept on the row for manual follow-up.
pub async fn finalize_paid(
    pool: &SqlitePool,
    order_id: &str,
    partial_keys: Option<&str>,
    trade_no: &str,
    now: i64,
) -> RepoResult<u64> {
    let result = sqlx::query(
        "UPDATE orders SET status = 'paid', card_key = COALESCE(?, card_key), trade_no = ?, paid_at = ? WHERE order_id = ?",
    )
    .bind(partial_keys)
    .bind(trade_no)
    .bind(now)
    .bind(order_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

/// Cancel an abandoned pending order. Cancellation is a status, never a
/// delete; a late payment confirmation can still fulfill the order.
pub async fn mark_cancelled_if_pending(pool: &SqlitePool, order_id: &str) -> RepoResult<u64> {
    let result =
        sqlx::query("UPDATE orders SET status = 'cancelled' WHERE order_id = ? AND status = 'pending'")
            .bind(order_id)
            .execute(pool)
            .await?;
    Ok(result.rows_affected())
}

/// Rewrite the payment correlation id for a retried payment attempt
pub async fn set_payment_id(
    pool: &SqlitePool,
    order_id: &str,
    payment_id: &str,
) -> RepoResult<u64> {
    let result = sqlx::query("UPDATE orders SET current_payment_id = ? WHERE order_id = ?")
        .bind(payment_id)
        .bind(order_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_pool;
    use shared::models::OrderStatus;

    fn insert_args<'a>(order_id: &'a str, user_id: Option<&'a str>, qty: i64) -> OrderInsert<'a> {
        OrderInsert {
            order_id,
            product_id: "p1",
            product_name: "Product p1",
            quantity: qty,
            amount: 9.9,
            email: Some("buyer@example.com"),
            user_id,
            username: None,
            points_used: 0,
        }
    }

    #[tokio::test]
    async fn test_insert_pending_roundtrip() {
        let pool = test_pool().await;
        insert_pending(&pool, &insert_args("o1", Some("u1"), 2), 1000)
            .await
            .unwrap();

        let order = find_by_id(&pool, "o1").await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.quantity, 2);
        // Order id doubles as the first correlation id
        assert_eq!(order.current_payment_id.as_deref(), Some("o1"));
        assert!(order.card_key.is_none());
    }

    #[tokio::test]
    async fn test_purchased_quantity_matches_by_id_or_email() {
        let pool = test_pool().await;
        insert_pending(&pool, &insert_args("o1", Some("u1"), 2), 1000)
            .await
            .unwrap();
        mark_paid_if_pending(&pool, "o1", 2000).await.unwrap();

        // Same user id
        let n = purchased_quantity(&pool, "p1", Some("u1"), None).await.unwrap();
        assert_eq!(n, 2);
        // Different user id but same email
        let n = purchased_quantity(&pool, "p1", Some("u2"), Some("buyer@example.com"))
            .await
            .unwrap();
        assert_eq!(n, 2);
        // Stranger
        let n = purchased_quantity(&pool, "p1", Some("u3"), Some("other@example.com"))
            .await
            .unwrap();
        assert_eq!(n, 0);
        // Anonymous: nothing to match
        let n = purchased_quantity(&pool, "p1", None, None).await.unwrap();
        assert_eq!(n, 0);
    }

    #[tokio::test]
    async fn test_purchased_quantity_ignores_pending_and_cancelled() {
        let pool = test_pool().await;
        insert_pending(&pool, &insert_args("o1", Some("u1"), 3), 1000)
            .await
            .unwrap();
        let n = purchased_quantity(&pool, "p1", Some("u1"), None).await.unwrap();
        assert_eq!(n, 0);

        mark_cancelled_if_pending(&pool, "o1").await.unwrap();
        let n = purchased_quantity(&pool, "p1", Some("u1"), None).await.unwrap();
        assert_eq!(n, 0);
    }

    #[tokio::test]
    async fn test_mark_paid_if_pending_is_conditional() {
        let pool = test_pool().await;
        insert_pending(&pool, &insert_args("o1", Some("u1"), 1), 1000)
            .await
            .unwrap();

        assert_eq!(mark_paid_if_pending(&pool, "o1", 2000).await.unwrap(), 1);
        // Already paid: predicate no longer matches
        assert_eq!(mark_paid_if_pending(&pool, "o1", 3000).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_finalize_paid_keeps_existing_keys_when_none() {
        let pool = test_pool().await;
        insert_pending(&pool, &insert_args("o1", Some("u1"), 1), 1000)
            .await
            .unwrap();

        finalize_paid(&pool, "o1", Some("KEY-1"), "trade-1", 2000)
            .await
            .unwrap();
        // Second call without keys must not wipe the stored ones
        finalize_paid(&pool, "o1", None, "trade-1", 2500).await.unwrap();

        let order = find_by_id(&pool, "o1").await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Paid);
        assert_eq!(order.card_key.as_deref(), Some("KEY-1"));
        assert_eq!(order.trade_no.as_deref(), Some("trade-1"));
    }
}
