//! Shared helpers for repository and checkout tests

use crate::payment::{GatewayError, PaymentGateway, PaymentStatus};
use async_trait::async_trait;
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// In-memory SQLite pool with the real schema applied.
///
/// max_connections(1): each `:memory:` connection is its own database,
/// so the pool must never open a second one.
pub async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();

    sqlx::migrate!("./migrations").run(&pool).await.unwrap();

    pool
}

/// Scripted gateway double: correlation ids in `paid` report status 1,
/// everything else reports not-paid, unless `failing` is set, in which
/// case every query errors.
#[derive(Default)]
pub struct MockGateway {
    paid: Mutex<HashSet<String>>,
    failing: std::sync::atomic::AtomicBool,
    pub queries: AtomicUsize,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_paid(&self, correlation_id: &str) {
        self.paid.lock().unwrap().insert(correlation_id.to_string());
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn query_order_status(
        &self,
        correlation_id: &str,
    ) -> Result<PaymentStatus, GatewayError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(GatewayError::InvalidResponse("scripted failure".into()));
        }
        let paid = self.paid.lock().unwrap().contains(correlation_id);
        Ok(PaymentStatus {
            success: true,
            status: if paid { 1 } else { 0 },
        })
    }
}

/// Insert a free card, returning its row id
pub async fn seed_card(pool: &SqlitePool, product_id: &str, key: &str) -> i64 {
    let result = sqlx::query(
        "INSERT INTO card (product_id, card_key, is_used, created_at) VALUES (?, ?, 0, 0)",
    )
    .bind(product_id)
    .bind(key)
    .execute(pool)
    .await
    .unwrap();
    result.last_insert_rowid()
}

/// Insert an active product
pub async fn seed_product(pool: &SqlitePool, id: &str, price: f64, purchase_limit: Option<i64>) {
    sqlx::query(
        "INSERT INTO product (id, name, price, purchase_limit, is_active, created_at) VALUES (?, ?, ?, ?, 1, 0)",
    )
    .bind(id)
    .bind(format!("Product {id}"))
    .bind(price)
    .bind(purchase_limit)
    .execute(pool)
    .await
    .unwrap();
}

/// Insert a login user with a points balance
pub async fn seed_user(pool: &SqlitePool, user_id: &str, points: i64, is_blocked: bool) {
    sqlx::query(
        "INSERT INTO login_user (user_id, username, email, points, is_blocked, created_at) VALUES (?, ?, ?, ?, ?, 0)",
    )
    .bind(user_id)
    .bind(format!("user-{user_id}"))
    .bind(format!("{user_id}@example.com"))
    .bind(points)
    .bind(is_blocked)
    .execute(pool)
    .await
    .unwrap();
}
