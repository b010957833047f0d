//! Product Repository

use super::RepoResult;
use shared::models::Product;
use sqlx::SqlitePool;

/// Look up an active product. Inactive products are treated as missing
/// by the whole checkout path.
pub async fn find_active_by_id(pool: &SqlitePool, id: &str) -> RepoResult<Option<Product>> {
    let row = sqlx::query_as::<_, Product>(
        "SELECT id, name, price, purchase_limit, is_active, created_at FROM product WHERE id = ? AND is_active = 1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}
