//! Login User Repository

use super::RepoResult;
use shared::models::LoginUser;
use sqlx::SqlitePool;

pub async fn find_by_user_id(pool: &SqlitePool, user_id: &str) -> RepoResult<Option<LoginUser>> {
    let row = sqlx::query_as::<_, LoginUser>(
        "SELECT user_id, username, email, points, is_blocked, created_at FROM login_user WHERE user_id = ?",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Conditional point decrement: commits only if the balance covers the
/// redemption. Returns affected rows — 0 means the balance moved under
/// us and the caller must abort. Never read-then-write in two steps.
pub async fn deduct_points(pool: &SqlitePool, user_id: &str, points: i64) -> RepoResult<u64> {
    let result =
        sqlx::query("UPDATE login_user SET points = points - ? WHERE user_id = ? AND points >= ?")
            .bind(points)
            .bind(user_id)
            .bind(points)
            .execute(pool)
            .await?;
    Ok(result.rows_affected())
}
