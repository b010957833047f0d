//! Login User Model

use serde::{Deserialize, Serialize};

/// Buyer identity record (买家)
///
/// Session issuance lives in the auth layer; this row only carries the
/// attributes the checkout engine needs: the loyalty point balance
/// (consumed at order creation, refilled elsewhere) and the blocked flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct LoginUser {
    pub user_id: String,
    pub username: Option<String>,
    pub email: Option<String>,
    /// Loyalty point balance; never negative. 1 point = 1 currency unit.
    pub points: i64,
    pub is_blocked: bool,
    pub created_at: i64,
}
