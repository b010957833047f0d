//! Product Model

use serde::{Deserialize, Serialize};

/// Product entity (商品)
///
/// Pricing is a unit price; the payable amount of an order is
/// `price * quantity` minus redeemed points.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Product {
    pub id: String,
    pub name: String,
    pub price: f64,
    /// Max units one buyer (by user id or email) may hold across
    /// paid/delivered orders. None = unlimited.
    pub purchase_limit: Option<i64>,
    pub is_active: bool,
    pub created_at: i64,
}
