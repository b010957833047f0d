//! Card Model

use serde::{Deserialize, Serialize};

/// Card entity (卡密) — one sellable secret key for a product.
///
/// Lifecycle: free → reserved (owner order + timestamp) → used.
/// A used card never carries reservation markers, and never returns
/// to the free state. A reservation older than the TTL may be taken
/// over by another order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Card {
    pub id: i64,
    pub product_id: String,
    pub card_key: String,
    pub is_used: bool,
    /// Order currently holding the reservation, if any
    pub reserved_order_id: Option<String>,
    /// When the reservation was taken (UTC millis)
    pub reserved_at: Option<i64>,
    pub used_at: Option<i64>,
    pub created_at: i64,
}
