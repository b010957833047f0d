//! Order Model

use serde::{Deserialize, Serialize};

/// Order status
///
/// `pending` → `paid`/`delivered` via payment confirmation;
/// `pending` → `cancelled` via the expired-order sweep. Orders are
/// never deleted, cancellation is a status. A cancelled order can
/// still be fulfilled if a late payment confirmation arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Paid,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }

    /// Paid and delivered orders are final: their points are committed
    /// and their cards are consumed (or pending manual follow-up).
    pub fn is_finalized(&self) -> bool {
        matches!(self, Self::Paid | Self::Delivered)
    }
}

/// Order entity (订单)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Order {
    /// Caller-generated primary key, also the initial payment correlation id
    pub order_id: String,
    pub product_id: String,
    pub product_name: String,
    pub quantity: i64,
    /// Payable amount after point redemption
    pub amount: f64,
    pub email: Option<String>,
    pub user_id: Option<String>,
    pub username: Option<String>,
    pub status: OrderStatus,
    pub points_used: i64,
    /// Correlation id of the most recent payment attempt
    /// (rewritten on payment retry: `"{order_id}_retry{ts}"`)
    pub current_payment_id: Option<String>,
    /// Newline-joined card keys once delivered
    pub card_key: Option<String>,
    /// Gateway trade reference from the payment confirmation
    pub trade_no: Option<String>,
    pub paid_at: Option<i64>,
    pub delivered_at: Option<i64>,
    pub created_at: i64,
}
