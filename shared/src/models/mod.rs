//! Data models
//!
//! Shared between card-server and the storefront (via API).
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.
//! Timestamps are UTC milliseconds (`i64`), card IDs are
//! `i64` (SQLite INTEGER PRIMARY KEY), product and order IDs are strings.

pub mod card;
pub mod login_user;
pub mod order;
pub mod product;

// Re-exports
pub use card::*;
pub use login_user::*;
pub use order::*;
pub use product::*;
