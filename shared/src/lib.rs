//! Shared types for the card shop
//!
//! Common types used by the server and (via API) the storefront:
//! data models, response structures, and utility functions.

pub mod models;
pub mod response;
pub mod util;

// Re-exports
pub use response::ApiResponse;
pub use serde::{Deserialize, Serialize};
