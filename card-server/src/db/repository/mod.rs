//! Repository Module
//!
//! CRUD and conditional-write primitives over SQLite. Every write that
//! participates in a claim is a single conditional UPDATE (predicate +
//! set, at most one row); callers never rely on SQL transactions.

pub mod card;
pub mod login_user;
pub mod order;
pub mod product;

use thiserror::Error;

/// Repository error types
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for RepoError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => RepoError::NotFound(err.to_string()),
            _ => RepoError::Database(err.to_string()),
        }
    }
}

/// Result type for repository operations
pub type RepoResult<T> = Result<T, RepoError>;
