//! Common error types for PressOps

use thiserror::Error;

/// Common result type for PressOps operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across PressOps services
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Missing or malformed required input
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Operation violates a state invariant
    #[error("Conflict: {0}")]
    Conflict(String),

    /// No royalty rate configured for a (book, platform) pair.
    ///
    /// Distinct from a plain conflict so callers can surface the remedy.
    #[error("No royalty amount configured for book '{book_title}' on platform '{platform}'; configure a royalty amount for this book and platform first")]
    RoyaltyConfigMissing { book_title: String, platform: String },

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}
