//! Common error types for BGC

use thiserror::Error;
use uuid::Uuid;

/// Common result type for BGC operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the BGC service.
///
/// Upstream "not found" is deliberately not a variant: source adapters
/// report it as `Ok(None)` so callers cannot mistake it for a failure.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A unique field (BGG id or slug) collides with an existing game
    #[error("{field} already exists on game {existing_id}")]
    Conflict {
        field: &'static str,
        existing_id: Uuid,
    },

    /// Upstream source failure distinct from "no such record"
    #[error("Upstream lookup error: {0}")]
    Upstream(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}
