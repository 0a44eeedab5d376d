//! Common error types for carval

use thiserror::Error;

/// Common result type for carval operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the carval workspace
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

    /// Unknown severity or collision label in a claim
    #[error("Validation error: {0}")]
    Validation(String),

    /// No valuation could be produced for a vehicle group.
    ///
    /// The depreciation fallback always yields a value, so this variant
    /// reaching a caller indicates corrupted static tables, not a runtime
    /// condition.
    #[error("No valuation data for {0}")]
    NoValuationData(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
