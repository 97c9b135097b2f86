//! Error types for finstat operations.
//!
//! This module defines [`FinError`] which covers the failures that can occur
//! when fetching, parsing, or persisting financial data. Data-quality gaps
//! (missing concepts, missing years, division by zero) are not errors; they
//! surface as `None` values.

use thiserror::Error;

/// Errors that can occur during finstat operations.
#[derive(Error, Debug)]
pub enum FinError {
    /// Network-related errors (connection failures, timeouts, HTTP status).
    #[error("Network error: {0}")]
    Network(String),

    /// The requested ticker was not found.
    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    /// Input was not valid JSON or a field could not be decoded.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Input does not have the shape of a company-facts disclosure.
    #[error("Malformed facts structure: {0}")]
    Structure(String),

    /// Error interacting with the persistence store.
    #[error("Storage error: {0}")]
    Storage(String),

    /// An invalid parameter was provided.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Any other error.
    #[error("{0}")]
    Other(String),
}

/// Result type alias using [`FinError`].
pub type Result<T> = std::result::Result<T, FinError>;
