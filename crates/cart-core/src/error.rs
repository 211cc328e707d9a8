//! # Cart Error Types
//!
//! Typed error handling for the cart store.
//! All cart operations return `Result<T, CartError>`.

use thiserror::Error;

/// Core error type for all cart operations
#[derive(Debug, Error)]
pub enum CartError {
    /// Cart accessed outside a mounted provider
    #[error("{accessor} must be used within a CartProvider")]
    Usage { accessor: &'static str },

    /// `initialize` called on a store that already loaded its snapshot
    #[error("Cart store is already initialized")]
    AlreadyInitialized,

    /// A provider scope already holds a store
    #[error("CartProvider is already mounted")]
    AlreadyMounted,

    /// Durable storage read/write failure
    #[error("Storage error [{backend}]: {message}")]
    Storage {
        backend: &'static str,
        message: String,
    },

    /// Snapshot could not be parsed or violates cart invariants
    #[error("Malformed cart snapshot: {0}")]
    MalformedSnapshot(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration errors (bad env var, invalid TOML)
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl CartError {
    /// Shorthand for a storage failure on the given backend
    pub fn storage(backend: &'static str, message: impl ToString) -> Self {
        CartError::Storage {
            backend,
            message: message.to_string(),
        }
    }

    /// Returns true if this error is meant to reach the caller.
    ///
    /// Storage-layer failures are absorbed by the store and only logged.
    pub fn is_caller_visible(&self) -> bool {
        matches!(
            self,
            CartError::Usage { .. }
                | CartError::AlreadyInitialized
                | CartError::AlreadyMounted
                | CartError::Configuration(_)
        )
    }
}

impl From<serde_json::Error> for CartError {
    fn from(err: serde_json::Error) -> Self {
        CartError::Serialization(err.to_string())
    }
}

/// Result type alias for cart operations
pub type CartResult<T> = Result<T, CartError>;
