//! Error types for service operations.

use std::path::PathBuf;

use thiserror::Error;

/// Error raised by a [`Service`](super::Service) or its [`Server`](super::Server).
///
/// Messages are written to be echoed to the operator as-is.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The value handed to an operation is unusable.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// bech32 encoding failed.
    #[error("Failed to encode value: {0}")]
    Encode(String),

    /// bech32 decoding failed.
    #[error("Failed to decode value: {0}")]
    Decode(String),

    /// Options of an operation are out of range.
    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    /// The configured backend cannot be opened by this service.
    #[error("Unsupported {group} backend '{backend}'")]
    UnsupportedBackend {
        /// Configuration group of the backend
        group: &'static str,
        /// Backend name or descriptor
        backend: String,
    },

    /// The operation is not provided by this service.
    #[error("{operation} is not supported by this service")]
    Unsupported {
        /// Name of the operation
        operation: &'static str,
    },

    /// A URL built from the server configuration is invalid.
    #[error("Invalid URL '{url}': {source}")]
    InvalidUrl {
        /// The URL that failed to parse
        url: String,
        /// Underlying parse error
        #[source]
        source: url::ParseError,
    },

    /// The store refused an operation.
    #[error("Store error: {0}")]
    Store(String),

    /// The store file could not be read or written.
    #[error("Failed to access store file '{}': {source}", path.display())]
    StoreFile {
        /// Path to the store file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The store file is not a valid store document.
    #[error("Invalid store file '{}': {source}", path.display())]
    StoreFormat {
        /// Path to the store file
        path: PathBuf,
        /// Underlying JSON error
        #[source]
        source: serde_json::Error,
    },
}
